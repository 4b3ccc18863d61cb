use quick_error::quick_error;
use std::io::Error as IOError;
use std::num::ParseFloatError;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum NeuroprepError {
        /// Invalid NIfTI-1 file: too short, or header fields out of range.
        InvalidNifti1Header(reason: String) {
            display("Invalid NIfTI-1 header: {}", reason)
        }

        /// Invalid MGH file: wrong format version.
        InvalidFsMghFormat {
            display("Invalid FreeSurfer MGH file")
        }

        /// The datatype code of a volume file is not supported.
        UnsupportedDatatype(code: i32) {
            display("Unsupported voxel datatype code {}", code)
        }

        UnsupportedDimensions(ndim: usize) {
            display("Unsupported number of volume dimensions: {} (at most 4 are supported)", ndim)
        }

        /// The voxel array does not match the header dimensions.
        VoxelCountMismatch(expected: usize, found: usize) {
            display("Expected {} voxels, found {}", expected, found)
        }

        /// The file ends before all voxels the header describes.
        TruncatedVoxelData(needed: usize, found: usize) {
            display("Volume header needs {} bytes, but the file has only {}", needed, found)
        }

        /// Error reported by the NIfTI reader or writer.
        Nifti(err: nifti::NiftiError) {
            display("NIfTI error: {}", err)
            source(err)
        }

        UnknownVolumeFormat(file: String) {
            display("Cannot determine volume format from file name '{}', expected .nii, .nii.gz, .mgh or .mgz", file)
        }

        /// A line of a label lookup table could not be parsed.
        InvalidLutLine(line: usize, reason: String) {
            display("Invalid label table line {}: {}", line, reason)
        }

        /// A voxel value of a segmentation has no entry in the label table.
        LabelNotFound(value: f64) {
            display("Label value {} not found in label table", value)
        }

        /// Two labels map to the same mask file name.
        DuplicateRegionFileName(stem: String, first: i32, second: i32) {
            display("Labels {} and {} would both be written to mask file '{}'", first, second, stem)
        }

        InvalidMotionRow(line: usize, reason: String) {
            display("Invalid motion matrix row on line {}: {}", line, reason)
        }

        SingularTransform(index: usize) {
            display("Transform matrix at time point {} is not invertible", index)
        }

        /// An output file template must contain exactly one '%s'.
        InvalidOutputTemplate(template: String) {
            display("Could not find exactly one substitution '%s' in output template '{}'", template)
        }

        ParseValue(line: usize, err: ParseFloatError) {
            display("Invalid numeric value on line {}: {}", line, err)
            source(err)
        }

        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, NeuroprepError>;
