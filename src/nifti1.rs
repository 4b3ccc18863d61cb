//! Reading and writing brain volumes in single-file NIfTI-1 format ('.nii' and '.nii.gz').
//!
//! The whole header is kept, so that derived volumes written with [`Nifti1Image::to_file`]
//! share the spatial metadata (qform, sform, voxel sizes) of the volume they were derived from.

use ndarray::{Array4, ArrayD, Axis, Ix4};
use nifti::writer::WriterOptions;
use nifti::{InMemNiftiObject, IntoNdArray, NiftiError, NiftiHeader, NiftiObject, NiftiType};

use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::{NeuroprepError, Result};
use crate::util::open_input;

pub const NIFTI1_HEADER_SIZE: usize = 348;


/// Models a NIfTI-1 volume: the header and the (scaled) voxel values.
#[derive(Debug, Clone, PartialEq)]
pub struct Nifti1Image {
    pub header: NiftiHeader,
    pub data: Array4<f64>,
}


// I/O errors keep their own variant, so callers can tell a missing file from a broken one.
fn from_nifti_error(err: NiftiError) -> NeuroprepError {
    match err {
        NiftiError::Io(err) => NeuroprepError::Io(err),
        other => NeuroprepError::Nifti(other),
    }
}


/// Check that the header describes at most 4 dimensions and that `available` bytes hold all of its voxels.
pub fn check_nifti1_size(header: &NiftiHeader, available: usize) -> Result<()> {
    let ndim = header.dim[0] as usize;
    if ndim == 0 || ndim > 7 {
        return Err(NeuroprepError::InvalidNifti1Header(format!("dim[0] is {}", ndim)));
    }
    if ndim > 4 {
        return Err(NeuroprepError::UnsupportedDimensions(ndim));
    }
    if header.bitpix <= 0 || header.bitpix % 8 != 0 {
        return Err(NeuroprepError::InvalidNifti1Header(format!("bitpix is {}", header.bitpix)));
    }

    let overflow = || NeuroprepError::InvalidNifti1Header(String::from("volume size overflows"));
    let mut num_voxels: usize = 1;
    for idx in 1..=ndim {
        num_voxels = num_voxels.checked_mul(header.dim[idx] as usize).ok_or_else(overflow)?;
    }
    let needed = num_voxels
        .checked_mul(header.bitpix as usize / 8)
        .and_then(|n| n.checked_add(header.vox_offset as usize))
        .ok_or_else(overflow)?;
    if needed > available {
        return Err(NeuroprepError::TruncatedVoxelData(needed, available));
    }
    Ok(())
}


impl Nifti1Image {

    /// Read a NIfTI-1 volume from a '.nii' or '.nii.gz' file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Nifti1Image> {
        let mut input = open_input(path)?;
        Nifti1Image::from_reader(&mut input)
    }


    /// Read a NIfTI-1 volume from the given (uncompressed) byte stream, which must be at the start of the header.
    ///
    /// The header dimensions are checked against the length of the stream before any voxel memory is allocated.
    pub fn from_reader<S>(input: &mut S) -> Result<Nifti1Image>
    where
        S: Read,
    {
        let mut bytes: Vec<u8> = Vec::new();
        input.read_to_end(&mut bytes)?;
        if bytes.len() < NIFTI1_HEADER_SIZE {
            return Err(NeuroprepError::InvalidNifti1Header(format!("file has only {} bytes", bytes.len())));
        }

        let header = NiftiHeader::from_reader(Cursor::new(&bytes[..])).map_err(from_nifti_error)?;
        check_nifti1_size(&header, bytes.len())?;

        let obj = InMemNiftiObject::from_reader(Cursor::new(bytes)).map_err(from_nifti_error)?;
        let mut header = obj.header().clone();
        let mut volume: ArrayD<f64> = obj.into_volume().into_ndarray::<f64>().map_err(from_nifti_error)?;

        // Pad to 4 dimensions, a 3D volume has a single frame.
        while volume.ndim() < 4 {
            let ndim = volume.ndim();
            volume = volume.insert_axis(Axis(ndim));
        }
        let data = volume
            .into_dimensionality::<Ix4>()
            .map_err(|e| NeuroprepError::InvalidNifti1Header(e.to_string()))?;

        // The values in memory are already scaled.
        header.scl_slope = 1.0;
        header.scl_inter = 0.0;

        Ok(Nifti1Image { header, data })
    }


    /// Create a new volume with the given voxel data, keeping the header of this one.
    ///
    /// The dimensions written to disk follow the shape of `data`.
    pub fn with_data(&self, data: Array4<f64>) -> Nifti1Image {
        Nifti1Image { header: self.header.clone(), data }
    }


    /// Write the volume to a file, using this header as reference header. Voxel values are cast to
    /// the header datatype. Files ending with '.gz' are GZip compressed. Volumes with a single frame
    /// are written as 3D volumes.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut reference = self.header.clone();
        reference.scl_slope = 1.0;
        reference.scl_inter = 0.0;
        let options = WriterOptions::new(path.as_ref()).reference_header(&reference);
        let data = &self.data;

        macro_rules! write_as {
            ($t:ty) => {
                if data.shape()[3] == 1 {
                    options.write_nifti(&data.index_axis(Axis(3), 0).mapv(|v| v as $t))
                } else {
                    options.write_nifti(&data.mapv(|v| v as $t))
                }
            };
        }

        let datatype = self.header.data_type().map_err(from_nifti_error)?;
        let written = match datatype {
            NiftiType::Uint8 => write_as!(u8),
            NiftiType::Int8 => write_as!(i8),
            NiftiType::Int16 => write_as!(i16),
            NiftiType::Uint16 => write_as!(u16),
            NiftiType::Int32 => write_as!(i32),
            NiftiType::Uint32 => write_as!(u32),
            NiftiType::Float32 => write_as!(f32),
            NiftiType::Float64 => write_as!(f64),
            _ => return Err(NeuroprepError::UnsupportedDatatype(self.header.datatype as i32)),
        };
        written.map_err(from_nifti_error)
    }
}


impl fmt::Display for Nifti1Image {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let shape = self.data.shape();
        write!(f, "NIfTI-1 volume of shape {}x{}x{}x{} with datatype code {}.", shape[0], shape[1], shape[2], shape[3], self.header.datatype)
    }
}


/// Read a NIfTI-1 volume from a '.nii' or '.nii.gz' file.
///
/// # Examples
///
/// ```no_run
/// let vol = neuroprep::read_nifti1("/path/to/subject1/aseg.nii.gz").unwrap();
/// println!("{}", vol);
/// ```
pub fn read_nifti1<P: AsRef<Path>>(path: P) -> Result<Nifti1Image> {
    Nifti1Image::from_file(path)
}
