//! Functions for managing FreeSurfer brain volumes in binary 'MGH' files.
//!
//! MGZ files are GZip compressed MGH files. Segmentations like `aseg.mgz` produced by FreeSurfer
//! are typically stored in this format.

use byteordered::ByteOrdered;
use ndarray::{Array, Array4, ShapeBuilder};

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{NeuroprepError, Result};
use crate::util::{open_input, write_output};

pub const MGH_VERSION: i32 = 1;

pub const MGH_DATATYPE_NAMES : [&str; 4] = ["MRI_UCHAR", "MRI_INT", "MRI_FLOAT", "MRI_SHORT"];
pub const MGH_DATATYPE_CODES : [i32; 4] = [0, 1, 3, 4];
pub const MGH_DATA_START : usize = 284; // The index in bytes where the data part starts in an MGH file.

pub const MRI_UCHAR: i32 = 0;
pub const MRI_INT: i32 = 1;
pub const MRI_FLOAT: i32 = 3;
pub const MRI_SHORT: i32 = 4;

// Bytes used by the header fields up to and including the RAS block.
const MGH_HEADER_FIELDS_SIZE: usize = 7 * 4 + 2 + 15 * 4;

/// Models the header of a FreeSurfer MGH file containing a brain volume.
#[derive(Debug, Clone, PartialEq)]
pub struct FsMghHeader {
    pub mgh_format_version: i32,
    pub dim1len: i32,
    pub dim2len: i32,
    pub dim3len: i32,
    pub dim4len: i32,  // aka "num_frames"
    pub dtype: i32,
    pub dof: i32,
    pub is_ras_good: i16,
    pub delta: [f32; 3],
    pub mdc_raw: [f32; 9],
    pub p_xyz_c: [f32; 3],
}


/// Optional scan parameters stored after the voxel data of an MGH file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FsMghScanParams {
    pub tr: f32,
    pub flip_angle: f32,
    pub te: f32,
    pub ti: f32,
}


/// Models a FreeSurfer MGH file. Voxel values of all datatypes are held as `f64`,
/// they are cast back to the header `dtype` when written.
#[derive(Debug, Clone, PartialEq)]
pub struct FsMgh {
    pub header: FsMghHeader,
    pub data: Array4<f64>,
    pub scan_params: Option<FsMghScanParams>,
}


impl Default for FsMghHeader {
    fn default() -> FsMghHeader {
        FsMghHeader {
            mgh_format_version: MGH_VERSION,
            dim1len: 0,
            dim2len: 0,
            dim3len: 0,
            dim4len: 0,
            dtype: MRI_INT,
            dof: 0,
            is_ras_good: 0,
            delta: [0.; 3],
            mdc_raw: [0.; 9],
            p_xyz_c: [0.; 3],
        }
    }
}


/// Name of an MGH datatype code, e.g. "MRI_FLOAT".
pub fn mgh_dtype_name(dtype: i32) -> Option<&'static str> {
    MGH_DATATYPE_CODES.iter().position(|c| *c == dtype).map(|idx| MGH_DATATYPE_NAMES[idx])
}


/// The header of an MGH/MGZ file.
impl FsMghHeader {

    /// Read an MGH header from a file. MGZ files are decompressed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsMghHeader> {
        let mut file = open_input(path)?;
        FsMghHeader::from_reader(&mut file)
    }


    /// Read an MGH header from the given byte stream.
    /// It is assumed that the input is currently at the start of the
    /// header. Only the header fields are consumed, not the padding up to [`MGH_DATA_START`].
    pub fn from_reader<S>(input: &mut S) -> Result<FsMghHeader>
    where
        S: Read,
    {
        let mut hdr = FsMghHeader::default();

        let mut input = ByteOrdered::be(input);

        hdr.mgh_format_version = input.read_i32()?;

        if hdr.mgh_format_version != MGH_VERSION {
            return Err(NeuroprepError::InvalidFsMghFormat);
        }

        hdr.dim1len = input.read_i32()?;
        hdr.dim2len = input.read_i32()?;
        hdr.dim3len = input.read_i32()?;
        hdr.dim4len = input.read_i32()?;

        hdr.dtype = input.read_i32()?;
        hdr.dof = input.read_i32()?;

        hdr.is_ras_good = input.read_i16()?;

        // The RAS block is always present on disk, but only meaningful if flagged as good.
        let mut delta = [0f32; 3];
        let mut mdc_raw = [0f32; 9];
        let mut p_xyz_c = [0f32; 3];
        for idx in 0..3 { delta[idx] = input.read_f32()?; }
        for idx in 0..9 { mdc_raw[idx] = input.read_f32()?; }
        for idx in 0..3 { p_xyz_c[idx] = input.read_f32()?; }
        if hdr.is_ras_good == 1 {
            hdr.delta = delta;
            hdr.mdc_raw = mdc_raw;
            hdr.p_xyz_c = p_xyz_c;
        }

        if mgh_dtype_name(hdr.dtype).is_none() {
            return Err(NeuroprepError::UnsupportedDatatype(hdr.dtype));
        }
        if hdr.dim1len < 0 || hdr.dim2len < 0 || hdr.dim3len < 0 || hdr.dim4len < 0 {
            return Err(NeuroprepError::InvalidFsMghFormat);
        }
        Ok(hdr)
    }


    /// The volume shape as 4 dimensions.
    pub fn dim4(&self) -> [usize; 4] {
        [self.dim1len as usize, self.dim2len as usize, self.dim3len as usize, self.dim4len as usize]
    }


    /// Write the header including the padding, so the data can follow directly.
    pub fn to_writer<S>(&self, output: &mut S) -> Result<()>
    where
        S: Write + ?Sized,
    {
        let mut output = ByteOrdered::be(output);
        output.write_i32(self.mgh_format_version)?;
        output.write_i32(self.dim1len)?;
        output.write_i32(self.dim2len)?;
        output.write_i32(self.dim3len)?;
        output.write_i32(self.dim4len)?;
        output.write_i32(self.dtype)?;
        output.write_i32(self.dof)?;
        output.write_i16(self.is_ras_good)?;
        for value in self.delta.iter() { output.write_f32(*value)?; }
        for value in self.mdc_raw.iter() { output.write_f32(*value)?; }
        for value in self.p_xyz_c.iter() { output.write_f32(*value)?; }
        output.write_all(&[0u8; MGH_DATA_START - MGH_HEADER_FIELDS_SIZE])?;
        Ok(())
    }
}


impl FsMgh {

    /// Read an MGH or MGZ file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsMgh> {
        let mut file = open_input(path)?;
        FsMgh::from_reader(&mut file)
    }


    /// Read an MGH volume from the given byte stream, which must be at the start of the header.
    pub fn from_reader<S>(input: &mut S) -> Result<FsMgh>
    where
        S: Read,
    {
        let header = FsMghHeader::from_reader(input)?;

        let padding = (MGH_DATA_START - MGH_HEADER_FIELDS_SIZE) as u64;
        std::io::copy(&mut input.by_ref().take(padding), &mut std::io::sink())?;

        let [d1, d2, d3, d4] = header.dim4();
        let num_voxels = d1
            .checked_mul(d2)
            .and_then(|n| n.checked_mul(d3))
            .and_then(|n| n.checked_mul(d4))
            .ok_or(NeuroprepError::InvalidFsMghFormat)?;
        // Grows with the data actually read, a short file fails at its end.
        let mut input = ByteOrdered::be(input);
        let mut values: Vec<f64> = Vec::new();
        for _ in 0..num_voxels {
            let value = match header.dtype {
                MRI_UCHAR => input.read_u8()? as f64,
                MRI_INT => input.read_i32()? as f64,
                MRI_FLOAT => input.read_f32()? as f64,
                MRI_SHORT => input.read_i16()? as f64,
                other => return Err(NeuroprepError::UnsupportedDatatype(other)),
            };
            values.push(value);
        }

        // The scan parameters are optional, a file may end right after the data.
        let mut tail = Vec::new();
        input.into_inner().read_to_end(&mut tail)?;
        let scan_params = if tail.len() >= 16 {
            let mut tail = ByteOrdered::be(&tail[..]);
            Some(FsMghScanParams {
                tr: tail.read_f32()?,
                flip_angle: tail.read_f32()?,
                te: tail.read_f32()?,
                ti: tail.read_f32()?,
            })
        } else {
            None
        };

        // First index fastest, like Fortran. The length matches, only a shape beyond isize::MAX can fail.
        let data = Array::from_shape_vec((d1, d2, d3, d4).f(), values)
            .map_err(|_| NeuroprepError::InvalidFsMghFormat)?;

        Ok(FsMgh { header, data, scan_params })
    }


    /// Create a new volume with the given voxel data, keeping the header and scan parameters of this one.
    pub fn with_data(&self, data: Array4<f64>) -> FsMgh {
        let mut header = self.header.clone();
        let shape = data.shape();
        header.dim1len = shape[0] as i32;
        header.dim2len = shape[1] as i32;
        header.dim3len = shape[2] as i32;
        header.dim4len = shape[3] as i32;
        FsMgh { header, data, scan_params: self.scan_params }
    }


    /// Write the volume to the given stream. Voxel values are cast to the header `dtype`.
    pub fn to_writer<S>(&self, output: &mut S) -> Result<()>
    where
        S: Write + ?Sized,
    {
        let expected: usize = self.header.dim4().iter().product();
        if expected != self.data.len() {
            return Err(NeuroprepError::VoxelCountMismatch(expected, self.data.len()));
        }

        self.header.to_writer(output)?;
        let mut output = ByteOrdered::be(output);
        for value in self.data.t().iter() {
            let value = *value;
            match self.header.dtype {
                MRI_UCHAR => output.write_u8(value as u8)?,
                MRI_INT => output.write_i32(value as i32)?,
                MRI_FLOAT => output.write_f32(value as f32)?,
                MRI_SHORT => output.write_i16(value as i16)?,
                other => return Err(NeuroprepError::UnsupportedDatatype(other)),
            }
        }
        if let Some(params) = self.scan_params {
            output.write_f32(params.tr)?;
            output.write_f32(params.flip_angle)?;
            output.write_f32(params.te)?;
            output.write_f32(params.ti)?;
        }
        Ok(())
    }


    /// Write the volume to an MGH file, or to a compressed MGZ file if the name ends with '.mgz'.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_output(path, |output| self.to_writer(output))
    }
}


impl fmt::Display for FsMgh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MGH volume of shape {}x{}x{}x{} with datatype {}.",
            self.header.dim1len, self.header.dim2len, self.header.dim3len, self.header.dim4len,
            mgh_dtype_name(self.header.dtype).unwrap_or("unknown"))
    }
}


/// Read an MGH or MGZ file.
///
/// # Examples
///
/// ```no_run
/// let mgh = neuroprep::read_mgh("/path/to/subjects_dir/subject1/mri/aseg.mgz").unwrap();
/// println!("{}", mgh);
/// ```
pub fn read_mgh<P: AsRef<Path>>(path: P) -> Result<FsMgh> {
    FsMgh::from_file(path)
}


#[cfg(test)]
mod test {
    use super::*;

    fn aseg_like() -> FsMgh {
        let mut header = FsMghHeader::default();
        header.dim1len = 4;
        header.dim2len = 3;
        header.dim3len = 2;
        header.dim4len = 1;
        header.dtype = MRI_INT;
        header.is_ras_good = 1;
        header.delta = [1., 1., 1.];
        header.mdc_raw = [-1., 0., 0., 0., 0., -1., 0., 1., 0.];
        header.p_xyz_c = [0.5, -17.2, 18.9];
        let data = Array4::from_shape_fn((4, 3, 2, 1), |(i, j, _, _)| if i == j { 17.0 } else { 0.0 });
        let scan_params = Some(FsMghScanParams { tr: 2300., flip_angle: 0.15, te: 2.98, ti: 900. });
        FsMgh { header, data, scan_params }
    }

    #[test]
    fn a_written_mgz_file_can_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aseg.mgz");
        let mgh = aseg_like();
        mgh.to_file(&path).unwrap();

        let restored = read_mgh(&path).unwrap();
        assert_eq!(mgh, restored);
        assert_eq!(6.0, restored.data.sum() / 17.0);
    }

    #[test]
    fn the_data_starts_at_byte_284() {
        let mut mgh = aseg_like();
        mgh.header.dtype = MRI_UCHAR;
        mgh.scan_params = None;
        let mut buf: Vec<u8> = Vec::new();
        mgh.to_writer(&mut buf).unwrap();

        assert_eq!(MGH_DATA_START + 24, buf.len());
        assert_eq!(17, buf[MGH_DATA_START]);
        assert_eq!(0, buf[MGH_DATA_START + 1]);
        assert_eq!(17, buf[MGH_DATA_START + 5]); // (1, 1, 0)
    }

    #[test]
    fn the_ras_block_is_ignored_unless_flagged_good() {
        let mut mgh = aseg_like();
        mgh.header.is_ras_good = 0;
        let mut buf: Vec<u8> = Vec::new();
        mgh.to_writer(&mut buf).unwrap();

        let hdr = FsMghHeader::from_reader(&mut &buf[..]).unwrap();
        assert_eq!([0.; 3], hdr.p_xyz_c);
    }

    #[test]
    fn files_with_a_wrong_version_are_rejected() {
        let mut buf: Vec<u8> = Vec::new();
        aseg_like().to_writer(&mut buf).unwrap();
        buf[3] = 2;
        assert!(matches!(FsMgh::from_reader(&mut &buf[..]), Err(NeuroprepError::InvalidFsMghFormat)));
    }

    #[test]
    fn overflowing_header_dimensions_are_rejected() {
        let mut buf: Vec<u8> = Vec::new();
        aseg_like().to_writer(&mut buf).unwrap();
        // dim1len to dim4len, big endian from byte 4
        for idx in 0..4 {
            buf[4 + 4 * idx..8 + 4 * idx].copy_from_slice(&100_000i32.to_be_bytes());
        }
        assert!(matches!(FsMgh::from_reader(&mut &buf[..]), Err(NeuroprepError::InvalidFsMghFormat)));
    }

    #[test]
    fn huge_dimensions_on_a_short_file_fail_at_the_end_of_the_data() {
        let mut buf: Vec<u8> = Vec::new();
        aseg_like().to_writer(&mut buf).unwrap();
        buf[4..8].copy_from_slice(&30_000i32.to_be_bytes());
        buf[8..12].copy_from_slice(&30_000i32.to_be_bytes());
        assert!(matches!(FsMgh::from_reader(&mut &buf[..]), Err(NeuroprepError::Io(_))));
    }

    #[test]
    fn truncated_voxel_data_is_an_io_error() {
        let mut mgh = aseg_like();
        mgh.scan_params = None;
        let mut buf: Vec<u8> = Vec::new();
        mgh.to_writer(&mut buf).unwrap();
        buf.truncate(MGH_DATA_START + 10);
        assert!(matches!(FsMgh::from_reader(&mut &buf[..]), Err(NeuroprepError::Io(_))));
    }

    #[test]
    fn mgh_dtype_names_are_resolved() {
        assert_eq!(Some("MRI_FLOAT"), mgh_dtype_name(MRI_FLOAT));
        assert_eq!(None, mgh_dtype_name(2));
    }
}
