//! Format-agnostic access to brain volumes stored as NIfTI-1 or MGH files.

use ndarray::Array4;

use std::fmt;
use std::path::Path;

use crate::error::{NeuroprepError, Result};
use crate::fs_mgh::FsMgh;
use crate::nifti1::Nifti1Image;
use crate::util::file_name_ends_with;


/// The on-disk formats a [`Volume`] can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Nifti1,
    Mgh,
}

impl VolumeFormat {

    /// Determine the format from a file name: '.nii' and '.nii.gz' are NIfTI-1, '.mgh' and '.mgz' are MGH.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<VolumeFormat> {
        let path = path.as_ref();
        if file_name_ends_with(path, ".nii") || file_name_ends_with(path, ".nii.gz") {
            Ok(VolumeFormat::Nifti1)
        } else if file_name_ends_with(path, ".mgh") || file_name_ends_with(path, ".mgz") {
            Ok(VolumeFormat::Mgh)
        } else {
            Err(NeuroprepError::UnknownVolumeFormat(path.display().to_string()))
        }
    }

    /// The file extension, including the leading dot, for compressed files of this format.
    pub fn compressed_extension(&self) -> &'static str {
        match self {
            VolumeFormat::Nifti1 => ".nii.gz",
            VolumeFormat::Mgh => ".mgz",
        }
    }
}


/// A brain volume together with the header it was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum Volume {
    Nifti1(Nifti1Image),
    Mgh(FsMgh),
}

impl Volume {

    /// Read a volume, choosing the reader from the file name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Volume> {
        match VolumeFormat::from_path(&path)? {
            VolumeFormat::Nifti1 => Ok(Volume::Nifti1(Nifti1Image::from_file(path)?)),
            VolumeFormat::Mgh => Ok(Volume::Mgh(FsMgh::from_file(path)?)),
        }
    }

    /// Write the volume in its own format. Compression follows the file name.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        match self {
            Volume::Nifti1(img) => img.to_file(path),
            Volume::Mgh(mgh) => mgh.to_file(path),
        }
    }

    pub fn format(&self) -> VolumeFormat {
        match self {
            Volume::Nifti1(_) => VolumeFormat::Nifti1,
            Volume::Mgh(_) => VolumeFormat::Mgh,
        }
    }

    /// The voxel values, indexed `[i, j, k, frame]`.
    pub fn data(&self) -> &Array4<f64> {
        match self {
            Volume::Nifti1(img) => &img.data,
            Volume::Mgh(mgh) => &mgh.data,
        }
    }

    /// A new volume holding `data`, sharing the header (and thus the spatial metadata) of this one.
    pub fn with_data(&self, data: Array4<f64>) -> Volume {
        match self {
            Volume::Nifti1(img) => Volume::Nifti1(img.with_data(data)),
            Volume::Mgh(mgh) => Volume::Mgh(mgh.with_data(data)),
        }
    }

    pub fn compressed_extension(&self) -> &'static str {
        self.format().compressed_extension()
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Volume::Nifti1(img) => fmt::Display::fmt(img, f),
            Volume::Mgh(mgh) => fmt::Display::fmt(mgh, f),
        }
    }
}


/// Read a brain volume from a NIfTI-1 ('.nii', '.nii.gz') or MGH ('.mgh', '.mgz') file.
///
/// # Examples
///
/// ```no_run
/// let vol = neuroprep::read_volume("/path/to/subject1/aseg.nii.gz").unwrap();
/// println!("Volume has {} voxels.", vol.data().len());
/// ```
pub fn read_volume<P: AsRef<Path>>(path: P) -> Result<Volume> {
    Volume::from_file(path)
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn volume_formats_are_derived_from_file_names() {
        assert_eq!(VolumeFormat::Nifti1, VolumeFormat::from_path("aseg.nii.gz").unwrap());
        assert_eq!(VolumeFormat::Nifti1, VolumeFormat::from_path("/data/T1.nii").unwrap());
        assert_eq!(VolumeFormat::Mgh, VolumeFormat::from_path("mri/aseg.mgz").unwrap());
        assert_eq!(VolumeFormat::Mgh, VolumeFormat::from_path("brain.mgh").unwrap());
        assert!(matches!(
            VolumeFormat::from_path("aseg.img"),
            Err(NeuroprepError::UnknownVolumeFormat(_))
        ));
    }

    #[test]
    fn compressed_extensions_match_the_format() {
        assert_eq!(".nii.gz", VolumeFormat::Nifti1.compressed_extension());
        assert_eq!(".mgz", VolumeFormat::Mgh.compressed_extension());
    }
}
