//! Small neuroimaging preprocessing utilities.
//!
//! Splitting of segmentation volumes (like FreeSurfer's `aseg`) into one binary mask per brain region,
//! and Framewise Displacement (FD) motion metrics from the transforms estimated by motion correction.
//! Volumes can be read from and written to NIfTI-1 and FreeSurfer MGH files.

pub mod error;
pub mod fs_lut;
pub mod fs_mgh;
pub mod motion_fd;
pub mod nifti1;
pub mod roi_split;
pub mod util;
pub mod volume;

pub use error::{NeuroprepError, Result};
pub use fs_lut::{FsColorLut, read_lut};
pub use fs_mgh::{FsMgh, FsMghHeader, read_mgh};
pub use motion_fd::{BRAIN_RADIUS_MM, FramewiseDisplacement, OutputTemplate, fd_jenkinson, read_1d, write_1d};
pub use nifti1::{Nifti1Image, read_nifti1};
pub use roi_split::{RoiLabel, RoiMask, region_file_stem, split_volume_to_rois};
pub use volume::{Volume, VolumeFormat, read_volume};
