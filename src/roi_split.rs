//! Splitting of a segmentation volume into one binary mask volume per brain region.
//!
//! Each distinct nonzero voxel value of the input is a region label. The label is looked up in an
//! [`FsColorLut`] to name the output file, and a mask with `1` for the voxels of that region and `0`
//! everywhere else is written in the format of the input, sharing its header.

use log::{debug, info, warn};
use ndarray::Array4;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NeuroprepError, Result};
use crate::fs_lut::FsColorLut;
use crate::volume::Volume;


/// A region label found in a segmentation, resolved against a label table.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiLabel {
    pub id: i32,
    pub name: String,
    /// The file name of the mask without extension, see [`region_file_stem`].
    pub file_stem: String,
}


/// A mask volume written by [`split_volume_to_rois`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoiMask {
    pub label: RoiLabel,
    pub path: PathBuf,
    pub num_voxels: usize,
}


/// Get the distinct nonzero voxel values of a segmentation in ascending order.
pub fn unique_labels(data: &Array4<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = data.iter().copied().filter(|v| *v != 0.0).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values
}


/// Turn a region name into a file name stem: dashes become underscores, and all letters lowercase.
///
/// # Examples
///
/// ```
/// assert_eq!("left_cerebral_white_matter", neuroprep::region_file_stem("Left-Cerebral-White-Matter"));
/// assert_eq!("cc_mid_anterior", neuroprep::region_file_stem("CC_Mid_Anterior"));
/// ```
pub fn region_file_stem(name: &str) -> String {
    name.replace('-', "_").to_lowercase()
}


/// Compute the binary mask of all voxels equal to `label`.
pub fn binary_mask(data: &Array4<f64>, label: f64) -> Array4<f64> {
    data.mapv(|v| if v == label { 1.0 } else { 0.0 })
}


/// Resolve a label value against the table. Only integral values can match a table id.
pub fn resolve_label(value: f64, lut: &FsColorLut) -> Result<RoiLabel> {
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(NeuroprepError::LabelNotFound(value));
    }
    let id = value as i32;
    let name = lut.name_of(id).ok_or(NeuroprepError::LabelNotFound(value))?;
    Ok(RoiLabel { id, name: name.to_string(), file_stem: region_file_stem(name) })
}


/// Find the labels of a segmentation and resolve all of them against the table.
///
/// Fails on the first value without a table entry, before anything is produced from the volume.
/// Also fails if two labels map to the same file stem, as their masks would overwrite each other.
pub fn volume_labels(data: &Array4<f64>, lut: &FsColorLut) -> Result<Vec<RoiLabel>> {
    let labels: Vec<RoiLabel> = unique_labels(data).into_iter().map(|value| resolve_label(value, lut)).collect::<Result<_>>()?;
    for (idx, label) in labels.iter().enumerate() {
        if let Some(first) = labels[..idx].iter().find(|l| l.file_stem == label.file_stem) {
            return Err(NeuroprepError::DuplicateRegionFileName(label.file_stem.clone(), first.id, label.id));
        }
    }
    Ok(labels)
}


/// Restrict labels to the given ids. Requested ids that do not occur in the volume are skipped with a warning.
pub fn select_labels(labels: Vec<RoiLabel>, only: &[i32]) -> Vec<RoiLabel> {
    for id in only {
        if !labels.iter().any(|l| l.id == *id) {
            warn!("Label {} does not occur in the volume, skipping it", id);
        }
    }
    labels.into_iter().filter(|l| only.contains(&l.id)).collect()
}


/// Write one mask volume per label of `volume` into `outdir`, which is created if needed.
///
/// The masks keep the header of the input volume and its format, with the compressed file
/// extension of that format (`.nii.gz` or `.mgz`). If `only` is given, masks are written just for
/// those label ids.
///
/// # Errors
///
/// * [`NeuroprepError::LabelNotFound`] if a voxel value has no entry in `lut`. Nothing is written in that case.
pub fn split_rois<P: AsRef<Path>>(volume: &Volume, outdir: P, lut: &FsColorLut, only: Option<&[i32]>) -> Result<Vec<RoiMask>> {
    let outdir = outdir.as_ref();
    let data = volume.data();

    info!("Finding unique anatomical regions");
    let labels = volume_labels(data, lut)?;
    debug!("Found {} distinct labels", labels.len());
    let labels = match only {
        Some(ids) => select_labels(labels, ids),
        None => labels,
    };

    if !outdir.exists() {
        fs::create_dir_all(outdir)?;
    }

    info!("Saving");
    let mut masks: Vec<RoiMask> = Vec::with_capacity(labels.len());
    for label in labels {
        let mask = binary_mask(data, label.id as f64);
        let num_voxels = mask.iter().filter(|v| **v == 1.0).count();
        let path = outdir.join(format!("{}{}", label.file_stem, volume.compressed_extension()));
        info!("...{}", label.file_stem);
        debug!("Writing {} voxels of label {} to '{}'", num_voxels, label.id, path.display());
        volume.with_data(mask).to_file(&path)?;
        masks.push(RoiMask { label, path, num_voxels });
    }
    Ok(masks)
}


/// Read a segmentation volume and write one mask volume per label into `outdir`.
///
/// # Examples
///
/// ```no_run
/// let lut = neuroprep::FsColorLut::bundled().unwrap();
/// let masks = neuroprep::split_volume_to_rois("/path/to/aseg2raw.nii.gz", "/path/to/volume", &lut, None).unwrap();
/// println!("Wrote {} region masks.", masks.len());
/// ```
pub fn split_volume_to_rois<P, Q>(infile: P, outdir: Q, lut: &FsColorLut, only: Option<&[i32]>) -> Result<Vec<RoiMask>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    info!("Reading in data");
    let volume = Volume::from_file(infile)?;
    debug!("{}", volume);
    split_rois(&volume, outdir, lut, only)
}
