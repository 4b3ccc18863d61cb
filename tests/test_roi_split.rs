use ndarray::Array4;
use neuroprep::fs_mgh::{FsMgh, FsMghHeader, MRI_INT};
use neuroprep::nifti1::Nifti1Image;
use nifti::{NiftiHeader, NiftiType};
use neuroprep::{read_volume, split_volume_to_rois, FsColorLut, NeuroprepError, Volume};

use std::fs;

/// A tiny segmentation with the labels 2 (white matter), 17 (hippocampus) and 53 (right hippocampus).
fn aseg_data() -> Array4<f64> {
    Array4::from_shape_fn((5, 4, 3, 1), |(i, j, k, _)| match (i + j + k) % 4 {
        1 => 2.0,
        2 => 17.0,
        3 => if k == 0 { 53.0 } else { 0.0 },
        _ => 0.0,
    })
}

fn aseg_nifti() -> Nifti1Image {
    let mut header = NiftiHeader::default();
    header.datatype = NiftiType::Int32 as i16;
    header.pixdim = [1., 1., 1., 1., 0., 0., 0., 0.];
    header.qform_code = 1;
    header.quatern_x = -2.5;
    header.sform_code = 1;
    header.srow_x = [1., 0., 0., -2.5];
    Nifti1Image { header, data: aseg_data() }
}

fn count(data: &Array4<f64>, value: f64) -> usize {
    data.iter().filter(|v| **v == value).count()
}

#[test]
fn one_binary_mask_is_written_per_label() {
    let dir = tempfile::tempdir().unwrap();
    let infile = dir.path().join("aseg2raw.nii.gz");
    let outdir = dir.path().join("volume");
    aseg_nifti().to_file(&infile).unwrap();

    let lut = FsColorLut::bundled().unwrap();
    let masks = split_volume_to_rois(&infile, &outdir, &lut, None).unwrap();

    let stems: Vec<&str> = masks.iter().map(|m| m.label.file_stem.as_str()).collect();
    assert_eq!(vec!["left_cerebral_white_matter", "left_hippocampus", "right_hippocampus"], stems);
    assert_eq!(3, fs::read_dir(&outdir).unwrap().count());

    let input = aseg_data();
    for mask in masks.iter() {
        assert!(mask.path.ends_with(format!("{}.nii.gz", mask.label.file_stem)));
        let restored = read_volume(&mask.path).unwrap();
        let data = restored.data();
        assert!(data.iter().all(|v| *v == 0.0 || *v == 1.0));
        assert_eq!(count(&input, mask.label.id as f64), count(data, 1.0));
        assert_eq!(mask.num_voxels, count(data, 1.0));

        match restored {
            Volume::Nifti1(img) => {
                assert_eq!([1., 0., 0., -2.5], img.header.srow_x);
                assert_eq!(NiftiType::Int32 as i16, img.header.datatype);
            }
            other => panic!("expected a NIfTI mask, got {}", other),
        }
    }
}

#[test]
fn mgz_segmentations_produce_mgz_masks() {
    let dir = tempfile::tempdir().unwrap();
    let infile = dir.path().join("aseg.mgz");
    let outdir = dir.path().join("masks");

    let mut header = FsMghHeader::default();
    header.dim1len = 5;
    header.dim2len = 4;
    header.dim3len = 3;
    header.dim4len = 1;
    header.dtype = MRI_INT;
    FsMgh { header, data: aseg_data(), scan_params: None }.to_file(&infile).unwrap();

    let lut = FsColorLut::bundled().unwrap();
    let masks = split_volume_to_rois(&infile, &outdir, &lut, Some(&[17][..])).unwrap();

    assert_eq!(1, masks.len());
    assert!(masks[0].path.ends_with("left_hippocampus.mgz"));
    let restored = read_volume(&masks[0].path).unwrap();
    assert_eq!(count(&aseg_data(), 17.0), count(restored.data(), 1.0));
}

#[test]
fn an_unknown_label_aborts_before_anything_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let infile = dir.path().join("aseg.nii");
    let outdir = dir.path().join("volume");

    let mut img = aseg_nifti();
    img.data[[0, 0, 0, 0]] = 9999.0;
    img.to_file(&infile).unwrap();

    let lut = FsColorLut::bundled().unwrap();
    let result = split_volume_to_rois(&infile, &outdir, &lut, None);
    match result {
        Err(NeuroprepError::LabelNotFound(value)) => assert_eq!(9999.0, value),
        other => panic!("expected a missing label error, got {:?}", other),
    }
    assert!(!outdir.exists());
}

#[test]
fn a_missing_input_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let lut = FsColorLut::bundled().unwrap();
    let result = split_volume_to_rois(dir.path().join("missing.nii.gz"), dir.path().join("out"), &lut, None);
    assert!(matches!(result, Err(NeuroprepError::Io(_))));
}

#[test]
fn truncated_segmentations_are_rejected_before_anything_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let lut = FsColorLut::bundled().unwrap();

    let nii = dir.path().join("aseg.nii");
    aseg_nifti().to_file(&nii).unwrap();
    let bytes = fs::read(&nii).unwrap();
    fs::write(&nii, &bytes[..bytes.len() - 4]).unwrap();
    let outdir = dir.path().join("nii_masks");
    assert!(matches!(
        split_volume_to_rois(&nii, &outdir, &lut, None),
        Err(NeuroprepError::TruncatedVoxelData(_, _))
    ));
    assert!(!outdir.exists());

    let mgh = dir.path().join("aseg.mgh");
    let mut header = FsMghHeader::default();
    header.dim1len = 5;
    header.dim2len = 4;
    header.dim3len = 3;
    header.dim4len = 1;
    header.dtype = MRI_INT;
    FsMgh { header, data: aseg_data(), scan_params: None }.to_file(&mgh).unwrap();
    let bytes = fs::read(&mgh).unwrap();
    fs::write(&mgh, &bytes[..bytes.len() - 4]).unwrap();
    let outdir = dir.path().join("mgh_masks");
    assert!(matches!(split_volume_to_rois(&mgh, &outdir, &lut, None), Err(NeuroprepError::Io(_))));
    assert!(!outdir.exists());
}
