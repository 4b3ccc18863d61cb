//! Framewise Displacement (FD) from the rigid-body transforms estimated by motion correction.
//!
//! The input is a text file as written by AFNI's `3dvolreg -1Dmatrix_save`: one line per time
//! point, holding the upper 3 rows of the 4x4 affine transform in row-major order (12 values).
//! FD follows Jenkinson et al. (2002), approximating the brain by a sphere of radius
//! [`BRAIN_RADIUS_MM`]. The absolute FD of a time point is its displacement from the identity
//! transform, the relative FD the displacement from the previous time point.

use log::{debug, info};
use nalgebra::Matrix4;
use ndarray::{Array1, Array2};
use ndarray_stats::QuantileExt;

use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{NeuroprepError, Result};
use crate::util::write_output;

/// Default radius of the sphere representing the brain, in mm (as in FSL).
pub const BRAIN_RADIUS_MM: f64 = 80.0;

/// Number of values per line of an affine matrix file.
pub const AFF12_VALUES_PER_ROW: usize = 12;


/// Read the rigid-body transforms from an affine matrix file, one 4x4 matrix per time point.
///
/// Blank lines and lines starting with `#` are skipped. The bottom row (0, 0, 0, 1) is implicit.
pub fn read_transforms<P: AsRef<Path>>(path: P) -> Result<Vec<Matrix4<f64>>> {
    let file = BufReader::new(File::open(path)?);
    transforms_from_reader(file)
}


/// Read rigid-body transforms from a buffered reader, see [`read_transforms`].
pub fn transforms_from_reader<S>(input: S) -> Result<Vec<Matrix4<f64>>>
where
    S: BufRead,
{
    let mut transforms = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let line_number = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let values = trimmed
            .split_whitespace()
            .map(|v| v.parse::<f64>().map_err(|e| NeuroprepError::ParseValue(line_number, e)))
            .collect::<Result<Vec<f64>>>()?;
        let aff12: &[f64; AFF12_VALUES_PER_ROW] = values.as_slice().try_into().map_err(|_| {
            NeuroprepError::InvalidMotionRow(line_number, format!("expected {} values, found {}", AFF12_VALUES_PER_ROW, values.len()))
        })?;
        transforms.push(aff12_to_matrix(aff12));
    }
    Ok(transforms)
}


/// Build the full 4x4 matrix from the 12 values of the upper 3 rows, given row by row.
pub fn aff12_to_matrix(aff12: &[f64; AFF12_VALUES_PER_ROW]) -> Matrix4<f64> {
    let mut full = [0f64; 16];
    full[..AFF12_VALUES_PER_ROW].copy_from_slice(aff12);
    full[15] = 1.0;
    Matrix4::from_row_slice(&full)
}


/// Jenkinson FD between a reference and a moving transform.
///
/// With `M = reference * inverse(moving) - I`, the rotational part `A` (upper left 3x3) and the
/// translation `b` (upper right 3x1) of `M`, this is `sqrt(rmax^2 / 5 * trace(A^T A) + b^T b)`.
///
/// Returns `None` if `moving` is not invertible.
pub fn jenkinson_fd(reference: &Matrix4<f64>, moving: &Matrix4<f64>, rmax: f64) -> Option<f64> {
    let m = reference * moving.try_inverse()? - Matrix4::<f64>::identity();
    let a = m.fixed_view::<3, 3>(0, 0);
    let b = m.fixed_view::<3, 1>(0, 3);
    let rotational = (rmax * rmax / 5.0) * (a.transpose() * a).trace();
    let translational = (b.transpose() * b)[(0, 0)];
    Some((rotational + translational).sqrt())
}


/// Absolute and relative FD, one value per time point.
#[derive(Debug, Clone, PartialEq)]
pub struct FramewiseDisplacement {
    pub absolute: Array1<f64>,
    pub relative: Array1<f64>,
}

impl FramewiseDisplacement {

    /// Compute FD for a sequence of transforms. The relative FD of the first time point is 0.
    ///
    /// # Errors
    ///
    /// * [`NeuroprepError::SingularTransform`] with the index of the first transform that cannot be inverted.
    pub fn from_transforms(transforms: &[Matrix4<f64>], rmax: f64) -> Result<FramewiseDisplacement> {
        let identity = Matrix4::identity();
        let ntpts = transforms.len();

        let mut absolute = Array1::<f64>::zeros(ntpts);
        for (idx, transform) in transforms.iter().enumerate() {
            absolute[idx] = jenkinson_fd(&identity, transform, rmax).ok_or(NeuroprepError::SingularTransform(idx))?;
        }

        let mut relative = Array1::<f64>::zeros(ntpts);
        for idx in 1..ntpts {
            relative[idx] = jenkinson_fd(&transforms[idx - 1], &transforms[idx], rmax).ok_or(NeuroprepError::SingularTransform(idx))?;
        }

        Ok(FramewiseDisplacement { absolute, relative })
    }

    /// The number of time points.
    pub fn len(&self) -> usize {
        self.absolute.len()
    }

    pub fn is_empty(&self) -> bool {
        self.absolute.is_empty()
    }

    /// Two columns, absolute FD first, one row per time point.
    pub fn to_columns(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), 2), |(row, col)| {
            if col == 0 { self.absolute[row] } else { self.relative[row] }
        })
    }

    /// The largest absolute FD, or `None` for an empty series.
    pub fn max_absolute(&self) -> Option<f64> {
        self.absolute.max().ok().copied()
    }

    /// The largest relative FD, or `None` for an empty series.
    pub fn max_relative(&self) -> Option<f64> {
        self.relative.max().ok().copied()
    }

    /// The mean relative FD, or `None` for an empty series.
    pub fn mean_relative(&self) -> Option<f64> {
        self.relative.mean()
    }
}

impl fmt::Display for FramewiseDisplacement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Framewise displacement for {} time points.", self.len())
    }
}


/// An output file name template with exactly one `%s`, which is replaced by `abs` or `rel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    head: String,
    tail: String,
}

impl OutputTemplate {

    /// Parse a template like `motion_%s.1D`.
    ///
    /// # Errors
    ///
    /// * [`NeuroprepError::InvalidOutputTemplate`] if the template does not contain exactly one `%s`.
    pub fn new(template: &str) -> Result<OutputTemplate> {
        match template.find("%s") {
            Some(pos) if !template[pos + 2..].contains("%s") => Ok(OutputTemplate {
                head: template[..pos].to_string(),
                tail: template[pos + 2..].to_string(),
            }),
            _ => Err(NeuroprepError::InvalidOutputTemplate(template.to_string())),
        }
    }

    /// The template `<prefix>_%s.1D`. The prefix is used literally.
    pub fn from_prefix(prefix: &str) -> OutputTemplate {
        OutputTemplate { head: format!("{}_", prefix), tail: String::from(".1D") }
    }

    /// Substitute the placeholder.
    pub fn path_for(&self, measure: &str) -> PathBuf {
        PathBuf::from(format!("{}{}{}", self.head, measure, self.tail))
    }
}


/// Write a series as a 1D file, one value per line with six decimals.
pub fn write_1d<P: AsRef<Path>>(path: P, values: &Array1<f64>) -> Result<()> {
    write_output(path, |output| {
        for value in values.iter() {
            writeln!(output, "{:.6}", value)?;
        }
        Ok(())
    })
}


/// Read a 1D file with one value per line. Blank lines and lines starting with `#` are skipped.
pub fn read_1d<P: AsRef<Path>>(path: P) -> Result<Array1<f64>> {
    let file = BufReader::new(File::open(path)?);
    let mut values = Vec::new();
    for (idx, line) in file.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        values.push(trimmed.parse::<f64>().map_err(|e| NeuroprepError::ParseValue(idx + 1, e))?);
    }
    Ok(Array1::from(values))
}


/// Compute Jenkinson FD for an affine matrix file, and optionally write the two series.
///
/// If `out_template` is given, the absolute FD is written to the file named by substituting
/// `abs` for its `%s`, the relative FD to the one with `rel`. The template is checked before
/// the input is read, so an invalid template leaves no files behind.
///
/// # Examples
///
/// ```no_run
/// let fd = neuroprep::fd_jenkinson("/path/to/func_run01_mat_vr_aff12.1D", Some("motion_%s.1D"), neuroprep::BRAIN_RADIUS_MM).unwrap();
/// println!("max absolute FD: {:?} mm", fd.max_absolute());
/// ```
pub fn fd_jenkinson<P: AsRef<Path>>(in_file: P, out_template: Option<&str>, rmax: f64) -> Result<FramewiseDisplacement> {
    let template = out_template.map(OutputTemplate::new).transpose()?;
    fd_jenkinson_with_template(in_file, template.as_ref(), rmax)
}


/// Like [`fd_jenkinson`], with an already validated template.
pub fn fd_jenkinson_with_template<P: AsRef<Path>>(in_file: P, template: Option<&OutputTemplate>, rmax: f64) -> Result<FramewiseDisplacement> {
    let transforms = read_transforms(in_file)?;
    debug!("Read {} transforms", transforms.len());
    let fd = FramewiseDisplacement::from_transforms(&transforms, rmax)?;

    if let Some(template) = template {
        let abs_path = template.path_for("abs");
        let rel_path = template.path_for("rel");
        info!("Writing absolute FD to '{}'", abs_path.display());
        write_1d(&abs_path, &fd.absolute)?;
        info!("Writing relative FD to '{}'", rel_path.display());
        write_1d(&rel_path, &fd.relative)?;
    }
    Ok(fd)
}
