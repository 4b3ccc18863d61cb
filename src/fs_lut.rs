//! Functions for reading label lookup tables, which map the integer labels of a
//! segmentation volume to brain region names and display colors.
//!
//! Two layouts are supported. Tables with a header line name their columns, and must
//! contain at least `id` and `name`. Tables without a header follow FreeSurfer's
//! `FreeSurferColorLUT.txt`, with the columns `id name r g b a` in this order.
//! Blank lines and lines starting with `#` are ignored in both.

use std::fmt;
use std::io::{BufRead, BufReader, Cursor};
use std::fs::File;
use std::path::Path;

use crate::error::{NeuroprepError, Result};

/// The label table packaged with this crate, covering the FreeSurfer aseg structures.
pub const BUNDLED_ASEG_LUT: &str = include_str!("../etc/freesurfer_aseg_labels.txt");


#[derive(Debug, Clone, PartialEq)]
pub struct FsColorLut {
    pub id: Vec<i32>,
    pub name: Vec<String>,
    pub r: Vec<i32>,
    pub g: Vec<i32>,
    pub b: Vec<i32>,
    pub a: Vec<i32>,
}


// Column positions of a table, as given by its header or by the FreeSurfer default layout.
struct LutColumns {
    id: usize,
    name: usize,
    rgba: [Option<usize>; 4],
}

impl LutColumns {
    fn freesurfer_default() -> LutColumns {
        LutColumns { id: 0, name: 1, rgba: [Some(2), Some(3), Some(4), Some(5)] }
    }

    fn from_header(fields: &[&str], line: usize) -> Result<LutColumns> {
        let position = |col: &str| fields.iter().position(|f| f.eq_ignore_ascii_case(col));
        let id = position("id").ok_or_else(|| NeuroprepError::InvalidLutLine(line, String::from("header has no 'id' column")))?;
        let name = position("name").ok_or_else(|| NeuroprepError::InvalidLutLine(line, String::from("header has no 'name' column")))?;
        Ok(LutColumns { id, name, rgba: [position("r"), position("g"), position("b"), position("a")] })
    }

    fn required(&self) -> usize {
        self.rgba.iter().flatten().chain([self.id, self.name].iter()).max().map(|m| m + 1).unwrap_or(0)
    }
}


impl FsColorLut {

    /// Read a label table from a text file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsColorLut> {
        let file = BufReader::new(File::open(path)?);
        FsColorLut::from_reader(file)
    }


    /// The aseg label table packaged with this crate.
    pub fn bundled() -> Result<FsColorLut> {
        FsColorLut::from_reader(Cursor::new(BUNDLED_ASEG_LUT))
    }


    /// Read a label table from a buffered reader, see the module documentation for the accepted layouts.
    pub fn from_reader<S>(input: S) -> Result<FsColorLut>
    where
        S: BufRead,
    {
        let mut lut = FsColorLut { id: Vec::new(), name: Vec::new(), r: Vec::new(), g: Vec::new(), b: Vec::new(), a: Vec::new() };
        let mut columns: Option<LutColumns> = None;

        for (idx, line) in input.lines().enumerate() {
            let line = line?;
            let line_number = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();

            if columns.is_none() && fields[0].parse::<i32>().is_err() {
                columns = Some(LutColumns::from_header(&fields, line_number)?);
                continue;
            }
            let cols = columns.get_or_insert_with(LutColumns::freesurfer_default);

            // Without a header, the color columns are optional.
            let required = if fields.len() >= cols.required() { cols.required() } else { cols.id.max(cols.name) + 1 };
            if fields.len() < required {
                return Err(NeuroprepError::InvalidLutLine(line_number, format!("expected at least {} columns, found {}", required, fields.len())));
            }

            let id = fields[cols.id].parse::<i32>()
                .map_err(|_| NeuroprepError::InvalidLutLine(line_number, format!("label id '{}' is not an integer", fields[cols.id])))?;
            let mut rgba = [0i32; 4];
            for (channel, col) in cols.rgba.iter().enumerate() {
                if let Some(value) = col.and_then(|c| fields.get(c)) {
                    rgba[channel] = value.parse::<i32>()
                        .map_err(|_| NeuroprepError::InvalidLutLine(line_number, format!("color value '{}' is not an integer", value)))?;
                }
            }

            lut.id.push(id);
            lut.name.push(fields[cols.name].to_string());
            lut.r.push(rgba[0]);
            lut.g.push(rgba[1]);
            lut.b.push(rgba[2]);
            lut.a.push(rgba[3]);
        }
        Ok(lut)
    }


    /// Get the number of labels in the table.
    pub fn num_labels(&self) -> usize {
        self.id.len()
    }


    /// Get the region name for the given label id. If the id occurs several times, the first entry wins.
    ///
    /// # Examples
    ///
    /// ```
    /// let lut = neuroprep::FsColorLut::bundled().unwrap();
    /// assert_eq!(Some("Left-Hippocampus"), lut.name_of(17));
    /// assert_eq!(None, lut.name_of(-1));
    /// ```
    pub fn name_of(&self, id: i32) -> Option<&str> {
        self.id.iter().position(|x| *x == id).map(|idx| self.name[idx].as_str())
    }
}


impl fmt::Display for FsColorLut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Label table for {} brain regions.", self.id.len())
    }
}


/// Read a label lookup table from a text file.
pub fn read_lut<P: AsRef<Path>>(path: P) -> Result<FsColorLut> {
    FsColorLut::from_file(path)
}
