//! Utility functions used in all other neuroprep modules.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;

/// Check whether the file extension ends with ".gz".
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    file_name_ends_with(path, ".gz")
}

/// Check whether the file name ends with the given suffix, ignoring ASCII case.
pub fn file_name_ends_with<P>(path: P, suffix: &str) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().to_ascii_lowercase().ends_with(suffix))
        .unwrap_or(false)
}

/// Whether a file is stored GZip compressed, judging from its name. MGZ files are compressed MGH files.
pub fn is_compressed_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    is_gz_file(&path) || file_name_ends_with(&path, ".mgz")
}

/// Open a file for buffered reading, transparently decompressing it if the name says so.
pub fn open_input<P>(path: P) -> Result<Box<dyn Read>>
where
    P: AsRef<Path>,
{
    let gz = is_compressed_file(&path);
    let file = BufReader::new(File::open(path)?);
    if gz {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Create a file and hand a writer for it to `write_fn`. The output is GZip compressed if the file name says so.
pub fn write_output<P, F>(path: P, write_fn: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let gz = is_compressed_file(&path);
    let mut file = BufWriter::new(File::create(path)?);
    if gz {
        let mut encoder = GzEncoder::new(&mut file, Compression::default());
        write_fn(&mut encoder)?;
        encoder.finish()?;
    } else {
        write_fn(&mut file)?;
    }
    file.flush()?;
    Ok(())
}
