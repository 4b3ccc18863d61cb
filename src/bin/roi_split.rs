//! roi_split -- split a segmentation volume into one binary mask volume per brain region.
//!
//! Usage: `roi_split <infile> <outdir>`, e.g. `roi_split aseg2raw.nii.gz volume/`.

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use neuroprep::{FsColorLut, split_volume_to_rois};

#[derive(Parser, Debug)]
#[command(name = "roi_split", version)]
#[command(about = "Split a labeled volume (e.g. a FreeSurfer aseg) into one binary mask volume per region")]
struct Args {
    /// Segmentation volume (.nii, .nii.gz, .mgh or .mgz).
    infile: PathBuf,

    /// Directory to store the region masks in. Created if it does not exist.
    outdir: PathBuf,

    /// Label table to use instead of the bundled FreeSurfer aseg table.
    #[arg(long, env = "NEUROPREP_LABEL_TABLE")]
    labels: Option<PathBuf>,

    /// Only write masks for these label ids (comma separated or repeated).
    #[arg(long, value_delimiter = ',')]
    only: Vec<i32>,
}

fn run(args: &Args) -> neuroprep::Result<()> {
    log::info!("Processing ROI labels");
    let lut = match &args.labels {
        Some(path) => FsColorLut::from_file(path)?,
        None => FsColorLut::bundled()?,
    };
    log::debug!("{}", lut);

    let only = if args.only.is_empty() { None } else { Some(args.only.as_slice()) };
    let masks = split_volume_to_rois(&args.infile, &args.outdir, &lut, only)?;
    log::info!("Wrote {} region masks to '{}'", masks.len(), args.outdir.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_takes_a_single_list_before_the_positionals() {
        let args = Args::try_parse_from(["roi_split", "--only", "17,53", "aseg.nii.gz", "volume"]).unwrap();
        assert_eq!(vec![17, 53], args.only);
        assert_eq!(PathBuf::from("aseg.nii.gz"), args.infile);
        assert_eq!(PathBuf::from("volume"), args.outdir);
    }

    #[test]
    fn only_can_be_repeated() {
        let args = Args::try_parse_from(["roi_split", "aseg.mgz", "volume", "--only", "2", "--only", "41"]).unwrap();
        assert_eq!(vec![2, 41], args.only);
    }
}
