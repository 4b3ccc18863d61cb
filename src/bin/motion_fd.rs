//! motion_fd -- compute Framewise Displacement from the affine matrices of motion correction.
//!
//! Usage: `motion_fd <input-matfile> <output-prefix>`, writes `<output-prefix>_abs.1D` and `<output-prefix>_rel.1D`.

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use neuroprep::motion_fd::fd_jenkinson_with_template;
use neuroprep::{OutputTemplate, BRAIN_RADIUS_MM};

#[derive(Parser, Debug)]
#[command(name = "motion_fd", version)]
#[command(about = "Compute absolute and relative Framewise Displacement (Jenkinson) from 3dvolreg aff12 matrices")]
struct Args {
    /// Affine matrix file, as saved by 3dvolreg -1Dmatrix_save (e.g. func_mat_vr_aff12.1D).
    infile: PathBuf,

    /// Prefix of the output files, '_abs.1D' and '_rel.1D' are appended.
    outprefix: String,

    /// Radius of the sphere approximating the brain, in mm.
    #[arg(long, default_value_t = BRAIN_RADIUS_MM)]
    radius: f64,
}

fn run(args: &Args) -> neuroprep::Result<()> {
    let template = OutputTemplate::from_prefix(&args.outprefix);
    let fd = fd_jenkinson_with_template(&args.infile, Some(&template), args.radius)?;

    log::info!("{}", fd);
    if let (Some(abs_max), Some(rel_max), Some(rel_mean)) = (fd.max_absolute(), fd.max_relative(), fd.mean_relative()) {
        log::info!("absolute FD max {:.3} mm, relative FD max {:.3} mm, mean {:.3} mm", abs_max, rel_max, rel_mean);
    }
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
