//! Auto command: expand SWD files, shrink everything else.

use super::Batch;
use super::expand::expand_file;
use super::shrink::{ShrinkArgs, shrink_file};
use log::debug;
use std::fs::File;
use std::path::Path;
use swd_core::error::{Result, SwdError};
use swd_format::{ShrinkOptions, detect};

/// Expand or shrink every file named by `patterns`, whichever fits.
pub fn cmd_auto(
    patterns: &[String],
    args: &ShrinkArgs,
    subdir: bool,
    keep_going: bool,
    quiet: bool,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let options = args.options()?;
    let mut batch = Batch::new(keep_going, quiet);
    let files = batch.inputs(patterns)?;
    batch.run(&files, |path| auto_file(path, &options, subdir))?;
    batch.finish()
}

fn auto_file(path: &Path, options: &ShrinkOptions, subdir: bool) -> Result<()> {
    let mut file = File::open(path).map_err(|_| {
        SwdError::no_file(path.display().to_string(), "Unable to open input file")
    })?;
    let header = detect(&mut file)?;
    drop(file);

    match header {
        Some(header) => {
            debug!("{}: SWD file, flags 0x{:02X}", path.display(), header.flags());
            expand_file(path, subdir).map(|_| ())
        }
        None => shrink_file(path, options, subdir, false).map(|_| ()),
    }
}
