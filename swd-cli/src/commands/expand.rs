//! Expand command implementation.

use super::Batch;
use crate::utils::{
    PartialOutput, check_not_input, display_name, ensure_parent_dir, expand_output_path,
};
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use swd_core::error::{IoContext, Result, SwdError};
use swd_format::{SwdHeader, detect};

/// Expand every file named by `patterns`.
pub fn cmd_expand(
    patterns: &[String],
    subdir: bool,
    keep_going: bool,
    quiet: bool,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut batch = Batch::new(keep_going, quiet);
    let files = batch.inputs(patterns)?;
    batch.run(&files, |path| expand_file(path, subdir).map(|_| ()))?;
    batch.finish()
}

/// Open `path` and read its SWD header, rewinding to the start.
pub fn open_swd(path: &Path) -> Result<(BufReader<File>, SwdHeader)> {
    let file = File::open(path).map_err(|_| {
        SwdError::no_file(path.display().to_string(), "Unable to open input file")
    })?;
    let mut reader = BufReader::new(file);
    let header = detect(&mut reader)?.ok_or_else(|| {
        SwdError::no_file(path.display().to_string(), "Input file is not in SWD format")
    })?;
    reader.seek(SeekFrom::Start(0)).on_seek()?;
    Ok((reader, header))
}

/// Expand one SWD file to the name stored in its header.
pub fn expand_file(path: &Path, subdir: bool) -> Result<PathBuf> {
    println!("Expanding \"{}\"", display_name(path));

    let (mut reader, header) = open_swd(path)?;
    let out_path = expand_output_path(path, &header.extension(), subdir);
    check_not_input(path, &out_path)?;
    ensure_parent_dir(&out_path)?;

    let mut output = PartialOutput::create(&out_path)?;
    {
        let mut writer = BufWriter::new(output.file_mut()?);
        swd_format::expand(&mut reader, &mut writer)?;
        writer.flush().on_write()?;
    }
    output.commit();

    info!(
        "{} -> {}: {} bytes",
        path.display(),
        out_path.display(),
        header.original_len()
    );
    Ok(out_path)
}
