//! Shrink command implementation.

use super::Batch;
use crate::utils::{
    PartialOutput, check_not_input, display_name, ensure_parent_dir, extension_of,
    shrink_output_path,
};
use clap::{Args, ValueEnum};
use log::{info, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
use swd_core::error::{IoContext, Result, SwdError};
use swd_format::{BlockSize, ContainerStats, ShrinkOptions, compress_blocks_parallel, read_info};
use swd_lzss::{BitOrder, LzssConfig};

/// Block size choices on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlockSizeArg {
    /// 2 KiB blocks
    #[value(name = "2k")]
    Size2K,
    /// 4 KiB blocks
    #[value(name = "4k")]
    Size4K,
    /// 8 KiB blocks
    #[value(name = "8k")]
    Size8K,
}

impl From<BlockSizeArg> for BlockSize {
    fn from(arg: BlockSizeArg) -> Self {
        match arg {
            BlockSizeArg::Size2K => BlockSize::Size2K,
            BlockSizeArg::Size4K => BlockSize::Size4K,
            BlockSizeArg::Size8K => BlockSize::Size8K,
        }
    }
}

/// Options that control how files are shrunk.
#[derive(Debug, Clone, Args)]
pub struct ShrinkArgs {
    /// Write a seekable block file instead of a single stream
    #[arg(short, long)]
    pub block: bool,

    /// Use the Gameboy byte order (and 2k blocks by default)
    #[arg(short, long)]
    pub gameboy: bool,

    /// Block size; implies --block
    #[arg(long, value_enum)]
    pub block_size: Option<BlockSizeArg>,

    /// Matches this long or shorter are sent as literals
    #[arg(long)]
    pub break_even: Option<usize>,

    /// Longest match to search for
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Farthest distance a match may reach back
    #[arg(long)]
    pub max_offset: Option<usize>,
}

impl ShrinkArgs {
    /// Map the flags onto container options.
    pub fn options(&self) -> Result<ShrinkOptions> {
        let defaults = LzssConfig::SWD;
        let config = LzssConfig::new(
            self.break_even.unwrap_or(defaults.break_even),
            self.max_length.unwrap_or(defaults.max_length),
            self.max_offset.unwrap_or(defaults.max_offset),
        )?;
        if !config.fits_code_tables() {
            warn!(
                "max length {} / max offset {} exceed the code tables; long matches will fail",
                config.max_length, config.max_offset
            );
        }

        let order = if self.gameboy {
            BitOrder::Gameboy
        } else {
            BitOrder::Standard
        };
        let options = ShrinkOptions::new().with_config(config).with_order(order);

        Ok(match (self.block_size, self.block) {
            (Some(size), _) => options.with_blocks(size.into()),
            (None, true) => options.with_default_blocks(),
            (None, false) => options,
        })
    }
}

/// Shrink every file named by `patterns`.
pub fn cmd_shrink(
    patterns: &[String],
    args: &ShrinkArgs,
    subdir: bool,
    parallel: bool,
    keep_going: bool,
    quiet: bool,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let options = args.options()?;
    if parallel && options.block_size.is_none() {
        warn!("--parallel only applies to block files; shrinking serially");
    }

    let mut batch = Batch::new(keep_going, quiet);
    let files = batch.inputs(patterns)?;
    batch.run(&files, |path| {
        shrink_file(path, &options, subdir, parallel).map(|_| ())
    })?;
    batch.finish()
}

/// Shrink one file next to itself (or into `SWD/`).
pub fn shrink_file(
    path: &Path,
    options: &ShrinkOptions,
    subdir: bool,
    parallel: bool,
) -> Result<ContainerStats> {
    println!("Shrinking \"{}\"", display_name(path));

    let input = File::open(path).map_err(|_| {
        SwdError::no_file(path.display().to_string(), "Unable to open input file")
    })?;
    let original_len = input.metadata().on_read()?.len();
    let extension = extension_of(path);

    let out_path = shrink_output_path(path, subdir);
    check_not_input(path, &out_path)?;
    ensure_parent_dir(&out_path)?;

    let mut output = PartialOutput::create(&out_path)?;
    let stats = if parallel && options.block_size.is_some() {
        let mut data = Vec::new();
        BufReader::new(input).read_to_end(&mut data).on_read()?;
        let packed = compress_blocks_parallel(&data, &extension, options)?;
        output.file_mut()?.write_all(&packed).on_write()?;
        stats_of(&packed)?
    } else {
        let mut reader = BufReader::new(input);
        let mut writer = BufWriter::new(output.file_mut()?);
        let stats =
            swd_format::shrink(&mut reader, &mut writer, original_len, &extension, options)?;
        writer.flush().on_write()?;
        stats
    };
    output.commit();

    info!(
        "{} -> {}: {} -> {} bytes ({:.1}%)",
        path.display(),
        out_path.display(),
        stats.original_len,
        stats.container_len,
        stats.ratio()
    );
    Ok(stats)
}

fn stats_of(packed: &[u8]) -> Result<ContainerStats> {
    let info = read_info(&mut Cursor::new(packed))?;
    let (blocks, stored_blocks) = match &info.index {
        Some(index) => (
            index.block_count(),
            index.entries()[..index.block_count()]
                .iter()
                .filter(|e| !e.compressed)
                .count(),
        ),
        None => (0, 0),
    };
    Ok(ContainerStats {
        original_len: u64::from(info.header.original_len()),
        container_len: info.container_len,
        blocks,
        stored_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ShrinkArgs {
        ShrinkArgs {
            block: false,
            gameboy: false,
            block_size: None,
            break_even: None,
            max_length: None,
            max_offset: None,
        }
    }

    #[test]
    fn test_default_options() {
        let options = args().options().unwrap();
        assert_eq!(options, ShrinkOptions::new());
    }

    #[test]
    fn test_block_flags() {
        let mut a = args();
        a.block = true;
        a.gameboy = true;
        let options = a.options().unwrap();
        assert_eq!(options.block_size, Some(BlockSize::Size2K));
        assert_eq!(options.order, BitOrder::Gameboy);

        let mut a = args();
        a.block_size = Some(BlockSizeArg::Size4K);
        assert_eq!(a.options().unwrap().block_size, Some(BlockSize::Size4K));
    }

    #[test]
    fn test_bad_engine_parameters() {
        let mut a = args();
        a.max_offset = Some(5000);
        assert!(matches!(a.options(), Err(SwdError::IllegalConfig { .. })));
    }

    #[test]
    fn test_stats_of_parallel_output() {
        let data = vec![9u8; 6000];
        let options = ShrinkOptions::new().with_blocks(BlockSize::Size2K);
        let packed = compress_blocks_parallel(&data, "", &options).unwrap();
        let stats = stats_of(&packed).unwrap();
        assert_eq!(stats.blocks, 3);
        assert_eq!(stats.stored_blocks, 0);
        assert_eq!(stats.container_len, packed.len() as u64);
    }
}
