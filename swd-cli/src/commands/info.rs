//! Info command implementation.

use super::expand::open_swd;
use crate::utils::expand_pattern;
use serde::{Deserialize, Serialize};
use std::path::Path;
use swd_format::{ContainerInfo, read_info};

/// JSON serializable block data.
#[derive(Debug, Serialize, Deserialize)]
struct BlockJson {
    index: usize,
    offset: u64,
    stored_len: u64,
    compressed: bool,
}

/// JSON output for one SWD file.
#[derive(Debug, Serialize, Deserialize)]
struct SwdInfoJson {
    file: String,
    size: u64,
    flags: u8,
    order: String,
    layout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    block_size: Option<usize>,
    extension: String,
    original_len: u32,
    ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<Vec<BlockJson>>,
}

fn ratio(info: &ContainerInfo) -> f64 {
    let original = u64::from(info.header.original_len());
    if original == 0 {
        100.0
    } else {
        info.container_len as f64 * 100.0 / original as f64
    }
}

fn block_list(info: &ContainerInfo) -> Result<Option<Vec<BlockJson>>, Box<dyn std::error::Error>> {
    let Some(index) = &info.index else {
        return Ok(None);
    };
    let mut blocks = Vec::with_capacity(index.block_count());
    for (i, span) in index.blocks().enumerate() {
        let span = span?;
        blocks.push(BlockJson {
            index: i,
            offset: span.offset,
            stored_len: span.stored_len,
            compressed: span.compressed,
        });
    }
    Ok(Some(blocks))
}

fn to_json(path: &Path, info: &ContainerInfo) -> Result<SwdInfoJson, Box<dyn std::error::Error>> {
    let header = &info.header;
    Ok(SwdInfoJson {
        file: path.display().to_string(),
        size: info.container_len,
        flags: header.flags(),
        order: header.order().name().to_string(),
        layout: if header.is_block() { "blocks" } else { "whole" }.to_string(),
        block_size: header.block_size().map(|size| size.size_bytes()),
        extension: header.extension(),
        original_len: header.original_len(),
        ratio: ratio(info),
        blocks: block_list(info)?,
    })
}

/// Show the header (and seek table) of SWD files.
pub fn cmd_info(
    patterns: &[String],
    show_blocks: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reports = Vec::new();
    for pattern in patterns {
        for path in expand_pattern(pattern)? {
            let (mut reader, _) = open_swd(&path)?;
            let info = read_info(&mut reader)?;
            reports.push(to_json(&path, &info)?);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for (n, report) in reports.iter().enumerate() {
        if n > 0 {
            println!();
        }
        print_report(report, show_blocks);
    }
    Ok(())
}

fn print_report(report: &SwdInfoJson, show_blocks: bool) {
    println!("SWD File Information");
    println!("====================");
    println!("File: {}", report.file);
    println!("Size: {} bytes", report.size);
    println!("Flags: 0x{:02X}", report.flags);
    println!("Byte order: {}", report.order);
    match report.block_size {
        Some(size) => println!("Layout: blocks of {} bytes", size),
        None => println!("Layout: whole file"),
    }
    if report.extension.is_empty() {
        println!("Extension: (none)");
    } else {
        println!("Extension: {}", report.extension);
    }
    println!("Original size: {} bytes", report.original_len);
    println!("Ratio: {:.1}%", report.ratio);

    let Some(blocks) = &report.blocks else {
        return;
    };
    let stored = blocks.iter().filter(|b| !b.compressed).count();
    println!();
    println!("Blocks:");
    println!("  Count: {}", blocks.len());
    println!("  Stored raw: {}", stored);
    if show_blocks {
        println!();
        println!("  {:>5}  {:>10}  {:>8}  Kind", "Block", "Offset", "Length");
        for block in blocks {
            println!(
                "  {:>5}  {:>10}  {:>8}  {}",
                block.index,
                block.offset,
                block.stored_len,
                if block.compressed { "packed" } else { "stored" }
            );
        }
    }
}
