//! Test command implementation.

use super::expand::open_swd;
use crate::utils::{display_name, expand_pattern};
use std::io;
use std::path::Path;
use swd_core::error::Result;

/// Expand each file without writing anything and report which ones are
/// intact.
pub fn cmd_test(patterns: &[String], verbose: bool) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for pattern in patterns {
        files.extend(expand_pattern(pattern)?);
    }

    let mut ok_count = 0usize;
    let mut errors: Vec<(String, String)> = Vec::new();

    for path in &files {
        let name = display_name(path);
        match test_file(path) {
            Ok(len) => {
                ok_count += 1;
                if verbose {
                    println!("  OK: {} ({} bytes)", name, len);
                }
            }
            Err(e) => {
                if verbose {
                    println!("  FAILED: {} - {}", name, e);
                }
                errors.push((name, e.to_string()));
            }
        }
    }

    println!();
    println!("Test results:");
    println!("  Total files: {}", files.len());
    println!("  OK: {}", ok_count);
    println!("  Failed: {}", errors.len());

    if !errors.is_empty() {
        if !verbose {
            println!();
            println!("Errors:");
            for (name, err) in &errors {
                println!("  {}: {}", name, err);
            }
        }
        return Err(format!("{} file(s) failed", errors.len()).into());
    }

    println!();
    println!("All files OK");
    Ok(())
}

/// Expand `path` into nothing, returning the restored length.
fn test_file(path: &Path) -> Result<u32> {
    let (mut reader, _) = open_swd(path)?;
    let header = swd_format::expand(&mut reader, &mut io::sink())?;
    Ok(header.original_len())
}
