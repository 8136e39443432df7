//! Command implementations for the SWD CLI.

pub mod auto;
pub mod expand;
pub mod info;
pub mod shrink;
pub mod test;

pub use auto::cmd_auto;
pub use expand::cmd_expand;
pub use info::cmd_info;
pub use shrink::{ShrinkArgs, cmd_shrink};
pub use test::cmd_test;

use crate::utils::{create_progress_bar, display_name, expand_pattern};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use swd_core::SwdError;

/// Runs one operation over every file named by the command line.
///
/// Without `keep_going` the first error stops the batch. With it, per-file
/// errors are reported and the batch moves on, except for fatal kinds which
/// always stop it.
pub struct Batch {
    keep_going: bool,
    quiet: bool,
    failures: usize,
    progress: ProgressBar,
}

impl Batch {
    /// Create a batch driver.
    pub fn new(keep_going: bool, quiet: bool) -> Self {
        Self {
            keep_going,
            quiet,
            failures: 0,
            progress: ProgressBar::hidden(),
        }
    }

    /// Resolve the file patterns.
    pub fn inputs(&mut self, patterns: &[String]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        let mut files = Vec::new();
        for pattern in patterns {
            match expand_pattern(pattern) {
                Ok(found) => files.extend(found),
                Err(e) => self.record(Path::new(pattern), e)?,
            }
        }
        Ok(files)
    }

    /// Apply `op` to every file.
    pub fn run<F>(&mut self, files: &[PathBuf], mut op: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: FnMut(&Path) -> swd_core::Result<()>,
    {
        self.progress = create_progress_bar(files.len() as u64, files.len() > 1 && !self.quiet);

        for path in files {
            self.progress.set_message(display_name(path));
            let result = self.progress.suspend(|| op(path));
            if let Err(e) = result {
                self.record(path, e)?;
            }
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();
        Ok(())
    }

    /// Report a failure and decide whether the batch carries on.
    fn record(&mut self, path: &Path, error: SwdError) -> Result<(), Box<dyn std::error::Error>> {
        self.failures += 1;
        if error.is_fatal() || !self.keep_going {
            self.progress.finish_and_clear();
            return Err(format!("{} ({})", error, path.display()).into());
        }
        self.progress
            .suspend(|| eprintln!("Error: {} ({})", error, path.display()));
        Ok(())
    }

    /// Finish the batch, failing if any file failed.
    pub fn finish(self) -> Result<(), Box<dyn std::error::Error>> {
        if self.failures > 0 {
            return Err(format!("{} file(s) failed", self.failures).into());
        }
        if !self.quiet {
            println!("operation complete");
        }
        Ok(())
    }
}
