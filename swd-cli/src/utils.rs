//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use swd_core::error::{Result, SwdError};

/// Subdirectory that `--subdir` shrinks into.
pub const SHRINK_SUBDIR: &str = "SWD";

/// Subdirectory that `--subdir` expands into.
pub const EXPAND_SUBDIR: &str = "ORG";

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

/// Resolve one file argument into the files it names.
///
/// Arguments are glob patterns. Directories and hidden files are skipped;
/// a pattern that names no file at all is a [`SwdError::NoFile`].
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| SwdError::no_file(pattern, format!("Invalid file pattern ({})", e.msg)))?;

    let files: Vec<PathBuf> = paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file() && !is_hidden(path))
        .collect();

    if files.is_empty() {
        return Err(SwdError::no_file(pattern, "File not found"));
    }
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// File name for messages.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extension of `path` without the dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Output path for shrinking `input`.
///
/// `<stem>.swd` next to the input, or `SWD/<name>` with `subdir`.
pub fn shrink_output_path(input: &Path, subdir: bool) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    if subdir {
        let name = input.file_name().unwrap_or_default();
        dir.join(SHRINK_SUBDIR).join(name)
    } else {
        let mut name = input.file_stem().unwrap_or_default().to_os_string();
        name.push(".swd");
        dir.join(name)
    }
}

/// Make a header extension safe to use in a file name.
///
/// Path separators, dots and control characters are replaced with `_`.
pub fn safe_extension(extension: &str) -> String {
    let safe: String = extension
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | '.' | ':') || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    if safe != extension {
        log::warn!(
            "extension {:?} is not a valid file name part, using \"{}\"",
            extension,
            safe
        );
    }
    safe
}

/// Output path for expanding `input` whose header stores `extension`.
///
/// `<stem>.<extension>` next to the input, or under `ORG/` with `subdir`.
/// The extension goes through [`safe_extension`] first.
pub fn expand_output_path(input: &Path, extension: &str, subdir: bool) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let dir = if subdir {
        dir.join(EXPAND_SUBDIR)
    } else {
        dir.to_path_buf()
    };

    let mut name = input.file_stem().unwrap_or_default().to_os_string();
    let extension = safe_extension(extension);
    if !extension.is_empty() {
        name.push(".");
        name.push(extension);
    }
    dir.join(name)
}

/// Refuse to write over the file being read.
pub fn check_not_input(input: &Path, output: &Path) -> Result<()> {
    let same = output == input
        || match (fs::canonicalize(input), fs::canonicalize(output)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
    if same {
        return Err(SwdError::no_file(
            output.display().to_string(),
            "Can't overwrite the input file",
        ));
    }
    Ok(())
}

/// Create the output subdirectory of `output` if it does not exist yet.
pub fn ensure_parent_dir(output: &Path) -> Result<()> {
    let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(SwdError::no_file(
            dir.display().to_string(),
            "Unable to create directory",
        ));
    }
    fs::create_dir(dir)
        .map_err(|_| SwdError::no_file(dir.display().to_string(), "Unable to create directory"))
}

/// Output file that is deleted again unless [`PartialOutput::commit`] is
/// called.
#[derive(Debug)]
pub struct PartialOutput {
    path: PathBuf,
    file: Option<File>,
}

impl PartialOutput {
    /// Create (or truncate) the output file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|_| {
            SwdError::no_file(path.display().to_string(), "Unable to open output file")
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    /// The open file.
    pub fn file_mut(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            SwdError::no_file(self.path.display().to_string(), "Output file already closed")
        })
    }

    /// Keep the file.
    pub fn commit(mut self) {
        self.file = None;
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shrink_output_paths() {
        assert_eq!(
            shrink_output_path(Path::new("data/level1.map"), false),
            PathBuf::from("data/level1.swd")
        );
        assert_eq!(
            shrink_output_path(Path::new("data/level1.map"), true),
            PathBuf::from("data/SWD/level1.map")
        );
        assert_eq!(
            shrink_output_path(Path::new("readme"), false),
            PathBuf::from("readme.swd")
        );
        assert_eq!(
            shrink_output_path(Path::new("font.8x8.chr"), false),
            PathBuf::from("font.8x8.swd")
        );
    }

    #[test]
    fn test_expand_output_paths() {
        assert_eq!(
            expand_output_path(Path::new("data/level1.swd"), "map", false),
            PathBuf::from("data/level1.map")
        );
        assert_eq!(
            expand_output_path(Path::new("data/level1.swd"), "map", true),
            PathBuf::from("data/ORG/level1.map")
        );
        assert_eq!(
            expand_output_path(Path::new("readme.swd"), "", false),
            PathBuf::from("readme")
        );
    }

    #[test]
    fn test_extension_cannot_leave_directory() {
        assert_eq!(
            expand_output_path(Path::new("data/level1.swd"), "a/b", false),
            PathBuf::from("data/level1.a_b")
        );
        assert_eq!(
            expand_output_path(Path::new("level1.swd"), "/..", true),
            PathBuf::from("ORG/level1.___")
        );
        assert_eq!(safe_extension("a\\b"), "a_b");
        assert_eq!(safe_extension("c\u{1}d"), "c_d");
        assert_eq!(safe_extension("map"), "map");
    }

    #[test]
    fn test_overwrite_refused() {
        let err = check_not_input(Path::new("a.swd"), Path::new("a.swd")).unwrap_err();
        assert!(err.to_string().contains("Can't overwrite the input file"));
        assert!(check_not_input(Path::new("a.bin"), Path::new("a.swd")).is_ok());
    }

    #[test]
    fn test_hidden_files() {
        assert!(is_hidden(Path::new("dir/.secret")));
        assert!(!is_hidden(Path::new(".hidden-dir/visible")));
        assert_eq!(extension_of(Path::new("a/b.tiles")), "tiles");
        assert_eq!(extension_of(Path::new("a/b")), "");
    }

    #[test]
    fn test_missing_pattern() {
        let err = expand_pattern("definitely/not/here/*.nothing").unwrap_err();
        assert!(matches!(err, SwdError::NoFile { .. }));
    }
}
