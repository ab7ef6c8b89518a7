#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// File extensions accepted as tabular uploads.
pub const TABULAR_EXTENSIONS: [&str; 3] = ["csv", "xls", "xlsx"];

/// A glob utility function to find paths to tabular files under a directory
///
/// * `root_dir`: the root directory where search starts
/// * `search_depth`: how many folders deep to search for
pub fn find_tabular_files(root_dir: &Path, search_depth: i8) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for extension in TABULAR_EXTENSIONS {
        let mut pattern = root_dir.to_path_buf();

        for _ in 0..search_depth {
            pattern.push("**");
        }

        pattern.push(format!("*.{extension}"));
        let pattern = pattern
            .to_str()
            .context("Could not convert root_dir to string")?
            .to_string();

        found.extend(
            glob(&pattern)
                .context("Could not create glob")?
                .filter_map(Result::ok),
        );
    }

    found.sort();
    found.dedup();
    Ok(found)
}

/// Expands a mixed list of key files and directories into concrete file
/// paths; directories contribute every tabular file found beneath them.
pub fn expand_key_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for path in paths {
        if path.is_dir() {
            expanded.extend(find_tabular_files(path, 2)?);
        } else {
            expanded.push(path.clone());
        }
    }
    Ok(expanded)
}
