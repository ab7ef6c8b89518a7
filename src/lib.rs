//! # marksheet
//!
//! A batch evaluator that scores student exam responses against
//! per-(class, paper) answer keys and exports a scored spreadsheet.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Answer normalization and question types
pub mod answers;
/// The evaluation engine orchestrating scoring across students
pub mod engine;
/// Loading answer keys into an in-memory registry
pub mod registry;
/// Result table assembly, console preview, and spreadsheet export
pub mod report;
/// Per-question scoring rules
pub mod scoring;
/// Tabular file model, readers, and writers
pub mod tabular;
/// Utility functions for convenience
pub mod util;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use engine::{Evaluation, evaluate};
use registry::{KeyError, build_registry};

/// Loads the student file and the answer-key files, then runs one evaluation
/// pass.
///
/// Key-file failures are returned alongside the evaluation rather than
/// raised; the run itself only fails when the student file cannot be loaded
/// or no key paths were supplied at all.
pub fn evaluate_files(
    students: &Path,
    key_paths: &[PathBuf],
) -> Result<(Evaluation, Vec<KeyError>)> {
    ensure!(!key_paths.is_empty(), "No answer key files were supplied");

    let key_paths = util::expand_key_paths(key_paths)?;
    ensure!(
        !key_paths.is_empty(),
        "No answer key files were found at the supplied paths"
    );

    let students = tabular::read_table(students)
        .with_context(|| format!("Could not load student file `{}`", students.display()))?;

    let (registry, errors) = build_registry(&key_paths);
    Ok((evaluate(&students, &registry), errors))
}
