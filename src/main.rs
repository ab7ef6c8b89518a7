#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # marksheet
//!
//! Command-line driver for the evaluator: one synchronous
//! load → evaluate → export cycle per invocation, with no state retained
//! between runs.

use std::path::PathBuf;

use anyhow::Result;
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use marksheet::{evaluate_files, registry::build_registry, report, util};
use tracing::{Level, info, metadata::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Score a student file against answer keys and export the result
    Evaluate {
        /// Student response file.
        students: PathBuf,
        /// Answer key files or directories.
        keys:     Vec<PathBuf>,
        /// Output workbook path.
        out:      PathBuf,
        /// Number of result rows to print.
        preview:  usize,
        /// Skip the console results table.
        no_table: bool,
    },
    /// Summarize the keys that load from the given paths
    Keys {
        /// Answer key files or directories.
        keys: Vec<PathBuf>,
    },
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the student response file path
    fn students() -> impl Parser<PathBuf> {
        long("students")
            .short('s')
            .help("Student response file (CSV or Excel)")
            .argument::<PathBuf>("FILE")
    }

    /// parses answer key files or directories
    fn keys() -> impl Parser<Vec<PathBuf>> {
        long("key")
            .short('k')
            .help("Answer key file or directory; files are named C<class>P<paper>.<ext>")
            .argument::<PathBuf>("PATH")
            .many()
    }

    /// parses the output workbook path
    fn out() -> impl Parser<PathBuf> {
        long("out")
            .short('o')
            .help("Path of the exported workbook")
            .argument::<PathBuf>("FILE")
            .fallback(PathBuf::from("evaluated_output.xlsx"))
    }

    /// parses the preview row count
    fn preview() -> impl Parser<usize> {
        long("preview")
            .help("Number of result rows to print")
            .argument::<usize>("N")
            .fallback(50)
    }

    /// parses the table-suppression switch
    fn no_table() -> impl Parser<bool> {
        long("no-table").help("Skip the console results table").switch()
    }

    let evaluate = construct!(Cmd::Evaluate {
        students(),
        keys(),
        out(),
        preview(),
        no_table()
    })
    .to_options()
    .command("evaluate")
    .help("Score a student file against the supplied answer keys");

    let keys_cmd = construct!(Cmd::Keys { keys() })
        .to_options()
        .command("keys")
        .help("Print a JSON summary of the answer keys that load from the given paths");

    construct!([evaluate, keys_cmd])
        .to_options()
        .descr("Scores student exam responses against per-class answer keys")
        .run()
}

fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match options() {
        Cmd::Evaluate {
            students,
            keys,
            out,
            preview,
            no_table,
        } => {
            let (evaluation, key_errors) = match evaluate_files(&students, &keys) {
                Ok(run) => run,
                Err(e) => {
                    eprintln!("{} {e:#}", "error:".red().bold());
                    std::process::exit(1);
                }
            };

            for error in &key_errors {
                warn!("{error}");
            }
            for warning in &evaluation.warnings {
                warn!("{warning}");
            }

            if !no_table {
                report::show_results(&evaluation, preview);
            }

            report::export_xlsx(&evaluation, &out)?;
            info!(
                "Evaluated {} students; wrote `{}`",
                evaluation.students.len(),
                out.display()
            );
        }
        Cmd::Keys { keys } => {
            let key_paths = util::expand_key_paths(&keys)?;
            let (registry, errors) = build_registry(&key_paths);
            for error in &errors {
                warn!("{error}");
            }
            println!("{}", serde_json::to_string(&registry.summaries())?);
        }
    };

    Ok(())
}
