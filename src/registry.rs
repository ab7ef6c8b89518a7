use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    answers::QuestionType,
    tabular::{self, Cell, Table, TableError},
};

/// Column holding the question identifier in an answer-key file.
pub const QUESTION_NO_COLUMN: &str = "QUESTION_NO";
/// Column holding the correct answer in an answer-key file.
pub const ANSWER_KEY_COLUMN: &str = "ANSWER_KEY";
/// Column holding the mark value in an answer-key file.
pub const MARKS_COLUMN: &str = "MARKS";
/// Optional column holding the question type in an answer-key file.
pub const QUESTION_TYPE_COLUMN: &str = "QUESTION_TYPE";

/// Errors produced while loading answer-key files. Each is local to one file;
/// the affected key is omitted and loading continues.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The file name does not follow the `C<class>P<paper>` convention.
    #[error("cannot derive a (class, paper) identity from `{}`", .path.display())]
    UnparsableIdentity {
        /// Path whose stem failed to parse.
        path: PathBuf,
    },
    /// The file content could not be loaded as a table.
    #[error(transparent)]
    Table(#[from] TableError),
    /// A required column is missing from the key file.
    #[error("`{}` is missing required column `{}`", .path.display(), .column)]
    MissingColumn {
        /// Path of the offending key file.
        path:   PathBuf,
        /// Name of the absent column.
        column: String,
    },
}

peg::parser! {
    /// Grammar for the `C<class>P<paper>` answer-key file-stem convention.
    grammar stem_parser() for str {
        /// matches the class component, any run of characters before the
        /// paper delimiter
        rule class_part() -> String
            = c:$([^'P']+) { c.to_string() }

        /// matches the paper component, which may not contain another
        /// delimiter or an extension dot
        rule paper_part() -> String
            = p:$([^'P' | '.']+) { p.to_string() }

        /// matches an extension-like remainder, which is ignored
        rule remainder() = "." [_]*

        /// parses a `C<class>P<paper>` file stem into its two components
        pub rule key_stem() -> (String, String)
            = "C" c:class_part() "P" p:paper_part() remainder()? { (c, p) }
    }
}

/// The compound key deciding which answer key applies to a student row.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyIdentity {
    /// Class component, trimmed.
    pub class: String,
    /// Paper component, trimmed.
    pub paper: String,
}

impl KeyIdentity {
    /// Creates an identity from its components, trimming both.
    pub fn new(class: &str, paper: &str) -> Self {
        Self {
            class: class.trim().to_string(),
            paper: paper.trim().to_string(),
        }
    }

    /// Parses an identity from an answer-key file stem. Returns `None` when
    /// the stem does not match `C<class>P<paper>` or either component is
    /// empty after trimming.
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let (class, paper) = stem_parser::key_stem(stem).ok()?;
        let identity = Self::new(&class, &paper);
        (!identity.class.is_empty() && !identity.paper.is_empty()).then_some(identity)
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}P{}", self.class, self.paper)
    }
}

/// One row of an answer key.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerKeyRow {
    /// Question identifier, the `QUESTION_NO` cell coerced to a trimmed
    /// string.
    pub question:      String,
    /// Raw correct-answer cell.
    pub answer:        Cell,
    /// Mark value; unparsable or missing marks fall back to zero.
    pub marks:         f64,
    /// Comparison policy for the question.
    pub question_type: QuestionType,
}

/// The ordered answer key for one (class, paper) identity.
#[derive(Debug, Clone)]
pub struct AnswerKeyTable {
    /// Identity the key applies to.
    pub identity: KeyIdentity,
    /// Key rows in file order.
    rows:         Vec<AnswerKeyRow>,
}

impl AnswerKeyTable {
    /// Creates a key table from already-built rows.
    pub fn new(identity: KeyIdentity, rows: Vec<AnswerKeyRow>) -> Self {
        Self { identity, rows }
    }

    /// Builds a key table from a decoded tabular file, validating that the
    /// required columns are present.
    pub fn from_table(identity: KeyIdentity, table: &Table, path: &Path) -> Result<Self, KeyError> {
        let required = |column: &str| {
            table.column(column).ok_or_else(|| KeyError::MissingColumn {
                path:   path.to_path_buf(),
                column: column.to_string(),
            })
        };

        let question_col = required(QUESTION_NO_COLUMN)?;
        let answer_col = required(ANSWER_KEY_COLUMN)?;
        let marks_col = required(MARKS_COLUMN)?;
        let type_col = table.column(QUESTION_TYPE_COLUMN);

        let rows = table
            .rows()
            .iter()
            .enumerate()
            .map(|(index, _)| AnswerKeyRow {
                question:      table.cell(index, question_col).to_string().trim().to_string(),
                answer:        table.cell(index, answer_col).clone(),
                marks:         table.cell(index, marks_col).as_number().unwrap_or(0.0),
                question_type: match type_col {
                    Some(column) => QuestionType::parse(&table.cell(index, column).to_string()),
                    None => QuestionType::Normal,
                },
            })
            .collect();

        Ok(Self::new(identity, rows))
    }

    /// Returns the key rows in file order.
    pub fn rows(&self) -> &[AnswerKeyRow] {
        &self.rows
    }

    /// Number of key rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the key has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Summary of one loaded key, as printed by the `keys` command.
#[derive(Debug, Clone, Serialize)]
pub struct KeySummary {
    /// Class component of the key identity.
    pub class:     String,
    /// Paper component of the key identity.
    pub paper:     String,
    /// Number of question rows the key holds.
    pub questions: usize,
}

/// In-memory mapping from (class, paper) identity to its answer key, built
/// once per evaluation run.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    /// Loaded keys by identity.
    tables: HashMap<KeyIdentity, AnswerKeyTable>,
}

impl KeyRegistry {
    /// Inserts a key table, returning the table it displaced when the same
    /// identity was already present.
    pub fn insert(&mut self, table: AnswerKeyTable) -> Option<AnswerKeyTable> {
        self.tables.insert(table.identity.clone(), table)
    }

    /// Returns the key table for the given identity, if one loaded.
    pub fn get(&self, identity: &KeyIdentity) -> Option<&AnswerKeyTable> {
        self.tables.get(identity)
    }

    /// Convenience lookup by raw class and paper strings.
    pub fn lookup(&self, class: &str, paper: &str) -> Option<&AnswerKeyTable> {
        self.get(&KeyIdentity::new(class, paper))
    }

    /// Number of loaded keys.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no keys loaded.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Summaries of the loaded keys, sorted by identity.
    pub fn summaries(&self) -> Vec<KeySummary> {
        let mut summaries: Vec<KeySummary> = self
            .tables
            .values()
            .map(|table| KeySummary {
                class:     table.identity.class.clone(),
                paper:     table.identity.paper.clone(),
                questions: table.len(),
            })
            .collect();
        summaries.sort_by(|a, b| (&a.class, &a.paper).cmp(&(&b.class, &b.paper)));
        summaries
    }
}

/// Loads a single answer-key file: the identity comes from the file stem, the
/// rows from the file content.
pub fn load_key(path: &Path) -> Result<AnswerKeyTable, KeyError> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let identity =
        KeyIdentity::from_file_stem(stem).ok_or_else(|| KeyError::UnparsableIdentity {
            path: path.to_path_buf(),
        })?;
    let table = tabular::read_table(path)?;
    AnswerKeyTable::from_table(identity, &table, path)
}

/// Builds a registry from answer-key files. Per-file failures are returned,
/// not raised: the affected key is omitted and evaluation proceeds with
/// whatever loaded. When two files resolve to the same identity the
/// last-loaded one wins.
pub fn build_registry(paths: &[PathBuf]) -> (KeyRegistry, Vec<KeyError>) {
    let mut registry = KeyRegistry::default();
    let mut errors = Vec::new();

    for path in paths {
        match load_key(path) {
            Ok(table) => {
                let identity = table.identity.clone();
                info!("Loaded `{}` as key {identity}", path.display());
                if registry.insert(table).is_some() {
                    warn!("Key {identity} appears more than once; keeping the last loaded file");
                }
            }
            Err(error) => errors.push(error),
        }
    }

    (registry, errors)
}
