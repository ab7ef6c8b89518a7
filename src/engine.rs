use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{
    registry::{KeyIdentity, KeyRegistry},
    scoring::score,
    tabular::{Cell, Table},
};

/// Column-name prefix marking a question answer column in the student table.
pub const QUESTION_PREFIX: &str = "Q_";
/// Identity column holding the student's class.
pub const CLASS_COLUMN: &str = "Class";
/// Identity column holding the student's paper.
pub const PAPER_COLUMN: &str = "Paper";

/// A question answer column discovered in the student table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionColumn {
    /// Question label, the part of the header after the `Q_` prefix, trimmed.
    pub label: String,
    /// Index of the column in the student table.
    pub index: usize,
}

/// Non-fatal problems surfaced during an evaluation run.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum EvalWarning {
    /// A key question has no matching column in the student table; it
    /// contributes zero and no column is written for it.
    #[error("Missing column `Q_{question}` for question {question} of key {identity} in student file")]
    MissingQuestionColumn {
        /// Identity of the key referencing the question.
        identity: KeyIdentity,
        /// Question label with no student column.
        question: String,
    },
    /// A student column carries the question prefix but no label after it;
    /// the column is excluded from scoring.
    #[error("Student column `{column}` matches the question prefix but has no question label")]
    MalformedQuestionColumn {
        /// The offending header.
        column: String,
    },
}

/// Scans the student headers for question columns, producing a typed list of
/// question identifiers. Prefixed headers with an empty label are reported
/// and excluded.
pub fn question_schema(students: &Table) -> (Vec<QuestionColumn>, Vec<EvalWarning>) {
    let mut columns = Vec::new();
    let mut warnings = Vec::new();

    for (index, header) in students.headers().iter().enumerate() {
        let Some(label) = header.strip_prefix(QUESTION_PREFIX) else {
            continue;
        };
        let label = label.trim();
        if label.is_empty() {
            warnings.push(EvalWarning::MalformedQuestionColumn {
                column: header.clone(),
            });
        } else {
            columns.push(QuestionColumn {
                label: label.to_string(),
                index,
            });
        }
    }

    (columns, warnings)
}

/// One evaluated student row, rebuilt fresh from its parts rather than
/// patched in place.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct ScoredStudent {
    /// (class, paper) identity the row was matched under.
    pub identity:    KeyIdentity,
    /// Non-question cells paired with their headers, in input column order.
    pub passthrough: Vec<(String, Cell)>,
    /// Awarded marks per question label, in question-column order.
    pub scores:      Vec<(String, f64)>,
    /// Sum of the awarded marks visible in this row.
    pub total:       f64,
}

impl ScoredStudent {
    /// Awarded marks for one question label, if that column exists.
    pub fn score_for(&self, label: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|(question, _)| question == label)
            .map(|(_, awarded)| *awarded)
    }
}

/// The outcome of one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Student-table headers in input order.
    pub columns:   Vec<String>,
    /// Question columns discovered by the schema step.
    pub questions: Vec<QuestionColumn>,
    /// One scored record per input student row, in input order.
    pub students:  Vec<ScoredStudent>,
    /// Non-fatal problems accumulated during the run.
    pub warnings:  Vec<EvalWarning>,
}

/// Evaluates every student row against the registry.
///
/// Each row is scored independently: its trimmed (Class, Paper) identity
/// selects an answer key, the key's rows are walked in file order, and a
/// fresh [`ScoredStudent`] record is built. A row with no matching key scores
/// zero on every question column. The pass is pure and infallible; every
/// per-row problem degrades to a zero or an accumulated warning.
pub fn evaluate(students: &Table, registry: &KeyRegistry) -> Evaluation {
    let (questions, mut warnings) = question_schema(students);
    let class_column = students.column(CLASS_COLUMN);
    let paper_column = students.column(PAPER_COLUMN);

    let identity_part = |row: usize, column: Option<usize>| match column {
        Some(column) => students.cell(row, column).to_string(),
        None => String::new(),
    };

    let mut scored = Vec::with_capacity(students.rows().len());
    for row in 0..students.rows().len() {
        let identity = KeyIdentity::new(
            &identity_part(row, class_column),
            &identity_part(row, paper_column),
        );

        let passthrough = students
            .headers()
            .iter()
            .enumerate()
            .filter(|(index, _)| !questions.iter().any(|question| question.index == *index))
            .map(|(index, header)| (header.clone(), students.cell(row, index).clone()))
            .collect();

        let mut awards: Vec<(String, f64)> = questions
            .iter()
            .map(|question| (question.label.clone(), 0.0))
            .collect();

        if let Some(key) = registry.get(&identity) {
            for key_row in key.rows() {
                match questions
                    .iter()
                    .find_position(|question| question.label == key_row.question)
                {
                    Some((position, question)) => {
                        let answer = students.cell(row, question.index);
                        awards[position].1 =
                            score(answer, &key_row.answer, key_row.question_type, key_row.marks);
                    }
                    None => warnings.push(EvalWarning::MissingQuestionColumn {
                        identity: identity.clone(),
                        question: key_row.question.clone(),
                    }),
                }
            }
        }

        let total = awards.iter().map(|(_, awarded)| awarded).sum();
        scored.push(
            ScoredStudent::builder()
                .identity(identity)
                .passthrough(passthrough)
                .scores(awards)
                .total(total)
                .build(),
        );
    }

    Evaluation {
        columns: students.headers().to_vec(),
        questions,
        students: scored,
        warnings,
    }
}
