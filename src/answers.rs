use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::tabular::{Cell, canonical_number};

/// Comparison policy for one question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    /// Award marks only on exact set equality.
    And,
    /// Award marks when at least one token overlaps.
    Or,
    /// Default policy, equivalent to [`QuestionType::And`].
    #[default]
    Normal,
}

impl QuestionType {
    /// Parses a raw type value. Matching is case-insensitive; unrecognized or
    /// empty values fall back to `Normal`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AND" => Self::And,
            "OR" => Self::Or,
            _ => Self::Normal,
        }
    }
}

/// A set of canonical answer tokens derived from one raw answer value.
///
/// Tokens are deduplicated and unordered. Numeric-looking tokens are
/// canonicalized so `2`, `2.0`, and ` 2 ` compare equal; everything else is
/// kept verbatim after trimming, case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSet(BTreeSet<String>);

impl AnswerSet {
    /// Normalizes a raw answer string into its canonical token set.
    ///
    /// The string is split on commas only when a comma is present; otherwise
    /// the whole trimmed string is one token. Tokens that are empty after
    /// trimming are skipped.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let tokens: Vec<&str> = if raw.contains(',') {
            raw.split(',').collect()
        } else {
            vec![raw]
        };

        let mut set = BTreeSet::new();
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.parse::<f64>() {
                Ok(value) => set.insert(canonical_number(value)),
                Err(_) => set.insert(token.to_string()),
            };
        }
        Self(set)
    }

    /// Normalizes a cell value; absent cells yield the empty set.
    pub fn from_cell(cell: &Cell) -> Self {
        match cell {
            Cell::Empty => Self::default(),
            _ => Self::parse(&cell.to_string()),
        }
    }

    /// Whether the set holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the two sets share at least one token.
    pub fn intersects(&self, other: &Self) -> bool {
        self.0.iter().any(|token| other.0.contains(token))
    }

    /// Iterates the canonical tokens in sorted order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
