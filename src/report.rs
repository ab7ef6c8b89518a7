use std::path::Path;

use anyhow::{Context, Result};
use tabled::{
    builder::Builder,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use crate::{
    engine::Evaluation,
    tabular::{self, Cell, Table},
};

/// Name of the appended total column in the exported artifact.
pub const TOTAL_COLUMN: &str = "Total_Marks";
/// Sheet name used for the exported workbook.
pub const RESULT_SHEET: &str = "Evaluated Results";

impl Evaluation {
    /// Assembles the output table: input columns in their original order with each
    /// question column replaced by its awarded marks, plus an appended
    /// `Total_Marks` column. Result row order matches input row order.
    pub fn to_table(&self) -> Table {
        let mut headers = self.columns.clone();
        headers.push(TOTAL_COLUMN.to_string());

        let mut table = Table::new(headers);
        for student in &self.students {
            let mut passthrough = student.passthrough.iter();
            let mut row = Vec::with_capacity(self.columns.len() + 1);

            for index in 0..self.columns.len() {
                match self.questions.iter().find(|question| question.index == index) {
                    Some(question) => {
                        row.push(Cell::Number(student.score_for(&question.label).unwrap_or(0.0)));
                    }
                    None => {
                        row.push(
                            passthrough
                                .next()
                                .map(|(_, cell)| cell.clone())
                                .unwrap_or(Cell::Empty),
                        );
                    }
                }
            }

            row.push(Cell::Number(student.total));
            table.push_row(row);
        }
        table
    }
}

/// Prints the first `limit` result rows as a console table.
pub fn show_results(evaluation: &Evaluation, limit: usize) {
    let table = evaluation.to_table();
    let shown = table.rows().len().min(limit);

    let mut builder = Builder::default();
    builder.push_record(table.headers().iter().cloned());
    for row in table.rows().iter().take(limit) {
        builder.push_record(row.iter().map(Cell::to_string));
    }

    eprintln!(
        "{}",
        builder
            .build()
            .with(Panel::header("Evaluation Overview"))
            .with(Panel::footer(format!(
                "Showing {shown} of {} students",
                table.rows().len()
            )))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(24).keep_words(true)))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
    );
}

/// Exports the evaluation as an XLSX workbook with a single result sheet.
pub fn export_xlsx(evaluation: &Evaluation, path: &Path) -> Result<()> {
    tabular::write_xlsx(&evaluation.to_table(), path, RESULT_SHEET)
        .with_context(|| format!("Could not export results to `{}`", path.display()))
}
