use marksheet::{
    answers::QuestionType,
    engine::{EvalWarning, evaluate, question_schema},
    registry::{AnswerKeyRow, AnswerKeyTable, KeyIdentity, KeyRegistry},
    report::TOTAL_COLUMN,
    tabular::{Cell, Table},
};

fn table(headers: &[&str], rows: Vec<Vec<Cell>>) -> Table {
    let mut table = Table::new(headers.iter().map(|header| header.to_string()).collect());
    for row in rows {
        table.push_row(row);
    }
    table
}

fn text(value: &str) -> Cell {
    Cell::Text(value.to_string())
}

fn key_row(question: &str, answer: &str, marks: f64, question_type: QuestionType) -> AnswerKeyRow {
    AnswerKeyRow {
        question: question.to_string(),
        answer: text(answer),
        marks,
        question_type,
    }
}

fn registry_with(class: &str, paper: &str, rows: Vec<AnswerKeyRow>) -> KeyRegistry {
    let mut registry = KeyRegistry::default();
    registry.insert(AnswerKeyTable::new(KeyIdentity::new(class, paper), rows));
    registry
}

#[test]
fn and_key_awards_full_marks_on_reordered_answer() {
    let students = table(
        &["Class", "Paper", "Q_1"],
        vec![vec![text("1"), text("1"), text("A,B")]],
    );
    let registry = registry_with("1", "1", vec![key_row("1", "B,A", 10.0, QuestionType::And)]);

    let evaluation = evaluate(&students, &registry);

    assert_eq!(evaluation.students[0].score_for("1"), Some(10.0));
    assert_eq!(evaluation.students[0].total, 10.0);
}

#[test]
fn or_key_awards_on_overlap_despite_unequal_sets() {
    let students = table(
        &["Class", "Paper", "Q_1"],
        vec![vec![text("1"), text("1"), text("A,B")]],
    );
    let registry = registry_with("1", "1", vec![key_row("1", "B,C", 10.0, QuestionType::Or)]);

    let evaluation = evaluate(&students, &registry);

    assert_eq!(evaluation.students[0].score_for("1"), Some(10.0));
    assert_eq!(evaluation.students[0].total, 10.0);
}

#[test]
fn unmatched_identity_scores_zero_everywhere() {
    let students = table(
        &["Class", "Paper", "Q_1", "Q_2"],
        vec![vec![text("1"), text("9"), text("A,B"), text("2")]],
    );
    let registry = registry_with("1", "1", vec![key_row("1", "A,B", 10.0, QuestionType::And)]);

    let evaluation = evaluate(&students, &registry);

    assert_eq!(evaluation.students[0].score_for("1"), Some(0.0));
    assert_eq!(evaluation.students[0].score_for("2"), Some(0.0));
    assert_eq!(evaluation.students[0].total, 0.0);
}

#[test]
fn missing_question_column_warns_without_zeroing_the_rest() {
    let students = table(
        &["Class", "Paper", "Q_1"],
        vec![vec![text("1"), text("1"), text("A")]],
    );
    let registry = registry_with(
        "1",
        "1",
        vec![
            key_row("1", "A", 5.0, QuestionType::Normal),
            key_row("7", "B", 5.0, QuestionType::Normal),
        ],
    );

    let evaluation = evaluate(&students, &registry);

    assert_eq!(evaluation.students[0].score_for("1"), Some(5.0));
    assert_eq!(evaluation.students[0].total, 5.0);
    assert!(evaluation.warnings.iter().any(|warning| matches!(
        warning,
        EvalWarning::MissingQuestionColumn { question, .. } if question == "7"
    )));
}

#[test]
fn malformed_question_header_is_reported_and_skipped() {
    let students = table(
        &["Class", "Paper", "Q_", "Q_1"],
        vec![vec![text("1"), text("1"), text("noise"), text("A")]],
    );
    let (questions, warnings) = question_schema(&students);

    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].label, "1");
    assert!(warnings.iter().any(|warning| matches!(
        warning,
        EvalWarning::MalformedQuestionColumn { column } if column == "Q_"
    )));
}

#[test]
fn duplicate_key_rows_keep_total_consistent_with_the_visible_award() {
    let students = table(
        &["Class", "Paper", "Q_1"],
        vec![vec![text("1"), text("1"), text("B")]],
    );
    let registry = registry_with(
        "1",
        "1",
        vec![
            key_row("1", "A", 5.0, QuestionType::Normal),
            key_row("1", "B", 3.0, QuestionType::Normal),
        ],
    );

    let evaluation = evaluate(&students, &registry);

    assert_eq!(evaluation.students[0].score_for("1"), Some(3.0));
    assert_eq!(evaluation.students[0].total, 3.0);
}

#[test]
fn question_columns_unknown_to_the_key_score_zero() {
    let students = table(
        &["Class", "Paper", "Q_1", "Q_5"],
        vec![vec![text("1"), text("1"), text("A"), text("whatever")]],
    );
    let registry = registry_with("1", "1", vec![key_row("1", "A", 5.0, QuestionType::Normal)]);

    let evaluation = evaluate(&students, &registry);

    assert_eq!(evaluation.students[0].score_for("5"), Some(0.0));
    assert_eq!(evaluation.students[0].total, 5.0);
}

#[test]
fn identity_cells_are_trimmed_and_numerically_canonical() {
    let students = table(
        &["Class", "Paper", "Q_1"],
        vec![vec![Cell::Number(1.0), text(" 1 "), text("A")]],
    );
    let registry = registry_with("1", "1", vec![key_row("1", "A", 2.0, QuestionType::Normal)]);

    let evaluation = evaluate(&students, &registry);

    assert_eq!(evaluation.students[0].identity, KeyIdentity::new("1", "1"));
    assert_eq!(evaluation.students[0].total, 2.0);
}

#[test]
fn result_rows_preserve_input_order_and_passthrough_columns() {
    let students = table(
        &["Name", "Class", "Paper", "Q_1"],
        vec![
            vec![text("first"), text("1"), text("1"), text("A")],
            vec![text("second"), text("1"), text("1"), text("B")],
        ],
    );
    let registry = registry_with("1", "1", vec![key_row("1", "A", 4.0, QuestionType::Normal)]);

    let evaluation = evaluate(&students, &registry);
    let result = evaluation.to_table();

    let name = result.column("Name").expect("Name column");
    let q1 = result.column("Q_1").expect("Q_1 column");
    let total = result.column(TOTAL_COLUMN).expect("total column");

    assert_eq!(result.cell(0, name), &text("first"));
    assert_eq!(result.cell(1, name), &text("second"));
    assert_eq!(result.cell(0, q1), &Cell::Number(4.0));
    assert_eq!(result.cell(1, q1), &Cell::Number(0.0));
    assert_eq!(result.cell(0, total), &Cell::Number(4.0));
    assert_eq!(result.cell(1, total), &Cell::Number(0.0));
}

#[test]
fn totals_equal_the_sum_of_visible_question_cells() {
    let students = table(
        &["Class", "Paper", "Q_1", "Q_2", "Q_3"],
        vec![vec![text("1"), text("1"), text("A"), text("2"), text("x,y")]],
    );
    let registry = registry_with(
        "1",
        "1",
        vec![
            key_row("1", "A", 2.5, QuestionType::Normal),
            key_row("2", "2.0", 3.0, QuestionType::Normal),
            key_row("3", "y,z", 4.0, QuestionType::Or),
        ],
    );

    let evaluation = evaluate(&students, &registry);
    let result = evaluation.to_table();
    let total_column = result.column(TOTAL_COLUMN).expect("total column");

    for (index, _) in result.rows().iter().enumerate() {
        let summed: f64 = evaluation
            .questions
            .iter()
            .map(|question| match result.cell(index, question.index) {
                Cell::Number(value) => *value,
                other => panic!("question cell should be numeric, got {other:?}"),
            })
            .sum();
        assert_eq!(result.cell(index, total_column), &Cell::Number(summed));
    }
    assert_eq!(evaluation.students[0].total, 9.5);
}
