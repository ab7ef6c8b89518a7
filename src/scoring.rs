use crate::{
    answers::{AnswerSet, QuestionType},
    tabular::Cell,
};

/// Computes the marks awarded for one question.
///
/// Both answers are normalized before comparison, so formatting differences
/// (`2` vs `2.0`, token order, duplicates) never affect the outcome. `AND`
/// and `NORMAL` award the full mark value only on exact set equality; `OR`
/// awards it when the sets share at least one token. The mark value is passed
/// through verbatim, never divided or capped.
pub fn score(student: &Cell, correct: &Cell, question_type: QuestionType, marks: f64) -> f64 {
    let student = AnswerSet::from_cell(student);
    let correct = AnswerSet::from_cell(correct);

    let awarded = match question_type {
        QuestionType::Or => student.intersects(&correct),
        QuestionType::And | QuestionType::Normal => student == correct,
    };

    if awarded { marks } else { 0.0 }
}
