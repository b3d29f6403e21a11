//! crates/learnhub_core/src/quiz.rs
//!
//! Quiz grading.

use serde::Serialize;

use crate::domain::Quiz;
use crate::ports::{PortError, PortResult};
use crate::progress::percent;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub correct: usize,
    pub total: usize,
    pub score_percent: u8,
    pub passed: bool,
}

/// Grades `answers` (one selected option index per question, in order).
pub fn grade(quiz: &Quiz, answers: &[usize]) -> PortResult<QuizResult> {
    if answers.len() != quiz.questions.len() {
        return Err(PortError::InvalidInput(format!(
            "expected {} answers, got {}",
            quiz.questions.len(),
            answers.len()
        )));
    }
    if let Some((i, _)) = quiz
        .questions
        .iter()
        .zip(answers)
        .enumerate()
        .find(|(_, (q, a))| **a >= q.options.len())
    {
        return Err(PortError::InvalidInput(format!(
            "answer to question {} is not one of its options",
            i + 1
        )));
    }

    let correct = quiz
        .questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.correct_option == **a)
        .count();
    let total = quiz.questions.len();
    let score_percent = percent(correct, total);

    Ok(QuizResult {
        correct,
        total,
        score_percent,
        passed: total > 0 && score_percent >= quiz.pass_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn quiz() -> &'static Quiz {
        Catalog::builtin().quiz("wdf-3").unwrap()
    }

    #[test]
    fn all_correct_passes() {
        let result = grade(quiz(), &[0, 1, 2]).unwrap();
        assert_eq!(result.correct, 3);
        assert_eq!(result.score_percent, 100);
        assert!(result.passed);
    }

    #[test]
    fn below_threshold_fails() {
        // 1 of 3 is 33%, threshold is 60%
        let result = grade(quiz(), &[0, 0, 0]).unwrap();
        assert_eq!(result.correct, 1);
        assert_eq!(result.score_percent, 33);
        assert!(!result.passed);
    }

    #[test]
    fn threshold_is_inclusive() {
        // 2 of 3 rounds to 67%, threshold 60%
        assert!(grade(quiz(), &[0, 1, 0]).unwrap().passed);
    }

    #[test]
    fn wrong_answer_count_is_rejected() {
        assert!(matches!(grade(quiz(), &[0, 1]), Err(PortError::InvalidInput(_))));
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        assert!(matches!(grade(quiz(), &[0, 1, 9]), Err(PortError::InvalidInput(_))));
    }
}
