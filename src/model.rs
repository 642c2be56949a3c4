use serde::{Deserialize, Serialize};

/// A single question/answer pair held by the quiz store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    /// Store-assigned key, stable once assigned.
    pub id: i64,
    pub question: String,
    pub answer: String,
}

/// Fields of a quiz that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    pub question: String,
    pub answer: String,
}

impl QuizDraft {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Per-field validation messages; empty when the draft is acceptable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.question.trim().is_empty() {
            problems.push("Question must not be empty.".to_string());
        }
        if self.answer.trim().is_empty() {
            problems.push("Answer must not be empty.".to_string());
        }
        problems
    }

    pub(crate) fn with_id(self, id: i64) -> Quiz {
        Quiz {
            id,
            question: self.question,
            answer: self.answer,
        }
    }
}

impl From<&Quiz> for QuizDraft {
    fn from(quiz: &Quiz) -> Self {
        Self::new(quiz.question.clone(), quiz.answer.clone())
    }
}
