//! Randomized quiz rounds.
//!
//! A round loads every quiz, then asks them one by one in random order without
//! repeats. Each correct answer scores a point; the first wrong answer ends the
//! round, and answering every quiz wins it.

use crate::error::QuizError;
use crate::model::Quiz;
use crate::session::Session;
use colored::Color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Source of the random pool index drawn each turn.
pub trait Draw: Send {
    /// An index in `0..len`. `len` is never zero.
    fn draw(&mut self, len: usize) -> usize;
}

/// Uniform draws from a [`StdRng`].
pub struct RandomDraw(StdRng);

impl RandomDraw {
    pub fn from_os() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Reproducible draws.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Draws for the `n`th session: derived from `seed` when given, OS-seeded otherwise.
    pub fn for_session(seed: Option<u64>, n: u64) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed.wrapping_add(n)),
            None => Self::from_os(),
        }
    }
}

impl Draw for RandomDraw {
    fn draw(&mut self, len: usize) -> usize {
        self.0.random_range(0..len)
    }
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Every quiz was answered correctly.
    Won { score: usize },
    /// A wrong answer ended the round.
    Lost { score: usize },
}

impl PlayOutcome {
    pub fn score(self) -> usize {
        match self {
            PlayOutcome::Won { score } | PlayOutcome::Lost { score } => score,
        }
    }
}

/// Answers match when equal after trimming, ignoring case.
pub fn answers_match(given: &str, expected: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Quizzes not asked yet in this round, and the points scored so far.
#[derive(Debug)]
pub struct PlayState {
    pool: Vec<Quiz>,
    score: usize,
}

impl PlayState {
    pub fn new(pool: Vec<Quiz>) -> Self {
        Self { pool, score: 0 }
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    /// Remove and return a random quiz from the pool, or `None` once it is empty.
    pub fn next_quiz(&mut self, draw: &mut dyn Draw) -> Option<Quiz> {
        if self.pool.is_empty() {
            return None;
        }
        let index = draw.draw(self.pool.len()).min(self.pool.len() - 1);
        Some(self.pool.remove(index))
    }
}

/// Play one round on `session` and write the final score.
///
/// Failing to load the quizzes is returned before anything is asked.
pub async fn play_round(session: &mut Session) -> Result<PlayOutcome, QuizError> {
    let quizzes = session.store().find_all().await?;
    let mut state = PlayState::new(quizzes);
    debug!(quizzes = state.remaining(), "play round started");

    let outcome = loop {
        let Some(quiz) = state.next_quiz(session.draw()) else {
            session.log_colored("No more questions. You win!", Color::Green).await?;
            break PlayOutcome::Won {
                score: state.score,
            };
        };

        let answer = session.ask(&format!("{}: ", quiz.question)).await?;
        if answers_match(&answer, &quiz.answer) {
            state.score += 1;
            session.log_colored("Correct answer.", Color::Green).await?;
        } else {
            session.log_colored("Incorrect answer.", Color::Red).await?;
            session.log("End of the game.").await?;
            break PlayOutcome::Lost {
                score: state.score,
            };
        }
    };

    session.log(&format!("Score: {}", outcome.score())).await?;
    debug!(?outcome, "play round finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::io_adapters::{MemChannel, ScriptedPrompt, Transcript};
    use crate::model::QuizDraft;
    use crate::store::{MemoryStore, QuizStore};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Replays fixed indices, then always picks the first quiz.
    struct Scripted(VecDeque<usize>);

    impl Draw for Scripted {
        fn draw(&mut self, len: usize) -> usize {
            let index = self.0.pop_front().unwrap_or(0);
            assert!(index < len, "scripted index {index} out of 0..{len}");
            index
        }
    }

    fn arithmetic() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_quizzes(vec![
            QuizDraft::new("2+2", "4"),
            QuizDraft::new("3+3", "6"),
        ]))
    }

    fn session_with(
        store: Arc<dyn QuizStore>,
        lines: &[&str],
        draws: &[usize],
    ) -> (Session, Transcript) {
        colored::control::set_override(false);
        let (channel, transcript) = MemChannel::with_handle();
        let prompt = ScriptedPrompt::new(lines, transcript.clone());
        let session = Session::new(channel, prompt, store)
            .with_draw(Scripted(draws.iter().copied().collect()));
        (session, transcript)
    }

    fn asked(transcript: &Transcript) -> Vec<String> {
        transcript
            .contents()
            .lines()
            .filter_map(|l| l.split(": ").next().filter(|q| q.contains('+')))
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_all_correct_wins_with_full_score() {
        let (mut session, transcript) = session_with(arithmetic(), &["4", "6"], &[0, 0]);
        let outcome = play_round(&mut session).await.unwrap();

        assert_eq!(outcome, PlayOutcome::Won { score: 2 });
        let out = transcript.contents();
        assert_eq!(out.matches("Correct answer.").count(), 2);
        assert!(out.contains("No more questions. You win!"));
        assert!(out.ends_with("Score: 2\n"));
    }

    #[tokio::test]
    async fn test_draw_order_is_respected() {
        let (mut session, transcript) = session_with(arithmetic(), &["6", "4"], &[1, 0]);
        let outcome = play_round(&mut session).await.unwrap();

        assert_eq!(outcome, PlayOutcome::Won { score: 2 });
        assert_eq!(asked(&transcript), vec!["3+3", "2+2"]);
    }

    #[tokio::test]
    async fn test_wrong_second_answer_loses_with_one_point() {
        let (mut session, transcript) = session_with(arithmetic(), &["4", "7"], &[0, 0]);
        let outcome = play_round(&mut session).await.unwrap();

        assert_eq!(outcome, PlayOutcome::Lost { score: 1 });
        let out = transcript.contents();
        assert_eq!(out.matches("Correct answer.").count(), 1);
        assert!(out.contains("Incorrect answer.\nEnd of the game.\nScore: 1\n"));
        assert!(!out.contains("You win"));
    }

    #[tokio::test]
    async fn test_wrong_answer_on_question_k_scores_k_minus_one() {
        let drafts: Vec<QuizDraft> = (1..=5)
            .map(|n| QuizDraft::new(format!("{n}+0"), n.to_string()))
            .collect();
        for k in 1..=5usize {
            let store = Arc::new(MemoryStore::with_quizzes(drafts.clone()));
            // Always draw index 0, so question i asks "i+0".
            let mut lines: Vec<String> = (1..k).map(|n| n.to_string()).collect();
            lines.push("wrong".to_string());
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let (mut session, _) = session_with(store, &refs, &[]);

            let outcome = play_round(&mut session).await.unwrap();
            assert_eq!(outcome, PlayOutcome::Lost { score: k - 1 });
        }
    }

    #[tokio::test]
    async fn test_every_quiz_asked_exactly_once_with_random_draws() {
        let drafts: Vec<QuizDraft> = (1..=6)
            .map(|n| QuizDraft::new(format!("{n}+{n}"), (2 * n).to_string()))
            .collect();
        let store = Arc::new(MemoryStore::with_quizzes(drafts));

        colored::control::set_override(false);
        let (channel, transcript) = MemChannel::with_handle();
        // Same seed as the session, so the probe predicts the order of questions.
        let mut order = RandomDraw::seeded(7);
        let mut probe = PlayState::new(store.find_all().await.unwrap());
        let mut lines = Vec::new();
        while let Some(quiz) = probe.next_quiz(&mut order) {
            lines.push(quiz.answer);
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let prompt = ScriptedPrompt::new(&refs, transcript.clone());
        let mut session = Session::new(channel, prompt, store).with_draw(RandomDraw::seeded(7));

        let outcome = play_round(&mut session).await.unwrap();
        assert_eq!(outcome, PlayOutcome::Won { score: 6 });

        let mut questions = asked(&transcript);
        assert_eq!(questions.len(), 6);
        questions.sort();
        questions.dedup();
        assert_eq!(questions.len(), 6);
    }

    #[tokio::test]
    async fn test_empty_store_wins_immediately() {
        let store = Arc::new(MemoryStore::new());
        let (mut session, transcript) = session_with(store, &[], &[]);
        let outcome = play_round(&mut session).await.unwrap();
        assert_eq!(outcome, PlayOutcome::Won { score: 0 });
        assert_eq!(transcript.contents(), "No more questions. You win!\nScore: 0\n");
    }

    #[tokio::test]
    async fn test_input_closed_mid_round_is_reported_as_closed() {
        let (mut session, transcript) = session_with(arithmetic(), &["4"], &[]);
        let err = play_round(&mut session).await.unwrap_err();
        assert!(matches!(err, QuizError::Closed));
        assert!(!transcript.contents().contains("Score"));
    }

    struct Unavailable;

    #[async_trait]
    impl QuizStore for Unavailable {
        async fn find_all(&self) -> Result<Vec<Quiz>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn find_by_id(&self, _id: i64) -> Result<Option<Quiz>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn create(&self, _draft: QuizDraft) -> Result<Quiz, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn destroy(&self, _id: i64) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn save(&self, _quiz: &Quiz) -> Result<Quiz, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_load_failure_asks_nothing() {
        let (mut session, transcript) = session_with(Arc::new(Unavailable), &["4"], &[]);
        let err = play_round(&mut session).await.unwrap_err();
        assert!(matches!(err, QuizError::StoreUnavailable(_)));
        assert_eq!(transcript.contents(), "");
    }

    #[test]
    fn test_answers_match_ignores_case_and_whitespace() {
        assert!(answers_match(" Paris ", "paris"));
        assert!(answers_match("ROME", " rome"));
        assert!(!answers_match("Pariss", "paris"));
        assert!(!answers_match("", "paris"));
    }

    #[test]
    fn test_seeded_draws_stay_in_range() {
        let mut draw = RandomDraw::seeded(1);
        for len in 1..50 {
            assert!(draw.draw(len) < len);
        }
    }
}
