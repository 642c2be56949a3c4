use crate::error::StoreError;
use crate::model::{Quiz, QuizDraft};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Persistence collaborator consumed by the session engine.
///
/// Implementations serialize access internally; sessions call it concurrently
/// through an `Arc<dyn QuizStore>`.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// All quizzes in store order.
    async fn find_all(&self) -> Result<Vec<Quiz>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Quiz>, StoreError>;

    /// Validate and insert a new quiz, assigning its id.
    async fn create(&self, draft: QuizDraft) -> Result<Quiz, StoreError>;

    /// Remove the quiz with `id`. Returns the number of quizzes removed (0 or 1).
    async fn destroy(&self, id: i64) -> Result<usize, StoreError>;

    /// Validate and overwrite an already stored quiz.
    async fn save(&self, quiz: &Quiz) -> Result<Quiz, StoreError>;
}

/// Quizzes a fresh store starts with.
pub fn default_quizzes() -> Vec<QuizDraft> {
    vec![
        QuizDraft::new("Capital of Italy", "Rome"),
        QuizDraft::new("Capital of France", "Paris"),
        QuizDraft::new("Capital of Spain", "Madrid"),
        QuizDraft::new("Capital of Portugal", "Lisbon"),
    ]
}

#[derive(Debug, Clone, Default)]
struct Table {
    quizzes: BTreeMap<i64, Quiz>,
    next_id: i64,
}

impl Table {
    fn from_quizzes(quizzes: impl IntoIterator<Item = Quiz>) -> Self {
        let quizzes: BTreeMap<i64, Quiz> = quizzes.into_iter().map(|q| (q.id, q)).collect();
        let next_id = quizzes.keys().next_back().map_or(1, |id| id + 1);
        Self { quizzes, next_id }
    }

    fn insert(&mut self, draft: QuizDraft) -> Quiz {
        let quiz = draft.with_id(self.next_id.max(1));
        self.next_id = quiz.id + 1;
        self.quizzes.insert(quiz.id, quiz.clone());
        quiz
    }
}

/// Quiz store kept in memory, optionally mirrored to a JSON file.
///
/// Every mutation is written to the file before it becomes visible, so a failed
/// write leaves the store unchanged.
pub struct MemoryStore {
    table: Mutex<Table>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Empty in-memory store.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table::default()),
            path: None,
        }
    }

    /// In-memory store holding `drafts`, with ids assigned from 1.
    pub fn with_quizzes(drafts: impl IntoIterator<Item = QuizDraft>) -> Self {
        let mut table = Table::default();
        for draft in drafts {
            table.insert(draft);
        }
        Self {
            table: Mutex::new(table),
            path: None,
        }
    }

    /// Load the store from `path`, creating it with [`default_quizzes`] when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let quizzes: Vec<Quiz> = serde_json::from_slice(&bytes)?;
                info!(path = %path.display(), count = quizzes.len(), "loaded quiz store");
                Table::from_quizzes(quizzes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut table = Table::default();
                for draft in default_quizzes() {
                    table.insert(draft);
                }
                write_table(&path, &table).await?;
                info!(path = %path.display(), "created quiz store with default quizzes");
                table
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            table: Mutex::new(table),
            path: Some(path),
        })
    }

    async fn persist(&self, table: &Table) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => write_table(path, table).await,
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_quizzes(default_quizzes())
    }
}

async fn write_table(path: &Path, table: &Table) -> Result<(), StoreError> {
    let quizzes: Vec<&Quiz> = table.quizzes.values().collect();
    let bytes = serde_json::to_vec_pretty(&quizzes)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Quiz>, StoreError> {
        Ok(self.table.lock().await.quizzes.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Quiz>, StoreError> {
        Ok(self.table.lock().await.quizzes.get(&id).cloned())
    }

    async fn create(&self, draft: QuizDraft) -> Result<Quiz, StoreError> {
        let problems = draft.problems();
        if !problems.is_empty() {
            return Err(StoreError::Validation(problems));
        }
        let mut table = self.table.lock().await;
        let mut next = table.clone();
        let quiz = next.insert(draft);
        self.persist(&next).await?;
        *table = next;
        debug!(id = quiz.id, "created quiz");
        Ok(quiz)
    }

    async fn destroy(&self, id: i64) -> Result<usize, StoreError> {
        let mut table = self.table.lock().await;
        if !table.quizzes.contains_key(&id) {
            return Ok(0);
        }
        let mut next = table.clone();
        next.quizzes.remove(&id);
        self.persist(&next).await?;
        *table = next;
        debug!(id, "destroyed quiz");
        Ok(1)
    }

    async fn save(&self, quiz: &Quiz) -> Result<Quiz, StoreError> {
        let problems = QuizDraft::from(quiz).problems();
        if !problems.is_empty() {
            return Err(StoreError::Validation(problems));
        }
        let mut table = self.table.lock().await;
        if !table.quizzes.contains_key(&quiz.id) {
            return Err(StoreError::NotFound(quiz.id));
        }
        let mut next = table.clone();
        next.quizzes.insert(quiz.id, quiz.clone());
        self.persist(&next).await?;
        *table = next;
        debug!(id = quiz.id, "saved quiz");
        Ok(quiz.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.create(QuizDraft::new("q1", "a1")).await.unwrap();
        let b = store.create(QuizDraft::new("q2", "a2")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.find_all().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_fields() {
        let store = MemoryStore::new();
        let err = store.create(QuizDraft::new("", "x")).await.unwrap_err();
        let StoreError::Validation(problems) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(problems, vec!["Question must not be empty.".to_string()]);
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let store = MemoryStore::with_quizzes(vec![QuizDraft::new("q", "a")]);
        assert_eq!(store.destroy(1).await.unwrap(), 1);
        assert_eq!(store.destroy(1).await.unwrap(), 0);
        assert_eq!(store.find_by_id(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_destroy() {
        let store = MemoryStore::with_quizzes(vec![
            QuizDraft::new("q1", "a1"),
            QuizDraft::new("q2", "a2"),
        ]);
        store.destroy(2).await.unwrap();
        let quiz = store.create(QuizDraft::new("q3", "a3")).await.unwrap();
        assert_eq!(quiz.id, 3);
    }

    #[tokio::test]
    async fn test_save_updates_existing_only() {
        let store = MemoryStore::with_quizzes(vec![QuizDraft::new("q", "a")]);
        let mut quiz = store.find_by_id(1).await.unwrap().unwrap();
        quiz.answer = "b".into();
        store.save(&quiz).await.unwrap();
        assert_eq!(store.find_by_id(1).await.unwrap().unwrap().answer, "b");

        quiz.id = 9;
        assert!(matches!(store.save(&quiz).await, Err(StoreError::NotFound(9))));
    }

    #[tokio::test]
    async fn test_file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizzes.json");

        let store = MemoryStore::open(&path).await.unwrap();
        assert_eq!(store.find_all().await.unwrap().len(), default_quizzes().len());
        let added = store.create(QuizDraft::new("2+2", "4")).await.unwrap();
        store.destroy(1).await.unwrap();
        drop(store);

        let reopened = MemoryStore::open(&path).await.unwrap();
        let all = reopened.find_all().await.unwrap();
        assert_eq!(all.len(), default_quizzes().len());
        assert_eq!(all.last(), Some(&added));
        assert_eq!(reopened.find_by_id(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizzes.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(MemoryStore::open(&path).await, Err(StoreError::Format(_))));
    }
}
