use std::sync::Arc;

use storage::repository::KeyValueStore;
use tutor_core::Clock;
use tutor_core::model::{
    AssignmentId, DRAFT_KEY_PREFIX, Draft, DraftRecord, QuizSession, draft_key,
};

use crate::error::DraftError;

/// Reads and writes session drafts in the local key-value store.
///
/// Values are the camelCase JSON of [`DraftRecord`], keyed `quizState_<id>`.
#[derive(Clone)]
pub struct DraftService {
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
}

impl DraftService {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            clock: Clock::default(),
            store,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Load the draft for `assignment_id`.
    ///
    /// Unreadable, mismatched and expired drafts are deleted and reported as
    /// `None`; they never block opening the assignment.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Storage` if the store cannot be read.
    pub async fn load(&self, assignment_id: &AssignmentId) -> Result<Option<Draft>, DraftError> {
        let key = draft_key(assignment_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let draft = match decode(&raw) {
            Ok(draft) if draft.assignment_id == *assignment_id => draft,
            Ok(draft) => {
                tracing::warn!(%key, found = %draft.assignment_id, "draft belongs to another assignment");
                self.discard(&key).await;
                return Ok(None);
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "dropping unreadable draft");
                self.discard(&key).await;
                return Ok(None);
            }
        };

        if draft.is_expired(self.clock.now()) {
            tracing::info!(%key, saved_at = %draft.saved_at, "dropping expired draft");
            self.discard(&key).await;
            return Ok(None);
        }
        Ok(Some(draft))
    }

    /// Write `draft`, replacing any earlier one for the same assignment.
    ///
    /// # Errors
    ///
    /// Returns `DraftError` if the draft cannot be encoded or written.
    pub async fn save(&self, draft: &Draft) -> Result<(), DraftError> {
        let json = serde_json::to_string(&draft.to_record())?;
        self.store.put(&draft.key(), &json).await?;
        tracing::debug!(key = %draft.key(), cursor = draft.cursor, "draft saved");
        Ok(())
    }

    /// Save the session's current state if it has anything worth keeping.
    ///
    /// Returns whether a draft was written.
    ///
    /// # Errors
    ///
    /// Returns `DraftError` if the draft cannot be encoded or written.
    pub async fn checkpoint(&self, session: &QuizSession) -> Result<bool, DraftError> {
        match session.draft(self.clock.now()) {
            Some(draft) => {
                self.save(&draft).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the draft for `assignment_id`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Storage` if the store cannot be written.
    pub async fn clear(&self, assignment_id: &AssignmentId) -> Result<bool, DraftError> {
        Ok(self.store.delete(&draft_key(assignment_id)).await?)
    }

    /// Delete every stored draft that is expired or unreadable.
    ///
    /// Returns how many entries were removed.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Storage` if the store cannot be read or written.
    pub async fn purge_expired(&self) -> Result<usize, DraftError> {
        let now = self.clock.now();
        let mut removed = 0;
        for key in self.store.keys_with_prefix(DRAFT_KEY_PREFIX).await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let stale = decode(&raw).map_or(true, |draft| draft.is_expired(now));
            if stale && self.store.delete(&key).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "purged stale drafts");
        }
        Ok(removed)
    }

    async fn discard(&self, key: &str) {
        if let Err(err) = self.store.delete(key).await {
            tracing::warn!(%key, error = %err, "failed to delete draft");
        }
    }
}

fn decode(raw: &str) -> Result<Draft, DraftError> {
    let record: DraftRecord = serde_json::from_str(raw).map_err(DraftError::Malformed)?;
    Ok(Draft::from_record(record)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::InMemoryStore;
    use tutor_core::model::{AnswerSlot, DraftDecodeError, Timer};
    use tutor_core::time::{fixed_clock, fixed_now};

    fn id(raw: &str) -> AssignmentId {
        AssignmentId::new(raw).unwrap()
    }

    fn draft(raw_id: &str, saved_at: chrono::DateTime<chrono::Utc>) -> Draft {
        Draft {
            assignment_id: id(raw_id),
            answers: vec![AnswerSlot::Text("A".into()), AnswerSlot::Unset],
            cursor: 1,
            timer: Timer::Countdown { remaining_secs: 90 },
            saved_at,
        }
    }

    fn service(store: &InMemoryStore) -> DraftService {
        DraftService::new(Arc::new(store.clone())).with_clock(fixed_clock())
    }

    #[tokio::test]
    async fn save_then_load_returns_same_draft() {
        let store = InMemoryStore::new();
        let drafts = service(&store);
        let saved = draft("cw-1", fixed_now());

        drafts.save(&saved).await.unwrap();
        assert_eq!(drafts.load(&id("cw-1")).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn corrupt_draft_is_deleted_on_load() {
        let store = InMemoryStore::new();
        store.put("quizState_cw-1", "{not json").await.unwrap();

        assert_eq!(service(&store).load(&id("cw-1")).await.unwrap(), None);
        assert_eq!(store.get("quizState_cw-1").await.unwrap(), None);
    }

    #[test]
    fn decode_reports_what_is_wrong() {
        assert!(matches!(decode("{not json"), Err(DraftError::Malformed(_))));

        let mut record = serde_json::to_value(draft("cw-1", fixed_now()).to_record()).unwrap();
        record["savedAt"] = serde_json::json!(i64::MAX);
        assert!(matches!(
            decode(&record.to_string()),
            Err(DraftError::Invalid(DraftDecodeError::InvalidTimestamp(_)))
        ));
    }

    #[tokio::test]
    async fn draft_for_other_assignment_is_deleted_on_load() {
        let store = InMemoryStore::new();
        let json = serde_json::to_string(&draft("cw-2", fixed_now()).to_record()).unwrap();
        store.put("quizState_cw-1", &json).await.unwrap();

        assert_eq!(service(&store).load(&id("cw-1")).await.unwrap(), None);
        assert!(store.keys_with_prefix("quizState_").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_removes_only_stale_entries() {
        let store = InMemoryStore::new();
        let drafts = service(&store);
        drafts.save(&draft("old", fixed_now() - Duration::hours(30))).await.unwrap();
        drafts.save(&draft("fresh", fixed_now() - Duration::hours(2))).await.unwrap();
        store.put("quizState_broken", "[]").await.unwrap();
        store.put("unrelated", "{}").await.unwrap();

        assert_eq!(drafts.purge_expired().await.unwrap(), 2);
        assert_eq!(
            store.keys_with_prefix("").await.unwrap(),
            ["quizState_fresh", "unrelated"]
        );
    }

    #[tokio::test]
    async fn clear_reports_presence() {
        let store = InMemoryStore::new();
        let drafts = service(&store);
        drafts.save(&draft("cw-1", fixed_now())).await.unwrap();

        assert!(drafts.clear(&id("cw-1")).await.unwrap());
        assert!(!drafts.clear(&id("cw-1")).await.unwrap());
    }
}
