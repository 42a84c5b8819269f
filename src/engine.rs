use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::bot::SharedStore;
use crate::error::RosterError;
use crate::store::{Posting, Status};

/// Applies status-change requests under the mutual-exclusion rule and
/// computes the derived views. Owns no state of its own; everything lives in
/// the shared store.
pub struct RosterEngine {
    data: SharedStore,
}

impl RosterEngine {
    pub fn new(data: SharedStore) -> Self {
        Self { data }
    }

    pub async fn create_posting(
        &self,
        guild_id: &str,
        id: &str,
        created_at: DateTime<Utc>,
        start_time: &str,
        note: Option<String>,
    ) -> Result<Posting, RosterError> {
        let mut store = self.data.write().await;
        let posting = store
            .create_posting(guild_id, id, created_at, start_time, note)
            .await?;
        info!("Created roster posting {} for guild {}", id, guild_id);
        Ok(posting)
    }

    /// Record that `responder` chose `status` on a posting.
    ///
    /// The three exclusive statuses displace each other: choosing one removes
    /// the responder from the other two in the same mutation. Dispatcher is a
    /// toggle and leaves the exclusive group alone. Returns the refreshed
    /// posting for re-render; the admin-mirror refresh is the caller's
    /// fire-and-forget job.
    pub async fn apply_status(
        &self,
        guild_id: &str,
        posting_id: &str,
        responder: &str,
        status: Status,
        privileged: bool,
    ) -> Result<Posting, RosterError> {
        if status == Status::Dispatcher && !privileged {
            debug!(
                "User {} tried the dispatcher button on {} without the role",
                responder, posting_id
            );
            return Err(RosterError::Forbidden);
        }

        let mut store = self.data.write().await;
        let posting = store.posting_mut(guild_id, posting_id)?;

        if status.is_exclusive() {
            for other in Status::EXCLUSIVE {
                if other != status {
                    posting.list_mut(other).retain(|r| r != responder);
                }
            }
            let list = posting.list_mut(status);
            if !list.iter().any(|r| r == responder) {
                list.push(responder.to_string());
            }
        } else {
            let list = posting.list_mut(Status::Dispatcher);
            if let Some(pos) = list.iter().position(|r| r == responder) {
                list.remove(pos);
            } else {
                list.push(responder.to_string());
            }
        }

        let updated = posting.clone();
        store.save().await.map_err(RosterError::Persistence)?;
        info!(
            "User {} marked {} on posting {} in guild {}",
            responder,
            status.label(),
            posting_id,
            guild_id
        );
        Ok(updated)
    }

    /// Flip the guild-wide switch. Returns the elapsed downtime when
    /// re-enabling, reported exactly once; the disabled triple is cleared in
    /// the same mutation.
    pub async fn set_system_enabled(
        &self,
        guild_id: &str,
        enabled: bool,
        by: &str,
        note: Option<String>,
    ) -> Result<Option<Duration>, RosterError> {
        let now = Utc::now();
        let mut store = self.data.write().await;
        let state = store.system(guild_id);
        if state.enabled == enabled {
            return Err(RosterError::AlreadyInState);
        }

        let downtime = state.disabled_since.map(|since| now - since);
        store
            .set_enabled(guild_id, enabled, Some(by.to_string()), note, now)
            .await?;
        info!(
            "Guild {} {} by {}",
            guild_id,
            if enabled { "enabled" } else { "disabled" },
            by
        );
        Ok(if enabled { downtime } else { None })
    }
}

/// Required responders that appear in none of the four status lists.
/// A dispatcher-only responder counts as having responded.
pub fn compute_missing(posting: &Posting, required: &BTreeSet<String>) -> BTreeSet<String> {
    let responded = posting.responded();
    required.difference(&responded).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::fresh_store;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    async fn engine_with_posting() -> (RosterEngine, SharedStore) {
        let store = fresh_store().await;
        let shared: SharedStore = Arc::new(RwLock::new(store));
        let engine = RosterEngine::new(shared.clone());
        engine
            .create_posting("g1", "m1", Utc::now(), "19:30", None)
            .await
            .unwrap();
        (engine, shared)
    }

    fn exclusive_memberships(posting: &Posting, responder: &str) -> usize {
        Status::EXCLUSIVE
            .iter()
            .filter(|s| posting.list(**s).iter().any(|r| r == responder))
            .count()
    }

    #[tokio::test]
    async fn exclusive_statuses_displace_each_other() {
        let (engine, _) = engine_with_posting().await;
        let sequence = [
            Status::Attending,
            Status::AttendingLater,
            Status::Absent,
            Status::Attending,
        ];
        for status in sequence {
            let posting = engine
                .apply_status("g1", "m1", "u1", status, false)
                .await
                .unwrap();
            assert_eq!(exclusive_memberships(&posting, "u1"), 1);
            assert!(posting.list(status).iter().any(|r| r == "u1"));
        }
    }

    #[tokio::test]
    async fn reselecting_same_status_is_idempotent() {
        let (engine, _) = engine_with_posting().await;
        let first = engine
            .apply_status("g1", "m1", "u1", Status::Attending, false)
            .await
            .unwrap();
        let second = engine
            .apply_status("g1", "m1", "u1", Status::Attending, false)
            .await
            .unwrap();
        assert_eq!(first.attending, second.attending);
        assert_eq!(second.attending, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn dispatcher_toggle_is_independent_of_exclusive_group() {
        let (engine, _) = engine_with_posting().await;
        engine
            .apply_status("g1", "m1", "u1", Status::Attending, false)
            .await
            .unwrap();
        let posting = engine
            .apply_status("g1", "m1", "u1", Status::Dispatcher, true)
            .await
            .unwrap();
        assert!(posting.attending.iter().any(|r| r == "u1"));
        assert!(posting.dispatcher.iter().any(|r| r == "u1"));

        // switching exclusive status keeps dispatcher membership
        let posting = engine
            .apply_status("g1", "m1", "u1", Status::Absent, false)
            .await
            .unwrap();
        assert!(posting.dispatcher.iter().any(|r| r == "u1"));
        assert!(posting.attending.is_empty());
    }

    #[tokio::test]
    async fn dispatcher_double_toggle_restores_original_state() {
        let (engine, _) = engine_with_posting().await;
        engine
            .apply_status("g1", "m1", "u1", Status::Dispatcher, true)
            .await
            .unwrap();
        let posting = engine
            .apply_status("g1", "m1", "u1", Status::Dispatcher, true)
            .await
            .unwrap();
        assert!(posting.dispatcher.is_empty());
    }

    #[tokio::test]
    async fn dispatcher_without_role_is_forbidden_and_changes_nothing() {
        let (engine, shared) = engine_with_posting().await;
        let err = engine
            .apply_status("g1", "m1", "u1", Status::Dispatcher, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::Forbidden));
        let store = shared.read().await;
        let posting = store.get_posting("g1", "m1").unwrap();
        for status in Status::ALL {
            assert!(posting.list(status).is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_posting_is_not_found() {
        let (engine, _) = engine_with_posting().await;
        let err = engine
            .apply_status("g1", "nope", "u1", Status::Attending, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_set_is_required_minus_all_responses() {
        let (engine, shared) = engine_with_posting().await;
        engine
            .apply_status("g1", "m1", "a", Status::Attending, false)
            .await
            .unwrap();
        engine
            .apply_status("g1", "m1", "b", Status::Absent, false)
            .await
            .unwrap();
        // dispatcher-only counts as responded
        engine
            .apply_status("g1", "m1", "d", Status::Dispatcher, true)
            .await
            .unwrap();

        let required: BTreeSet<String> =
            ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let store = shared.read().await;
        let posting = store.get_posting("g1", "m1").unwrap();
        let missing = compute_missing(posting, &required);
        assert_eq!(missing, BTreeSet::from(["c".to_string()]));
    }

    #[tokio::test]
    async fn enable_disable_round_trip_reports_downtime_once() {
        let (engine, shared) = engine_with_posting().await;
        let down = engine
            .set_system_enabled("g1", false, "u1", Some("maintenance".into()))
            .await
            .unwrap();
        assert!(down.is_none());

        let downtime = engine
            .set_system_enabled("g1", true, "u2", None)
            .await
            .unwrap()
            .expect("re-enable reports downtime");
        assert!(downtime >= Duration::zero());

        let store = shared.read().await;
        let state = store.system("g1");
        assert!(state.enabled);
        assert!(state.disabled_since.is_none());
        assert!(state.disabled_by.is_none());
        assert!(state.disabled_note.is_none());
    }

    #[tokio::test]
    async fn toggling_to_the_current_state_is_rejected() {
        let (engine, _) = engine_with_posting().await;
        let err = engine
            .set_system_enabled("g1", true, "u1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::AlreadyInState));
    }
}
