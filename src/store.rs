use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tokio::fs;

use crate::error::RosterError;

/// The four reaction buttons on a roster posting.
///
/// The first three form the exclusive group: a responder holds at most one of
/// them at a time. `Dispatcher` is an independent toggle restricted to the
/// Disponent role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Attending,
    AttendingLater,
    Absent,
    Dispatcher,
}

impl Status {
    pub const EXCLUSIVE: [Status; 3] = [Status::Attending, Status::AttendingLater, Status::Absent];
    pub const ALL: [Status; 4] = [
        Status::Attending,
        Status::AttendingLater,
        Status::Absent,
        Status::Dispatcher,
    ];

    pub fn is_exclusive(&self) -> bool {
        !matches!(self, Status::Dispatcher)
    }

    /// Stable component custom id for the button wired to this status.
    pub fn custom_id(&self) -> &'static str {
        match self {
            Status::Attending => "vagt_deltager",
            Status::AttendingLater => "vagt_senere",
            Status::Absent => "vagt_fravaer",
            Status::Dispatcher => "vagt_disp",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|s| s.custom_id() == id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Attending => "Deltager",
            Status::AttendingLater => "Deltager senere",
            Status::Absent => "Fraværende",
            Status::Dispatcher => "Disponering",
        }
    }
}

/// One day's roster announcement and its accumulated responses.
///
/// The status lists hold stable user ids in insertion order; membership is
/// unique per list. Postings are never removed from the store, they simply
/// stop being "current" at the next local midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub id: String,
    pub guild_id: String,
    pub created_at: DateTime<Utc>,
    pub start_time: String,
    pub note: Option<String>,
    pub attending: Vec<String>,
    pub attending_later: Vec<String>,
    pub absent: Vec<String>,
    pub dispatcher: Vec<String>,
    pub reminder_sent: bool,
}

impl Posting {
    fn new(
        id: String,
        guild_id: String,
        created_at: DateTime<Utc>,
        start_time: String,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            guild_id,
            created_at,
            start_time,
            note,
            attending: Vec::new(),
            attending_later: Vec::new(),
            absent: Vec::new(),
            dispatcher: Vec::new(),
            reminder_sent: false,
        }
    }

    /// An unsaved posting, used to render the embed before the message send
    /// has assigned an id.
    pub fn draft(
        guild_id: &str,
        created_at: DateTime<Utc>,
        start_time: &str,
        note: Option<String>,
    ) -> Self {
        Self::new(
            String::new(),
            guild_id.to_string(),
            created_at,
            start_time.to_string(),
            note,
        )
    }

    pub fn list(&self, status: Status) -> &Vec<String> {
        match status {
            Status::Attending => &self.attending,
            Status::AttendingLater => &self.attending_later,
            Status::Absent => &self.absent,
            Status::Dispatcher => &self.dispatcher,
        }
    }

    pub fn list_mut(&mut self, status: Status) -> &mut Vec<String> {
        match status {
            Status::Attending => &mut self.attending,
            Status::AttendingLater => &mut self.attending_later,
            Status::Absent => &mut self.absent,
            Status::Dispatcher => &mut self.dispatcher,
        }
    }

    /// Union of all four status lists.
    pub fn responded(&self) -> BTreeSet<String> {
        Status::ALL
            .iter()
            .flat_map(|s| self.list(*s).iter().cloned())
            .collect()
    }
}

/// Per-guild on/off switch. The disabled triple is all-or-nothing: either all
/// three fields are set (system disabled) or all three are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemState {
    pub enabled: bool,
    pub disabled_since: Option<DateTime<Utc>>,
    pub disabled_by: Option<String>,
    pub disabled_note: Option<String>,
    pub active_status_message_id: Option<String>,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_since: None,
            disabled_by: None,
            disabled_note: None,
            active_status_message_id: None,
        }
    }
}

/// Pointer to the standing roster message for a guild. Only valid for the
/// local date it was created on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentPosting {
    pub posting_id: String,
    pub channel_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    /// guild_id -> SystemState
    system: HashMap<String, SystemState>,
    /// guild_id -> posting_id -> Posting
    postings: HashMap<String, HashMap<String, Posting>>,
    /// guild_id -> current posting pointer
    current: HashMap<String, CurrentPosting>,
    /// guild_id -> posting_id -> admin DM message id
    admin_dm: HashMap<String, HashMap<String, String>>,
}

/// Canonical source of truth for postings and system state, backed by a flat
/// JSON file. Every mutating method flushes to disk before returning, so a
/// read after a completed write always observes the write.
#[derive(Debug)]
pub struct RosterStore {
    path: PathBuf,
    data: StoreData,
}

impl RosterStore {
    pub async fn load(path: PathBuf) -> Result<Self> {
        let data = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("corrupt state file {}", path.display()))?,
            // Missing file means first run
            Err(_) => StoreData::default(),
        };
        Ok(Self { path, data })
    }

    pub async fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, content)
            .await
            .with_context(|| format!("failed to write state file {}", self.path.display()))?;
        Ok(())
    }

    pub async fn create_posting(
        &mut self,
        guild_id: &str,
        id: &str,
        created_at: DateTime<Utc>,
        start_time: &str,
        note: Option<String>,
    ) -> Result<Posting, RosterError> {
        let guild = self.data.postings.entry(guild_id.to_string()).or_default();
        if guild.contains_key(id) {
            return Err(RosterError::DuplicateId(id.to_string()));
        }
        let posting = Posting::new(
            id.to_string(),
            guild_id.to_string(),
            created_at,
            start_time.to_string(),
            note,
        );
        guild.insert(id.to_string(), posting.clone());
        self.save().await?;
        Ok(posting)
    }

    pub fn get_posting(&self, guild_id: &str, id: &str) -> Result<&Posting, RosterError> {
        self.data
            .postings
            .get(guild_id)
            .and_then(|g| g.get(id))
            .ok_or_else(|| RosterError::NotFound(id.to_string()))
    }

    pub fn posting_mut(&mut self, guild_id: &str, id: &str) -> Result<&mut Posting, RosterError> {
        self.data
            .postings
            .get_mut(guild_id)
            .and_then(|g| g.get_mut(id))
            .ok_or_else(|| RosterError::NotFound(id.to_string()))
    }

    pub fn system(&self, guild_id: &str) -> SystemState {
        self.data.system.get(guild_id).cloned().unwrap_or_default()
    }

    pub fn system_mut(&mut self, guild_id: &str) -> &mut SystemState {
        self.data.system.entry(guild_id.to_string()).or_default()
    }

    /// Flip the enable switch. Idempotent: setting the current value is a
    /// successful no-op. The disabled triple is set and cleared as a unit.
    pub async fn set_enabled(
        &mut self,
        guild_id: &str,
        enabled: bool,
        by: Option<String>,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), RosterError> {
        let state = self.system_mut(guild_id);
        if state.enabled != enabled {
            state.enabled = enabled;
            if enabled {
                state.disabled_since = None;
                state.disabled_by = None;
                state.disabled_note = None;
            } else {
                state.disabled_since = Some(at);
                state.disabled_by = by;
                state.disabled_note = note;
            }
        }
        self.save().await?;
        Ok(())
    }

    pub async fn set_status_message(
        &mut self,
        guild_id: &str,
        message_id: Option<String>,
    ) -> Result<(), RosterError> {
        self.system_mut(guild_id).active_status_message_id = message_id;
        self.save().await?;
        Ok(())
    }

    pub async fn set_current(
        &mut self,
        guild_id: &str,
        current: CurrentPosting,
    ) -> Result<(), RosterError> {
        self.data.current.insert(guild_id.to_string(), current);
        self.save().await?;
        Ok(())
    }

    /// The standing posting for a guild, or None if the pointer is stale
    /// (dated before `today`) or was never set.
    pub fn current_posting(&self, guild_id: &str, today: NaiveDate) -> Option<&CurrentPosting> {
        self.data
            .current
            .get(guild_id)
            .filter(|cur| cur.date == today)
    }

    pub fn admin_dm_id(&self, guild_id: &str, posting_id: &str) -> Option<String> {
        self.data
            .admin_dm
            .get(guild_id)
            .and_then(|g| g.get(posting_id))
            .cloned()
    }

    pub async fn set_admin_dm_id(
        &mut self,
        guild_id: &str,
        posting_id: &str,
        dm_message_id: &str,
    ) -> Result<(), RosterError> {
        self.data
            .admin_dm
            .entry(guild_id.to_string())
            .or_default()
            .insert(posting_id.to_string(), dm_message_id.to_string());
        self.save().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    pub(crate) fn temp_state_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "planday-test-{}-{}.json",
            std::process::id(),
            n
        ))
    }

    pub(crate) async fn fresh_store() -> RosterStore {
        RosterStore::load(temp_state_path()).await.unwrap()
    }

    #[tokio::test]
    async fn create_posting_rejects_duplicate_id() {
        let mut store = fresh_store().await;
        store
            .create_posting("g1", "m1", Utc::now(), "19:30", None)
            .await
            .unwrap();
        let err = store
            .create_posting("g1", "m1", Utc::now(), "19:30", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateId(id) if id == "m1"));

        // same id in another guild is fine
        store
            .create_posting("g2", "m1", Utc::now(), "19:30", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn writes_survive_reload() {
        let path = temp_state_path();
        {
            let mut store = RosterStore::load(path.clone()).await.unwrap();
            store
                .create_posting("g1", "m1", Utc::now(), "19:30", Some("note".into()))
                .await
                .unwrap();
            store.posting_mut("g1", "m1").unwrap().attending.push("u1".into());
            store.save().await.unwrap();
        }
        let store = RosterStore::load(path).await.unwrap();
        let posting = store.get_posting("g1", "m1").unwrap();
        assert_eq!(posting.attending, vec!["u1".to_string()]);
        assert_eq!(posting.note.as_deref(), Some("note"));
        assert!(!posting.reminder_sent);
    }

    #[tokio::test]
    async fn disabled_triple_is_all_or_nothing() {
        let mut store = fresh_store().await;
        let at = Utc::now();
        store
            .set_enabled("g1", false, Some("u9".into()), Some("service".into()), at)
            .await
            .unwrap();
        let state = store.system("g1");
        assert!(!state.enabled);
        assert_eq!(state.disabled_since, Some(at));
        assert_eq!(state.disabled_by.as_deref(), Some("u9"));
        assert_eq!(state.disabled_note.as_deref(), Some("service"));

        store.set_enabled("g1", true, None, None, Utc::now()).await.unwrap();
        let state = store.system("g1");
        assert!(state.enabled);
        assert!(state.disabled_since.is_none());
        assert!(state.disabled_by.is_none());
        assert!(state.disabled_note.is_none());
    }

    #[tokio::test]
    async fn set_enabled_is_idempotent_at_store_level() {
        let mut store = fresh_store().await;
        let first = Utc::now();
        store
            .set_enabled("g1", false, Some("u1".into()), None, first)
            .await
            .unwrap();
        // repeat with a different actor: no-op, original triple untouched
        store
            .set_enabled("g1", false, Some("u2".into()), None, Utc::now())
            .await
            .unwrap();
        let state = store.system("g1");
        assert_eq!(state.disabled_since, Some(first));
        assert_eq!(state.disabled_by.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn current_posting_expires_with_the_date() {
        let mut store = fresh_store().await;
        let today = Utc::now().date_naive();
        store
            .set_current(
                "g1",
                CurrentPosting {
                    posting_id: "m1".into(),
                    channel_id: "c1".into(),
                    date: today,
                },
            )
            .await
            .unwrap();
        assert!(store.current_posting("g1", today).is_some());
        let tomorrow = today.succ_opt().unwrap();
        assert!(store.current_posting("g1", tomorrow).is_none());
    }
}
