use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::bot::SharedStore;
use crate::engine::compute_missing;
use crate::error::RosterError;
use std::collections::BTreeSet;

/// Best-effort private-notification sender. Implementations must not treat an
/// unreachable recipient as an error; they report per-attempt success.
#[serenity::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, responder: &str, text: &str) -> bool;
}

/// What a sweep did, so the caller can refresh the admin mirror once.
#[derive(Debug)]
pub struct SweepOutcome {
    pub posting_id: String,
    pub notified: Vec<String>,
    pub failed: Vec<String>,
}

/// Once per posting, DMs the members who have not responded.
///
/// Per-posting state machine is `Posting::reminder_sent`: pending until the
/// posting's age reaches the threshold, then `sent`, irreversibly. The
/// guarantee is "attempted once", not "delivered": the transition happens
/// whether or not any DM went through.
pub struct ReminderSweeper {
    data: SharedStore,
    threshold: Duration,
    timezone: Tz,
}

impl ReminderSweeper {
    pub fn new(data: SharedStore, threshold_minutes: i64, timezone: Tz) -> Self {
        Self {
            data,
            threshold: Duration::minutes(threshold_minutes),
            timezone,
        }
    }

    /// One sweep over a single guild. Returns `None` when there was nothing
    /// to do (disabled system, no posting for today, already sent, or still
    /// under the age threshold).
    pub async fn sweep_guild(
        &self,
        guild_id: &str,
        required: &BTreeSet<String>,
        now: DateTime<Utc>,
        text: &str,
        notifier: &dyn Notifier,
    ) -> Result<Option<SweepOutcome>, RosterError> {
        let today = now.with_timezone(&self.timezone).date_naive();

        let (posting_id, missing) = {
            let store = self.data.read().await;
            if !store.system(guild_id).enabled {
                debug!("Sweep skipped: guild {} disabled", guild_id);
                return Ok(None);
            }
            let current = match store.current_posting(guild_id, today) {
                Some(cur) => cur.clone(),
                None => return Ok(None),
            };
            let posting = store.get_posting(guild_id, &current.posting_id)?;
            if posting.reminder_sent {
                return Ok(None);
            }
            if now - posting.created_at < self.threshold {
                return Ok(None);
            }
            (current.posting_id, compute_missing(posting, required))
        };

        let mut notified = Vec::new();
        let mut failed = Vec::new();
        for responder in &missing {
            if notifier.send(responder, text).await {
                notified.push(responder.clone());
            } else {
                // Recipient unreachable is expected (closed DMs); isolated
                // per recipient, never aborts the sweep.
                warn!(
                    "Could not DM reminder to {} for posting {}",
                    responder, posting_id
                );
                failed.push(responder.clone());
            }
        }

        // Sent means attempted, even with an empty missing set or failures.
        {
            let mut store = self.data.write().await;
            store.posting_mut(guild_id, &posting_id)?.reminder_sent = true;
            store.save().await.map_err(RosterError::Persistence)?;
        }

        info!(
            "Reminder sweep for posting {} in guild {}: {} notified, {} unreachable",
            posting_id,
            guild_id,
            notified.len(),
            failed.len()
        );
        Ok(Some(SweepOutcome {
            posting_id,
            notified,
            failed,
        }))
    }
}
