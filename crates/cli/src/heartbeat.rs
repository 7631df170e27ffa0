//! Heartbeat timer and the park loop that waits out sleep periods.

use automaton_config::HeartbeatConfig;
use automaton_core::store::{AutomatonDatabase, keys};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Park length when no `sleep_until` is recorded.
pub const DEFAULT_SLEEP: Duration = Duration::from_secs(60);
pub const MIN_SLEEP: Duration = Duration::from_secs(10);
/// How often a parked agent looks for a wake request.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(30);
/// Pause between checks while the agent is dead.
pub const DEAD_RECHECK: Duration = Duration::from_secs(300);

/// Why a park ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeReason {
    Elapsed,
    Heartbeat(String),
    Requested(String),
}

/// Spawn the heartbeat task.
///
/// Each tick checks for work that warrants waking a parked agent and sends
/// one signal when it finds some. Quiet ticks send nothing, so the agent's
/// own sleep length stands. Does nothing when disabled.
pub fn spawn_heartbeat(
    config: HeartbeatConfig,
    db: Arc<dyn AutomatonDatabase>,
    tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            debug!("Heartbeat disabled");
            return;
        }

        let period = Duration::from_secs(config.interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;
        info!(interval_secs = period.as_secs(), "Heartbeat started");

        loop {
            interval.tick().await;
            let Some(reason) = wake_trigger(db.as_ref()).await else {
                debug!("Heartbeat tick, nothing to do");
                continue;
            };
            match tx.try_send(reason) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }
    })
}

/// Why the agent should wake now, if anything.
pub async fn wake_trigger(db: &dyn AutomatonDatabase) -> Option<String> {
    match db.unprocessed_inbox_messages(1).await {
        Ok(messages) => messages.first().map(|m| format!("inbox message from {}", m.from)),
        Err(e) => {
            warn!(error = %e, "Heartbeat could not read the inbox");
            None
        }
    }
}

/// How long to park given the recorded `sleep_until`.
pub fn park_duration(sleep_until: Option<&str>, now: DateTime<Utc>) -> Duration {
    let remaining = match sleep_until.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok()) {
        Some(until) => (until.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO),
        None => DEFAULT_SLEEP,
    };
    remaining.max(MIN_SLEEP)
}

/// Wait out a sleep period.
///
/// Returns early when the heartbeat fires or a `wake_request` marker shows
/// up in the store. `sleep_until` is cleared once the park ends.
pub async fn park(db: &dyn AutomatonDatabase, wake_rx: &mut mpsc::Receiver<String>) -> WakeReason {
    // Signals raised while the agent was running are stale
    while wake_rx.try_recv().is_ok() {}

    let sleep_until = db.get_kv(keys::SLEEP_UNTIL).await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not read sleep_until");
        None
    });
    let total = park_duration(sleep_until.as_deref(), Utc::now());
    let slice = total.min(CHECK_INTERVAL);
    info!(seconds = total.as_secs(), "Sleeping");

    let mut channel_open = true;
    let mut slept = Duration::ZERO;
    let reason = loop {
        if slept >= total {
            break WakeReason::Elapsed;
        }

        tokio::select! {
            signal = wake_rx.recv(), if channel_open => match signal {
                Some(reason) => break WakeReason::Heartbeat(reason),
                None => channel_open = false,
            },
            _ = tokio::time::sleep(slice.min(total - slept)) => {
                slept += slice.min(total - slept);
            }
        }

        match db.get_kv(keys::WAKE_REQUEST).await {
            Ok(Some(reason)) => {
                if let Err(e) = db.delete_kv(keys::WAKE_REQUEST).await {
                    warn!(error = %e, "Could not clear wake request");
                }
                break WakeReason::Requested(reason);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read wake request"),
        }
    };

    match &reason {
        WakeReason::Elapsed => info!("Sleep elapsed, waking"),
        WakeReason::Heartbeat(r) | WakeReason::Requested(r) => info!(reason = %r, "Woken early"),
    }
    if let Err(e) = db.delete_kv(keys::SLEEP_UNTIL).await {
        warn!(error = %e, "Could not clear sleep_until");
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::store::InboxMessage;
    use automaton_state::InMemoryDatabase;

    #[test]
    fn park_duration_follows_sleep_until() {
        let now = Utc::now();
        let until = (now + chrono::Duration::seconds(120)).to_rfc3339();
        let d = park_duration(Some(&until), now);
        assert!(d.as_secs() >= 119 && d.as_secs() <= 120);
    }

    #[test]
    fn park_duration_has_a_floor_and_a_default() {
        let now = Utc::now();
        let past = (now - chrono::Duration::seconds(30)).to_rfc3339();
        assert_eq!(park_duration(Some(&past), now), MIN_SLEEP);
        assert_eq!(park_duration(None, now), DEFAULT_SLEEP);
        assert_eq!(park_duration(Some("garbage"), now), DEFAULT_SLEEP);
    }

    #[tokio::test(start_paused = true)]
    async fn park_runs_to_completion_and_clears_sleep_until() {
        let db = InMemoryDatabase::new();
        db.set_kv(keys::SLEEP_UNTIL, "not a timestamp").await.unwrap();
        let (_tx, mut rx) = mpsc::channel(4);

        let reason = park(&db, &mut rx).await;
        assert_eq!(reason, WakeReason::Elapsed);
        assert!(db.get_kv(keys::SLEEP_UNTIL).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn wake_request_cuts_the_park_short() {
        let db = InMemoryDatabase::new();
        let until = (Utc::now() + chrono::Duration::seconds(3600)).to_rfc3339();
        db.set_kv(keys::SLEEP_UNTIL, &until).await.unwrap();
        db.set_kv(keys::WAKE_REQUEST, "creator ping").await.unwrap();
        let (_tx, mut rx) = mpsc::channel(4);

        let reason = park(&db, &mut rx).await;
        assert_eq!(reason, WakeReason::Requested("creator ping".into()));
        assert!(db.get_kv(keys::WAKE_REQUEST).await.unwrap().is_none());
        assert!(db.get_kv(keys::SLEEP_UNTIL).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_signal_wakes_a_parked_agent() {
        let db = InMemoryDatabase::new();
        let until = (Utc::now() + chrono::Duration::seconds(3600)).to_rfc3339();
        db.set_kv(keys::SLEEP_UNTIL, &until).await.unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            tx.send("heartbeat".to_string()).await.unwrap();
        });

        let reason = park(&db, &mut rx).await;
        sender.await.unwrap();
        assert_eq!(reason, WakeReason::Heartbeat("heartbeat".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_signals_are_discarded() {
        let db = InMemoryDatabase::new();
        let (tx, mut rx) = mpsc::channel(4);
        tx.send("old".to_string()).await.unwrap();

        let reason = park(&db, &mut rx).await;
        assert_eq!(reason, WakeReason::Elapsed);
    }

    #[tokio::test]
    async fn only_unread_inbox_is_a_trigger() {
        let db = InMemoryDatabase::new();
        assert_eq!(wake_trigger(&db).await, None);

        db.insert_inbox_message(&InboxMessage::new("0xpeer", "0xabc", "ping"))
            .await
            .unwrap();
        assert_eq!(wake_trigger(&db).await.as_deref(), Some("inbox message from 0xpeer"));
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_heartbeat_leaves_the_sleep_alone() {
        let db = Arc::new(InMemoryDatabase::new());
        let until = (Utc::now() + chrono::Duration::seconds(3600)).to_rfc3339();
        db.set_kv(keys::SLEEP_UNTIL, &until).await.unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_heartbeat(
            HeartbeatConfig {
                enabled: true,
                interval_secs: 300,
            },
            db.clone(),
            tx,
        );

        let started = tokio::time::Instant::now();
        let reason = park(db.as_ref(), &mut rx).await;
        handle.abort();

        assert_eq!(reason, WakeReason::Elapsed);
        assert!(started.elapsed() >= Duration::from_secs(3590));
    }

    #[tokio::test(start_paused = true)]
    async fn inbox_message_wakes_a_parked_agent_on_the_next_tick() {
        let db = Arc::new(InMemoryDatabase::new());
        let until = (Utc::now() + chrono::Duration::seconds(3600)).to_rfc3339();
        db.set_kv(keys::SLEEP_UNTIL, &until).await.unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_heartbeat(
            HeartbeatConfig {
                enabled: true,
                interval_secs: 60,
            },
            db.clone(),
            tx,
        );

        let writer = {
            let db = db.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(90)).await;
                db.insert_inbox_message(&InboxMessage::new("0xpeer", "0xabc", "wake up"))
                    .await
                    .unwrap();
            })
        };

        let started = tokio::time::Instant::now();
        let reason = park(db.as_ref(), &mut rx).await;
        writer.await.unwrap();
        handle.abort();

        assert_eq!(reason, WakeReason::Heartbeat("inbox message from 0xpeer".into()));
        assert!(started.elapsed() <= Duration::from_secs(120));
    }

    #[tokio::test]
    async fn disabled_heartbeat_exits_immediately() {
        let db = Arc::new(InMemoryDatabase::new());
        db.insert_inbox_message(&InboxMessage::new("0xpeer", "0xabc", "ping"))
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_heartbeat(
            HeartbeatConfig {
                enabled: false,
                interval_secs: 10,
            },
            db,
            tx,
        );
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
