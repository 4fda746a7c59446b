//! Show command implementation.

use super::session::{Session, SessionOptions};
use displaysync_core::{SettingValue, SyncStats};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Snapshot of every setting.
#[derive(Debug, Serialize)]
pub struct ShowResult {
    /// Remote-backed settings by name.
    pub settings: BTreeMap<&'static str, serde_json::Value>,
    /// Orientation lock.
    pub orientation: String,
    /// Engine counters (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsView>,
}

/// Serializable engine counters.
#[derive(Debug, Serialize)]
pub struct StatsView {
    /// Fetches issued.
    pub fetches: u64,
    /// Pushes issued.
    pub pushes: u64,
    /// Remote events received.
    pub remote_events: u64,
    /// Notifications emitted.
    pub notifications: u64,
}

impl From<&SyncStats> for StatsView {
    fn from(stats: &SyncStats) -> Self {
        Self {
            fetches: stats.fetches,
            pushes: stats.pushes,
            remote_events: stats.remote_events,
            notifications: stats.notifications,
        }
    }
}

/// Runs the show command.
pub fn run(
    options: &SessionOptions,
    show_stats: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(options)?;
    let settings = session.settings();

    let result = ShowResult {
        settings: settings
            .engine()
            .snapshot()
            .into_iter()
            .map(|(id, value)| (id.name(), to_json(value)))
            .collect(),
        orientation: settings.orientation_lock().to_string(),
        stats: show_stats.then(|| StatsView::from(settings.engine().stats())),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            for (id, value) in settings.engine().snapshot() {
                println!("{:<22} {}", id.name(), value);
            }
            println!("{:<22} {}", "orientation", result.orientation);
            if let Some(stats) = &result.stats {
                println!();
                println!("fetches: {}", stats.fetches);
                println!("pushes: {}", stats.pushes);
                println!("remote events: {}", stats.remote_events);
                println!("notifications: {}", stats.notifications);
            }
        }
    }

    Ok(())
}

fn to_json(value: SettingValue) -> serde_json::Value {
    match value {
        SettingValue::Integer(n) => json!(n),
        SettingValue::Boolean(b) => json!(b),
        other => json!(other.to_string()),
    }
}
