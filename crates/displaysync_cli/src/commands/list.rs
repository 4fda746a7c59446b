//! List command implementation.

use displaysync_core::{LocalKey, SettingKind, REGISTRY};
use serde::Serialize;

/// One listed setting.
#[derive(Debug, Serialize)]
pub struct SettingEntry {
    /// Name accepted by `get` and `set`.
    pub name: String,
    /// Key the value is stored under.
    pub key: &'static str,
    /// Value kind.
    pub kind: &'static str,
    /// Accepted names for enumerations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<&'static str>,
    /// Whether the setting lives in the local store.
    pub local: bool,
}

/// Runs the list command.
pub fn run(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut entries: Vec<SettingEntry> = REGISTRY
        .iter()
        .map(|d| SettingEntry {
            name: d.id.name().to_string(),
            key: d.remote_key,
            kind: d.kind.name(),
            values: match d.kind {
                SettingKind::Enum(ty) => ty.variants().iter().map(|(_, name)| *name).collect(),
                _ => Vec::new(),
            },
            local: false,
        })
        .collect();
    entries.extend(LocalKey::ALL.into_iter().map(|k| SettingEntry {
        name: "orientation".to_string(),
        key: k.key(),
        kind: "text",
        values: Vec::new(),
        local: true,
    }));

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => {
            for entry in &entries {
                let scope = if entry.local { " (local)" } else { "" };
                println!("{:<22} {:<16} {}{}", entry.name, entry.kind, entry.key, scope);
                if !entry.values.is_empty() {
                    println!("{:<22} values: {}", "", entry.values.join(", "));
                }
            }
        }
    }

    Ok(())
}
