//! Shared setup for commands that talk to the configuration service.

use displaysync_core::{
    BusTransport, DisplaySettings, EngineConfig, FileStore, LoopbackBus, MemoryConfigService,
    RetryConfig, SettingId, StoreError, SyncError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Transport used by the CLI.
pub type Transport = BusTransport<LoopbackBus<MemoryConfigService>>;

/// Errors reported by commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Engine or transport failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// State file failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Service state and local settings would overwrite each other.
    #[error("--state and --store must name different files ({})", .0.display())]
    SharedFile(PathBuf),

    /// No setting by that name.
    #[error("unknown setting '{0}' (see `displayctl list`)")]
    UnknownSetting(String),

    /// Value does not parse for the setting.
    #[error("invalid value for {setting}: {reason}")]
    InvalidValue {
        /// Setting being written.
        setting: SettingId,
        /// Parser message.
        reason: String,
    },
}

/// Result type for commands.
pub type CliResult<T> = Result<T, CliError>;

/// Where session state lives.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Service state file.
    pub state: PathBuf,
    /// Local settings file.
    pub store: PathBuf,
    /// Reply timeout for service queries.
    pub fetch_timeout: Duration,
    /// Attempts per key during the initial fetch.
    pub retries: u32,
}

/// A connected settings session.
pub struct Session {
    service: Arc<MemoryConfigService>,
    state: FileStore,
    settings: DisplaySettings<Transport, FileStore>,
}

impl Session {
    /// Loads the service state and connects the settings to it.
    pub fn open(options: &SessionOptions) -> CliResult<Self> {
        if same_file(&options.state, &options.store) {
            return Err(CliError::SharedFile(options.state.clone()));
        }

        let state = FileStore::open(&options.state)?;
        let service = Arc::new(MemoryConfigService::with_display_defaults());
        for (key, value) in state.snapshot() {
            service.insert(key, value);
        }

        let transport = Arc::new(BusTransport::new(LoopbackBus::new(Arc::clone(&service))));
        let config = EngineConfig::new()
            .with_fetch_timeout(options.fetch_timeout)
            .with_retry(RetryConfig::new(options.retries));
        let store = FileStore::open(&options.store)?;
        let settings = DisplaySettings::connect(config, transport, store)?;
        debug!(state = %options.state.display(), store = %options.store.display(), "session open");

        Ok(Self {
            service,
            state,
            settings,
        })
    }

    /// The connected settings.
    pub fn settings(&self) -> &DisplaySettings<Transport, FileStore> {
        &self.settings
    }

    /// Mutable access to the connected settings.
    pub fn settings_mut(&mut self) -> &mut DisplaySettings<Transport, FileStore> {
        &mut self.settings
    }

    /// Drains pending broadcasts and writes the service state back.
    pub fn save(&mut self) -> CliResult<()> {
        self.settings.dispatch_pending();
        self.state.replace_all(self.service.snapshot())?;
        Ok(())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || absolute(a) == absolute(b)
}

/// Best-effort absolute form of a path that may not exist yet.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

/// Resolves a setting name.
pub fn resolve(name: &str) -> CliResult<SettingId> {
    name.parse()
        .map_err(|_| CliError::UnknownSetting(name.to_string()))
}
