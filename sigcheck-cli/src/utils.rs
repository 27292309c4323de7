//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Local, Utc};
use colored::{ColoredString, Colorize};
use sigcheck_core::{
    AppState, AuthProvider, AuthenticitySeverity, HttpScanClient, MemoryBackend, MockScanner,
    RestBackend, ResultStore, Session, SigcheckConfig, SignatureScanner, SignatureStore,
};
use tracing::{debug, warn};

/// Snapshot file for `--mock` runs.
const MOCK_STATE_ENV: &str = "SIGCHECK_MOCK_STATE";
const DEFAULT_MOCK_STATE: &str = ".sigcheck-mock.json";

/// Collaborators for one CLI invocation.
pub struct Context {
    pub state: Arc<AppState>,
    pub auth: Arc<dyn AuthProvider>,
    pub signatures: Arc<dyn SignatureStore>,
    pub results: Arc<dyn ResultStore>,
    pub scanner: Arc<dyn SignatureScanner>,
    /// Present in `--mock` mode, for showing codes that would be emailed.
    pub mock_backend: Option<Arc<MemoryBackend>>,
    pub session_file: PathBuf,
}

impl Context {
    pub fn build(mock: bool, session_file: PathBuf) -> Result<Self> {
        let state = Arc::new(match load_session(&session_file)? {
            Some(session) => AppState::with_session(session),
            None => AppState::new(),
        });

        if mock {
            let path = std::env::var(MOCK_STATE_ENV).unwrap_or_else(|_| DEFAULT_MOCK_STATE.into());
            warn!(state_file = %path, "Using MOCK backend and scanner (no real analysis)");
            let backend = Arc::new(
                MemoryBackend::with_snapshot(&path)
                    .with_context(|| format!("Failed to open mock state {path}"))?,
            );
            return Ok(Self {
                state,
                auth: backend.clone(),
                signatures: backend.clone(),
                results: backend.clone(),
                scanner: Arc::new(MockScanner::new()),
                mock_backend: Some(backend),
                session_file,
            });
        }

        let config = SigcheckConfig::from_env();
        debug!(config = ?config, "Loaded configuration");
        let backend = Arc::new(RestBackend::from_config(&config)?);
        let scanner = HttpScanClient::from_config(&config)?;
        Ok(Self {
            state,
            auth: backend.clone(),
            signatures: backend.clone(),
            results: backend,
            scanner: Arc::new(scanner),
            mock_backend: None,
            session_file,
        })
    }
}

/// Read a saved session. A missing file means nobody is signed in.
pub fn load_session(path: &Path) -> Result<Option<Session>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read session file: {}", path.display()))
        }
    };
    let session = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
    Ok(Some(session))
}

pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    let json = serde_json::to_vec_pretty(session).context("Failed to serialize session")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write session file: {}", path.display()))
}

pub fn clear_session(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove session file: {}", path.display())),
    }
}

/// Format a UTC timestamp in the local time zone.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Severity label in its display colour.
pub fn severity_label(severity: AuthenticitySeverity) -> ColoredString {
    let label = severity.label();
    match severity {
        AuthenticitySeverity::HighlyForged => label.red().bold(),
        AuthenticitySeverity::LikelyForged => label.red(),
        AuthenticitySeverity::PossiblyAuthentic => label.yellow(),
        AuthenticitySeverity::HighlyAuthentic => label.green().bold(),
        AuthenticitySeverity::Unknown => label.dimmed(),
    }
}

/// Text rendering of the score donut: `[██████░░░░]`.
pub fn score_bar(fraction: f64, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}
