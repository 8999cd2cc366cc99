// crates/aegisflux-correlator/src/rules/loader.rs
// ============================================================================
// Module: Rule Loader
// Description: Directory loader with live reload and atomic snapshot swap.
// Purpose: Publish all-or-nothing rule snapshots to evaluators.
// Dependencies: aegisflux-core, arc-swap, notify, tokio
// ============================================================================

//! ## Overview
//! The loader enumerates `*.json` files under the rule directory in name
//! order, validates and compiles every rule, and swaps in a new
//! [`RuleSnapshot`] only when the entire directory is valid. The watcher
//! coalesces rapid successive file events within a 200 ms debounce window
//! before reloading; a failed reload keeps the previous snapshot in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aegisflux_core::DEFAULT_HASH_ALGORITHM;
use aegisflux_core::core::hashing::hash_parts;
use aegisflux_core::core::time::now_unix_millis;
use arc_swap::ArcSwap;
use notify::RecursiveMode;
use notify::Watcher;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::rules::model::CompiledRule;
use crate::rules::model::Rule;
use crate::rules::model::RuleSnapshot;
use crate::rules::predicate::CompiledPredicate;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Quiet period the watcher waits before reloading after a file event.
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(200);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by the rule loader.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Rule directory could not be read.
    #[error("rule directory read failure: {0}")]
    Io(String),
    /// A rule file failed to parse.
    #[error("rule file {file} failed to parse: {reason}")]
    Parse {
        /// Offending file name.
        file: String,
        /// Parser message.
        reason: String,
    },
    /// A rule failed validation or predicate compilation.
    #[error("rule file {file} is invalid: {reason}")]
    Invalid {
        /// Offending file name.
        file: String,
        /// Validation message.
        reason: String,
    },
    /// The file watcher could not be installed.
    #[error("rule watcher failure: {0}")]
    Watch(String),
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Owner of the active rule snapshot.
///
/// # Invariants
/// - The snapshot pointer is read via atomic load and written via swap under
///   the loader; readers see old-or-new, never a partial rule set.
pub struct RuleLoader {
    /// Directory containing rule files.
    dir: PathBuf,
    /// Active snapshot pointer.
    current: ArcSwap<RuleSnapshot>,
}

impl RuleLoader {
    /// Creates a loader over a rule directory, starting from the empty
    /// snapshot.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.into(),
            current: ArcSwap::new(Arc::new(RuleSnapshot::empty())),
        })
    }

    /// Returns the active snapshot pointer.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RuleSnapshot> {
        self.current.load_full()
    }

    /// Returns the rule directory path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads the directory and swaps the snapshot on full success.
    ///
    /// # Errors
    ///
    /// Returns the first [`LoaderError`] encountered; the active snapshot is
    /// untouched on any failure.
    pub fn load(&self) -> Result<Arc<RuleSnapshot>, LoaderError> {
        let snapshot = Arc::new(build_snapshot(&self.dir)?);
        self.current.store(Arc::clone(&snapshot));
        tracing::info!(
            version = %snapshot.version,
            rules = snapshot.rules.len(),
            "rule snapshot activated"
        );
        Ok(snapshot)
    }

    /// Watches the rule directory and reloads on coalesced changes.
    ///
    /// Runs until the watcher channel closes. Reload failures are logged and
    /// leave the active snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Watch`] when the watcher cannot be installed.
    pub async fn watch(self: Arc<Self>) -> Result<(), LoaderError> {
        let (sender, mut receiver) = mpsc::channel::<()>(16);
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            if result.is_ok() {
                let _ = sender.blocking_send(());
            }
        })
        .map_err(|err| LoaderError::Watch(err.to_string()))?;
        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|err| LoaderError::Watch(err.to_string()))?;

        while receiver.recv().await.is_some() {
            // Coalesce bursts: keep draining until the directory is quiet.
            while tokio::time::timeout(RELOAD_DEBOUNCE, receiver.recv()).await.is_ok() {}
            match self.load() {
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "rule reload failed, keeping previous snapshot");
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Snapshot Construction
// ============================================================================

/// Builds a snapshot from every `*.json` file in name order.
fn build_snapshot(dir: &Path) -> Result<RuleSnapshot, LoaderError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|err| LoaderError::Io(err.to_string()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut rules = Vec::with_capacity(files.len());
    let mut digest_parts: Vec<Vec<u8>> = Vec::with_capacity(files.len());
    for path in &files {
        let file = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        let bytes = std::fs::read(path).map_err(|err| LoaderError::Io(err.to_string()))?;
        let rule: Rule = serde_json::from_slice(&bytes).map_err(|err| LoaderError::Parse {
            file: file.clone(),
            reason: err.to_string(),
        })?;
        rule.validate().map_err(|err| LoaderError::Invalid {
            file: file.clone(),
            reason: err.to_string(),
        })?;
        let predicate =
            CompiledPredicate::compile(&rule.condition.where_clause).map_err(|err| {
                LoaderError::Invalid {
                    file: file.clone(),
                    reason: err.to_string(),
                }
            })?;
        rules.push(Arc::new(CompiledRule {
            rule,
            predicate,
        }));
        digest_parts.push(bytes);
    }

    let digest_views: Vec<&[u8]> = digest_parts.iter().map(Vec::as_slice).collect();
    let version = hash_parts(DEFAULT_HASH_ALGORITHM, &digest_views).value[.. 12].to_string();
    Ok(RuleSnapshot {
        version,
        loaded_at: now_unix_millis(),
        rules,
    })
}
