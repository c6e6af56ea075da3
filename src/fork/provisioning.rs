//! The three data-context provisioning strategies (spec §4.1), tried in
//! order: zero-copy fork, physical clone, logical context. Workers depend
//! only on the resulting opaque `data_url` and never branch on the strategy
//! that produced it (spec §9).

use crate::error::{FitscoreError, Result};
use crate::storage::libsql::ConnectionMode;
use crate::types::ProvisionStrategy;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

/// Describes the primary data store the Fork/Context Manager forks from.
#[derive(Debug, Clone)]
pub enum PrimaryStore {
    /// A local libsql/SQLite file. `remote` is populated only when this file
    /// is itself an embedded replica synced from a remote, which is what
    /// makes the zero-copy fork strategy available.
    Local { path: String, remote: Option<(String, String)> },
    /// Fully remote; zero-copy fork is always available via a fresh replica.
    Remote { url: String, token: String },
    /// In-memory, used for tests: only the logical-context strategy applies.
    InMemory,
}

fn fork_suffix(path: &str) -> String {
    format!("{path}.fork-{}", Uuid::new_v4())
}

/// Try each strategy in order, returning the first that succeeds along with
/// which one it was (purely for observability — spec §9).
pub fn provision(primary: &PrimaryStore) -> Result<(ConnectionMode, ProvisionStrategy)> {
    if let Some(mode) = try_zero_copy_fork(primary) {
        return Ok((mode, ProvisionStrategy::ZeroCopyFork));
    }
    match try_physical_clone(primary) {
        Ok(Some(mode)) => return Ok((mode, ProvisionStrategy::PhysicalClone)),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "physical clone strategy failed, falling back to logical context"),
    }
    try_logical_context(primary)
        .map(|mode| (mode, ProvisionStrategy::LogicalContext))
        .ok_or_else(|| FitscoreError::NoFork("all three provisioning strategies failed".into()))
}

fn try_zero_copy_fork(primary: &PrimaryStore) -> Option<ConnectionMode> {
    match primary {
        PrimaryStore::Remote { url, token } => {
            debug!("zero-copy fork: embedded replica against remote primary");
            Some(ConnectionMode::EmbeddedReplica { path: fork_suffix("replica"), url: url.clone(), token: token.clone() })
        }
        PrimaryStore::Local { path, remote: Some((url, token)) } => {
            debug!(path, "zero-copy fork: embedded replica against synced local primary");
            Some(ConnectionMode::EmbeddedReplica { path: fork_suffix(path), url: url.clone(), token: token.clone() })
        }
        PrimaryStore::Local { remote: None, .. } | PrimaryStore::InMemory => None,
    }
}

fn try_physical_clone(primary: &PrimaryStore) -> Result<Option<ConnectionMode>> {
    let PrimaryStore::Local { path, .. } = primary else {
        return Ok(None);
    };
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let clone_path = fork_suffix(path);
    std::fs::copy(path, &clone_path)?;
    debug!(path, clone_path, "physical clone of primary store");
    Ok(Some(ConnectionMode::Local(clone_path)))
}

fn try_logical_context(primary: &PrimaryStore) -> Option<ConnectionMode> {
    match primary {
        PrimaryStore::Local { path, .. } => {
            warn!(path, "falling back to logical context: session isolation only, no storage isolation");
            Some(ConnectionMode::LocalReadOnly(path.clone()))
        }
        PrimaryStore::Remote { url, token } => Some(ConnectionMode::Remote { url: url.clone(), token: token.clone() }),
        PrimaryStore::InMemory => Some(ConnectionMode::InMemory),
    }
}
