//! Broadcast destination roster.
//!
//! The adapter consumes the roster through the narrow [`Roster`] surface:
//! upsert a destination when a group chat is observed, drop one, list them
//! all. [`FileRoster`] persists the list as a single JSON file the way the
//! historical `groups.data` store did; [`MemoryRoster`] backs tests and
//! hosts that keep their own roster.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use crate::host::HostError;
use crate::types::Destination;

/// Narrow surface of the externally maintained destination roster.
pub trait Roster: Send + Sync {
    /// Insert or update a destination by id.
    fn update(&self, id: i64, name: &str) -> Result<(), HostError>;
    /// Remove a destination.
    fn delete(&self, id: i64) -> Result<(), HostError>;
    /// All known destinations, in stored order.
    fn list(&self) -> Result<Vec<Destination>, HostError>;
}

/// Roster persisted as one JSON file.
#[derive(Debug)]
pub struct FileRoster {
    path: PathBuf,
    groups: Mutex<Vec<Destination>>,
}

impl FileRoster {
    /// Open a roster file. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let groups = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            path,
            groups: Mutex::new(groups),
        }
    }

    // Write-through on every mutation; a failed write keeps the in-memory
    // state and logs.
    fn save(&self, groups: &[Destination]) {
        match serde_json::to_string(groups) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "failed to persist roster");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize roster"),
        }
    }
}

impl Roster for FileRoster {
    fn update(&self, id: i64, name: &str) -> Result<(), HostError> {
        let mut groups = self.groups.lock().expect("roster mutex poisoned");
        match groups.iter_mut().find(|g| g.id == id) {
            Some(existing) => existing.name = name.to_string(),
            None => groups.push(Destination {
                id,
                name: name.to_string(),
            }),
        }
        self.save(&groups);
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<(), HostError> {
        let mut groups = self.groups.lock().expect("roster mutex poisoned");
        groups.retain(|g| g.id != id);
        self.save(&groups);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Destination>, HostError> {
        let groups = self.groups.lock().expect("roster mutex poisoned");
        Ok(groups.clone())
    }
}

/// In-memory roster.
#[derive(Debug, Default)]
pub struct MemoryRoster {
    groups: Mutex<Vec<Destination>>,
}

impl Roster for MemoryRoster {
    fn update(&self, id: i64, name: &str) -> Result<(), HostError> {
        let mut groups = self.groups.lock().expect("roster mutex poisoned");
        match groups.iter_mut().find(|g| g.id == id) {
            Some(existing) => existing.name = name.to_string(),
            None => groups.push(Destination {
                id,
                name: name.to_string(),
            }),
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<(), HostError> {
        let mut groups = self.groups.lock().expect("roster mutex poisoned");
        groups.retain(|g| g.id != id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Destination>, HostError> {
        let groups = self.groups.lock().expect("roster mutex poisoned");
        Ok(groups.clone())
    }
}
