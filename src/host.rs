//! Host-framework collaborators, reduced to the narrow surfaces the
//! adapter actually consumes.
//!
//! The host owns a "brain": a key-value store plus an identity cache keyed
//! by user id. The adapter uses the key-value side for its seen-set of
//! handled message ids and the identity side for user reconciliation.
//! [`InMemoryBrain`] is the default store and the one tests use.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

use crate::types::RemoteUser;

/// Failure of a host-framework collaborator.
///
/// These are recoverable: the adapter logs them, abandons the current
/// operation, and the surrounding loop continues.
#[derive(Debug, Error)]
pub enum HostError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value and identity surface of the host framework's brain.
pub trait Brain: Send + Sync {
    /// Fetch a value by key.
    fn get(&self, key: &str) -> Result<Option<Value>, HostError>;
    /// Store a value under a key.
    fn set(&self, key: &str, value: Value) -> Result<(), HostError>;
    /// Look up the cached user by id, creating it from `defaults` when
    /// absent.
    fn user_for_id(&self, id: i64, defaults: &RemoteUser) -> Result<RemoteUser, HostError>;
    /// Overwrite the cached user wholesale.
    fn replace_user(&self, user: RemoteUser) -> Result<(), HostError>;
}

/// In-memory brain used when the host does not supply one.
#[derive(Debug, Default)]
pub struct InMemoryBrain {
    values: Mutex<HashMap<String, Value>>,
    users: Mutex<HashMap<i64, RemoteUser>>,
}

impl Brain for InMemoryBrain {
    fn get(&self, key: &str) -> Result<Option<Value>, HostError> {
        let values = self.values.lock().expect("brain mutex poisoned");
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), HostError> {
        let mut values = self.values.lock().expect("brain mutex poisoned");
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn user_for_id(&self, id: i64, defaults: &RemoteUser) -> Result<RemoteUser, HostError> {
        let mut users = self.users.lock().expect("brain mutex poisoned");
        Ok(users.entry(id).or_insert_with(|| defaults.clone()).clone())
    }

    fn replace_user(&self, user: RemoteUser) -> Result<(), HostError> {
        let mut users = self.users.lock().expect("brain mutex poisoned");
        users.insert(user.id, user);
        Ok(())
    }
}
