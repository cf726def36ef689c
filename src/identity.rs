//! Identity reconciliation against the host brain's user cache.

use std::sync::Arc;

use tracing::info;

use crate::host::{Brain, HostError};
use crate::types::{Chat, RemoteUser, User};

/// Decides when a remote user's profile supersedes the cached one.
pub struct IdentityResolver {
    brain: Arc<dyn Brain>,
}

impl IdentityResolver {
    /// Resolver backed by the given brain.
    pub fn new(brain: Arc<dyn Brain>) -> Self {
        Self { brain }
    }

    /// Resolve a wire user observed in `chat` against the identity cache.
    ///
    /// The cache lookup creates the entry if absent, with the room and chat
    /// attached. When the profile fingerprint (first name + last name +
    /// username, byte-exact) differs from the cached copy, the incoming
    /// record replaces the cached one wholesale and is returned; otherwise
    /// the cached record is returned unchanged. The only write happens on
    /// mismatch.
    pub fn resolve(&self, user: &User, chat: &Chat) -> Result<RemoteUser, HostError> {
        let incoming = RemoteUser::from_wire(user, chat);
        let cached = self.brain.user_for_id(user.id, &incoming)?;

        if cached.profile_fingerprint() != incoming.profile_fingerprint() {
            info!(user_id = user.id, "user profile changed, persisting new record");
            self.brain.replace_user(incoming.clone())?;
            return Ok(incoming);
        }
        Ok(cached)
    }
}
