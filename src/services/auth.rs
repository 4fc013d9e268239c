// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth session: the signed-in user and token, persisted under the `user`
//! and `token` keys.

use crate::models::User;
use crate::storage::{keys, KeyValueStore};
use std::sync::Arc;

/// A signed-in user and their API token.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Holds the current session and keeps storage in step with it.
pub struct AuthSession {
    storage: Arc<dyn KeyValueStore>,
    current: Option<Session>,
}

impl AuthSession {
    /// Restore the session saved in storage.
    ///
    /// Both keys must be present. A user record that fails to parse is
    /// treated as corrupt: both keys are removed and nobody is signed in.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let current = restore(storage.as_ref());
        if let Some(session) = &current {
            tracing::debug!(user_id = ?session.user.id, "Restored auth session");
        }
        Self { storage, current }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Start a session and persist it.
    pub fn login(&mut self, user: User, token: String) {
        self.persist_user(&user);
        if let Err(e) = self.storage.set(keys::TOKEN, &token) {
            tracing::warn!(error = %e, "Failed to persist session token");
        }
        tracing::info!(user_id = ?user.id, "Signed in");
        self.current = Some(Session { user, token });
    }

    /// End the session and forget it in storage.
    pub fn logout(&mut self) {
        for key in [keys::USER, keys::TOKEN] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove session key");
            }
        }
        if self.current.take().is_some() {
            tracing::info!("Signed out");
        }
    }

    /// Replace the signed-in user's profile (e.g. after a purchase).
    /// Returns `false` when nobody is signed in.
    pub fn update_user(&mut self, user: User) -> bool {
        if self.current.is_none() {
            tracing::debug!("Ignoring user update without a session");
            return false;
        }
        self.persist_user(&user);
        if let Some(session) = self.current.as_mut() {
            session.user = user;
        }
        true
    }

    fn persist_user(&self, user: &User) {
        let result = serde_json::to_string(user)
            .map_err(crate::error::AppError::from)
            .and_then(|raw| self.storage.set(keys::USER, &raw));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist user");
        }
    }
}

fn restore(storage: &dyn KeyValueStore) -> Option<Session> {
    let user_raw = storage.get(keys::USER).ok().flatten()?;
    let token = storage.get(keys::TOKEN).ok().flatten()?;

    match serde_json::from_str::<User>(&user_raw) {
        Ok(user) => Some(Session { user, token }),
        Err(e) => {
            tracing::warn!(error = %e, "Stored user is corrupt; clearing session");
            let _ = storage.remove(keys::USER);
            let _ = storage.remove(keys::TOKEN);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn token_without_user_is_not_a_session() {
        let store = MemoryStore::new();
        store.set(keys::TOKEN, "t").unwrap();
        let auth = AuthSession::load(Arc::new(store));
        assert!(!auth.is_signed_in());
    }

    #[test]
    fn update_without_session_is_ignored() {
        let store = MemoryStore::new();
        let mut auth = AuthSession::load(Arc::new(store.clone()));
        assert!(!auth.update_user(User::default()));
        assert!(!store.contains_key(keys::USER));
    }
}
