//! Credential boundary between the request layer and the session layer.
//!
//! The request layer only needs two things: a bearer token to attach to
//! every request, and a way to drop the session when the service rejects it.

use std::fmt::Debug;

use parking_lot::RwLock;

/// Source of the bearer credential attached to outgoing requests.
///
/// Implementations are owned by the external session layer; gpuwatch calls
/// [`CredentialStore::invalidate`] when the service answers 401.
pub trait CredentialStore: Send + Sync + Debug {
    /// Current bearer token, if the user is logged in.
    fn bearer_token(&self) -> Option<String>;

    /// Forget the current credential.
    fn invalidate(&self);
}

/// In-memory token store.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    /// Replace the stored token, e.g. after a fresh login.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}

impl CredentialStore for TokenStore {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn invalidate(&self) {
        *self.token.write() = None;
    }
}
