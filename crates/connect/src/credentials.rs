//! Bearer-token holder shared by the catalog and cart calls.

use std::sync::RwLock;

use crate::ConnectError;

/// The access token for the catalog/cart service.
///
/// Acquiring and refreshing tokens happens elsewhere; this store only holds
/// the current one and forgets it when the service rejects it.
#[derive(Debug, Default)]
pub struct CredentialStore {
    token: RwLock<Option<String>>,
}

impl CredentialStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    /// Read the token from `var`.
    pub fn from_env(var: &str) -> Result<Self, ConnectError> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(Some(token))),
            _ => Err(ConnectError::MissingCredential {
                var: var.to_string(),
            }),
        }
    }

    pub fn get(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, token: String) {
        match self.token.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    pub fn clear(&self) {
        match self.token.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}
