use std::sync::Arc;

use super::{CredentialSource, LocalStore};

/// Local-storage key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Reads the bearer token from local storage, where sign-in leaves it.
#[derive(Clone)]
pub struct StoredToken {
    store: Arc<dyn LocalStore>,
}

impl StoredToken {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn login(&self, token: &str) -> anyhow::Result<()> {
        self.store.set(TOKEN_KEY, token.trim())
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        self.store.remove(TOKEN_KEY)
    }
}

impl CredentialSource for StoredToken {
    fn bearer_token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY) {
            Ok(token) => token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read token, treating as signed out");
                None
            }
        }
    }
}

/// A fixed credential, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
    pub fn none() -> Self {
        StaticToken(None)
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        StaticToken(Some(token.into()))
    }
}

impl CredentialSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        let token = self.0.as_deref()?.trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}
