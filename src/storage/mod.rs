// Capabilities the progress adapter is built from: on-device key/value
// storage, a bearer-token source, and the remote progress API.

mod file;
mod memory;
mod token;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use token::{StaticToken, StoredToken, TOKEN_KEY};

use crate::domain::models::{RemoteProgress, RemoteProgressWrite};
use crate::progress_client::RemoteError;

/// Synchronous string key/value storage, shaped like a browser's local storage.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
    fn keys(&self) -> anyhow::Result<Vec<String>>;
}

pub trait CredentialSource: Send + Sync {
    /// `None` when the learner is not signed in. Empty tokens count as absent.
    fn bearer_token(&self) -> Option<String>;
}

#[async_trait::async_trait]
pub trait ProgressRemote: Send + Sync {
    async fn save(
        &self,
        token: &str,
        write: &RemoteProgressWrite,
    ) -> Result<RemoteProgress, RemoteError>;

    /// `Ok(None)` when the service answers successfully without a record.
    async fn fetch(
        &self,
        token: &str,
        scenario_id: &str,
    ) -> Result<Option<RemoteProgress>, RemoteError>;

    async fn fetch_all(&self, token: &str) -> Result<Vec<RemoteProgress>, RemoteError>;
}
