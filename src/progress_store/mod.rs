// Progress persistence across local storage and the remote progress API.
//
// Every operation resolves to a value. Local storage is always written
// first; the remote is preferred for reads whenever it answers with data.
// When it does not, the result is served from local storage and tagged with
// the reason, so callers that care can surface sync problems.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::domain::mapping;
use crate::domain::models::{LocalRecord, ProgressPatch, ScenarioProgress};
use crate::progress_client::RemoteError;
use crate::storage::{CredentialSource, LocalStore, ProgressRemote};

/// Local-storage key prefix for progress records.
pub const PROGRESS_KEY_PREFIX: &str = "scenario-progress-";

pub fn progress_key(scenario_id: &str) -> String {
    format!("{PROGRESS_KEY_PREFIX}{scenario_id}")
}

/// Why a result came from local storage instead of the remote.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    NoCredential,
    Unauthorized,
    NotFound,
    /// The remote answered successfully but had nothing
    EmptyRemote,
    Status(u16),
    Rejected(String),
    Network(String),
    Decode(String),
}

impl From<&RemoteError> for FallbackReason {
    fn from(err: &RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized => FallbackReason::Unauthorized,
            RemoteError::NotFound => FallbackReason::NotFound,
            RemoteError::Status(code) => FallbackReason::Status(*code),
            RemoteError::Rejected(msg) => FallbackReason::Rejected(msg.clone()),
            RemoteError::Network(e) => FallbackReason::Network(e.to_string()),
            RemoteError::InvalidUrl(u) => FallbackReason::Network(u.clone()),
            RemoteError::Decode(e) => FallbackReason::Decode(e.to_string()),
        }
    }
}

/// A value tagged with the store that served it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Served<T> {
    Remote { value: T },
    Local { value: T, reason: FallbackReason },
}

impl<T> Served<T> {
    fn local(value: T, reason: FallbackReason) -> Self {
        Served::Local { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Served::Remote { value } | Served::Local { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Served::Remote { value } | Served::Local { value, .. } => value,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Served::Remote { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Served::Remote { .. } => None,
            Served::Local { reason, .. } => Some(reason),
        }
    }

    /// Signed in, yet served locally.
    pub fn is_degraded(&self) -> bool {
        !matches!(
            self.fallback_reason(),
            None | Some(FallbackReason::NoCredential)
        )
    }
}

/// Outcome of [`ProgressStore::save`].
///
/// `local_write_error` is set when the local copy could not be written; the
/// returned record then exists only in memory (and remotely, if served so).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Saved {
    #[serde(flatten)]
    pub served: Served<ScenarioProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_write_error: Option<String>,
}

impl Saved {
    pub fn value(&self) -> &ScenarioProgress {
        self.served.value()
    }

    pub fn into_value(self) -> ScenarioProgress {
        self.served.into_value()
    }

    pub fn is_remote(&self) -> bool {
        self.served.is_remote()
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        self.served.fallback_reason()
    }

    pub fn local_write_failed(&self) -> bool {
        self.local_write_error.is_some()
    }

    /// Signed in yet served locally, or not persisted locally at all.
    pub fn is_degraded(&self) -> bool {
        self.local_write_failed() || self.served.is_degraded()
    }
}

#[derive(Clone)]
pub struct ProgressStore {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn ProgressRemote>,
    credentials: Arc<dyn CredentialSource>,
}

impl ProgressStore {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn ProgressRemote>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            local,
            remote,
            credentials,
        }
    }

    /// Record `patch` as the scenario's progress.
    ///
    /// The local copy is replaced before any network I/O and is never rolled
    /// back. With a credential the patch is also sent to the remote; its
    /// record is returned when that succeeds, the local one otherwise. A
    /// failed local write is reported on the result, never raised.
    #[tracing::instrument(level = "debug", skip(self, patch))]
    pub async fn save(&self, scenario_id: &str, patch: ProgressPatch) -> Saved {
        let write = mapping::to_remote_write(scenario_id, &patch);
        let record = mapping::local_record(scenario_id, patch, Utc::now());
        let local_write_error = self.write_local(&record).err().map(|e| format!("{e:#}"));
        let local = mapping::from_local(record);

        let served = match self.credentials.bearer_token() {
            None => {
                tracing::debug!(scenario_id, "no credential, saved locally only");
                Served::local(local, FallbackReason::NoCredential)
            }
            Some(token) => match self.remote.save(&token, &write).await {
                Ok(remote) => Served::Remote {
                    value: mapping::from_remote(Some(scenario_id), remote),
                },
                Err(e) => {
                    tracing::warn!(scenario_id, error = %e, "remote save failed, keeping local copy");
                    Served::local(local, FallbackReason::from(&e))
                }
            },
        };
        Saved {
            served,
            local_write_error,
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get(&self, scenario_id: &str) -> Served<Option<ScenarioProgress>> {
        let Some(token) = self.credentials.bearer_token() else {
            return Served::local(self.read_local(scenario_id), FallbackReason::NoCredential);
        };

        let reason = match self.remote.fetch(&token, scenario_id).await {
            Ok(Some(remote)) => {
                return Served::Remote {
                    value: Some(mapping::from_remote(Some(scenario_id), remote)),
                };
            }
            Ok(None) => FallbackReason::EmptyRemote,
            Err(e) => FallbackReason::from(&e),
        };
        tracing::warn!(scenario_id, ?reason, "reading progress from local storage");
        Served::local(self.read_local(scenario_id), reason)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_all(&self) -> Served<Vec<ScenarioProgress>> {
        let Some(token) = self.credentials.bearer_token() else {
            return Served::local(self.read_all_local(), FallbackReason::NoCredential);
        };

        let reason = match self.remote.fetch_all(&token).await {
            Ok(records) if !records.is_empty() => {
                let value = records
                    .into_iter()
                    .map(|r| mapping::from_remote(None, r))
                    .filter(|p| {
                        if p.scenario_id.is_empty() {
                            tracing::warn!("dropping remote progress record without scenario id");
                        }
                        !p.scenario_id.is_empty()
                    })
                    .collect();
                return Served::Remote { value };
            }
            Ok(_) => FallbackReason::EmptyRemote,
            Err(e) => FallbackReason::from(&e),
        };
        tracing::warn!(?reason, "listing progress from local storage");
        Served::local(self.read_all_local(), reason)
    }

    /// Drop the local copy of one scenario. Returns whether one existed.
    pub fn forget_local(&self, scenario_id: &str) -> bool {
        let key = progress_key(scenario_id);
        let existed = matches!(self.local.get(&key), Ok(Some(_)));
        if let Err(e) = self.local.remove(&key) {
            tracing::error!(scenario_id, error = %e, "failed to remove local progress");
            return false;
        }
        existed
    }

    /// Drop every local progress record. Returns how many were removed.
    pub fn clear_local(&self) -> usize {
        let keys = match self.local.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "failed to enumerate local storage");
                return 0;
            }
        };
        keys.iter()
            .filter(|k| k.starts_with(PROGRESS_KEY_PREFIX))
            .filter(|k| match self.local.remove(k) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(key = %k, error = %e, "failed to remove local progress");
                    false
                }
            })
            .count()
    }

    fn write_local(&self, record: &LocalRecord) -> anyhow::Result<()> {
        let key = progress_key(&record.scenario_id);
        let result = serde_json::to_string(record)
            .map_err(anyhow::Error::from)
            .and_then(|body| self.local.set(&key, &body));
        if let Err(e) = &result {
            tracing::error!(%key, error = %e, "failed to write progress to local storage");
        }
        result
    }

    fn read_local(&self, scenario_id: &str) -> Option<ScenarioProgress> {
        let key = progress_key(scenario_id);
        let body = match self.local.get(&key) {
            Ok(body) => body?,
            Err(e) => {
                tracing::error!(%key, error = %e, "failed to read local storage");
                return None;
            }
        };
        match serde_json::from_str::<LocalRecord>(&body) {
            Ok(mut record) => {
                if record.scenario_id.is_empty() {
                    record.scenario_id = scenario_id.to_string();
                }
                Some(mapping::from_local(record))
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "ignoring unparseable local progress");
                None
            }
        }
    }

    fn read_all_local(&self) -> Vec<ScenarioProgress> {
        let keys = match self.local.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "failed to enumerate local storage");
                return Vec::new();
            }
        };
        keys.into_iter()
            .filter(|k| k.starts_with(PROGRESS_KEY_PREFIX))
            .filter_map(|key| {
                let body = self.local.get(&key).ok().flatten()?;
                match serde_json::from_str::<LocalRecord>(&body) {
                    Ok(record) if !record.scenario_id.is_empty() => Some(mapping::from_local(record)),
                    Ok(_) => {
                        tracing::warn!(%key, "skipping local progress without scenarioId");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(%key, error = %e, "skipping unparseable local progress");
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::models::{RemoteProgress, RemoteProgressWrite};
    use crate::progress_client::ProgressClient;
    use crate::storage::{FileStore, MemoryStore, StaticToken};

    /// Local storage whose writes always fail.
    struct ReadOnlyStore;

    impl LocalStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("quota exceeded")
        }

        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }

        fn keys(&self) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    /// What the scripted remote answers with.
    #[derive(Clone)]
    enum Script {
        Record(RemoteProgress),
        Empty,
        Status(u16),
        Garbage,
    }

    impl Script {
        fn answer<T>(&self, ok: impl FnOnce(Option<RemoteProgress>) -> T) -> Result<T, RemoteError> {
            match self {
                Script::Record(r) => Ok(ok(Some(r.clone()))),
                Script::Empty => Ok(ok(None)),
                Script::Status(401) => Err(RemoteError::Unauthorized),
                Script::Status(404) => Err(RemoteError::NotFound),
                Script::Status(code) => Err(RemoteError::Status(*code)),
                Script::Garbage => Err(serde_json::from_str::<serde_json::Value>("{")
                    .unwrap_err()
                    .into()),
            }
        }
    }

    struct ScriptedRemote {
        script: Script,
        calls: Mutex<usize>,
        writes: Mutex<Vec<serde_json::Value>>,
    }

    impl ScriptedRemote {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: Mutex::new(0),
                writes: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl ProgressRemote for ScriptedRemote {
        async fn save(
            &self,
            _token: &str,
            write: &RemoteProgressWrite,
        ) -> Result<RemoteProgress, RemoteError> {
            *self.calls.lock().unwrap() += 1;
            self.writes
                .lock()
                .unwrap()
                .push(serde_json::to_value(write).unwrap());
            self.script
                .answer(|r| r)?
                .ok_or_else(|| RemoteError::Rejected("no record".into()))
        }

        async fn fetch(
            &self,
            _token: &str,
            _scenario_id: &str,
        ) -> Result<Option<RemoteProgress>, RemoteError> {
            *self.calls.lock().unwrap() += 1;
            self.script.answer(|r| r)
        }

        async fn fetch_all(&self, _token: &str) -> Result<Vec<RemoteProgress>, RemoteError> {
            *self.calls.lock().unwrap() += 1;
            self.script.answer(|r| r.into_iter().collect())
        }
    }

    fn adapter(
        remote: Arc<dyn ProgressRemote>,
        token: Option<&str>,
    ) -> (ProgressStore, Arc<MemoryStore>) {
        let local = Arc::new(MemoryStore::new());
        let creds = Arc::new(StaticToken(token.map(str::to_string)));
        (ProgressStore::new(local.clone(), remote, creds), local)
    }

    fn interview_done() -> ProgressPatch {
        ProgressPatch::default()
            .stage("digital-evidence")
            .completed(["client-interview"])
    }

    fn remote_record(stage: &str) -> RemoteProgress {
        RemoteProgress {
            scenario_id: Some("s1".into()),
            status: Some(stage.into()),
            completed_stages: Some(vec!["client-interview".into()]),
            score: Some(87.0),
            time_spent: Some(120),
            ..Default::default()
        }
    }

    fn local_json(local: &MemoryStore, scenario_id: &str) -> serde_json::Value {
        let body = local.get(&progress_key(scenario_id)).unwrap().unwrap();
        serde_json::from_str(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_round_trip_never_calls_remote() {
        let remote = ScriptedRemote::new(Script::Status(500));
        let (store, _) = adapter(remote.clone(), None);

        let saved = store.save("s1", interview_done()).await;
        assert_eq!(saved.fallback_reason(), Some(&FallbackReason::NoCredential));
        assert!(!saved.is_degraded());

        let got = store.get("s1").await.into_value().unwrap();
        assert_eq!(got.current_stage.as_deref(), Some("digital-evidence"));
        assert_eq!(got.completed_stages, vec!["client-interview"]);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn local_copy_written_whatever_the_remote_does() {
        for script in [
            Script::Record(remote_record("court-hearing")),
            Script::Status(401),
            Script::Status(503),
            Script::Garbage,
        ] {
            let (store, local) = adapter(ScriptedRemote::new(script), Some("tok"));
            let patch = interview_done().score(55.0).time_spent(30);
            store.save("s1", patch).await;

            let stored = local_json(&local, "s1");
            assert_eq!(stored["scenarioId"], "s1");
            assert_eq!(stored["currentStage"], "digital-evidence");
            assert_eq!(stored["completedStages"][0], "client-interview");
            assert_eq!(stored["assessmentScore"], 55.0);
            assert_eq!(stored["totalTimeSpent"], 30);
            assert!(stored["timestamp"].is_string());
        }
    }

    #[tokio::test]
    async fn save_replaces_rather_than_merges() {
        let (store, local) = adapter(ScriptedRemote::new(Script::Empty), None);
        store.save("s1", interview_done().score(40.0)).await;
        store.save("s1", ProgressPatch::default().stage("bail-draft")).await;

        let stored = local_json(&local, "s1");
        assert_eq!(stored["currentStage"], "bail-draft");
        assert!(stored.get("assessmentScore").is_none());
        assert!(stored.get("completedStages").is_none());
    }

    #[tokio::test]
    async fn rejected_credential_on_save_returns_local_record() {
        let (store, _) = adapter(ScriptedRemote::new(Script::Status(401)), Some("stale"));
        let saved = store.save("s1", interview_done()).await;
        assert_eq!(saved.fallback_reason(), Some(&FallbackReason::Unauthorized));
        assert!(saved.is_degraded());
        let value = saved.into_value();
        assert_eq!(value.scenario_id, "s1");
        assert_eq!(value.current_stage.as_deref(), Some("digital-evidence"));
    }

    #[tokio::test]
    async fn successful_save_returns_remote_record() {
        let remote = ScriptedRemote::new(Script::Record(remote_record("court-hearing")));
        let (store, _) = adapter(remote.clone(), Some("tok"));
        let saved = store.save("s1", interview_done()).await;
        assert!(saved.is_remote());
        assert_eq!(saved.value().current_stage.as_deref(), Some("court-hearing"));
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn score_is_sent_as_score_and_read_back_as_assessment_score() {
        let remote = ScriptedRemote::new(Script::Record(remote_record("completed")));
        let (store, _) = adapter(remote.clone(), Some("tok"));

        store.save("s1", ProgressPatch::default().score(87.0)).await;
        let sent = remote.writes.lock().unwrap()[0].clone();
        assert_eq!(sent["score"], 87.0);
        assert_eq!(sent["scenarioId"], "s1");
        assert!(sent.get("assessmentScore").is_none());

        let got = store.get("s1").await;
        assert!(got.is_remote());
        assert_eq!(got.into_value().unwrap().assessment_score, Some(87.0));
    }

    #[tokio::test]
    async fn not_found_on_get_reads_local() {
        let (store, local) = adapter(ScriptedRemote::new(Script::Status(404)), Some("tok"));
        let got = store.get("s1").await;
        assert_eq!(got.fallback_reason(), Some(&FallbackReason::NotFound));
        assert_eq!(got.into_value(), None);

        let record = mapping::local_record("s1", interview_done(), Utc::now());
        local
            .set(&progress_key("s1"), &serde_json::to_string(&record).unwrap())
            .unwrap();
        let got = store.get("s1").await.into_value().unwrap();
        assert_eq!(got.current_stage.as_deref(), Some("digital-evidence"));
    }

    #[tokio::test]
    async fn offline_progress_survives_first_signed_in_read() {
        let remote = ScriptedRemote::new(Script::Empty);
        let local = Arc::new(MemoryStore::new());
        let offline = ProgressStore::new(local.clone(), remote.clone(), Arc::new(StaticToken::none()));
        offline.save("s1", interview_done()).await;

        let online = ProgressStore::new(local, remote, Arc::new(StaticToken::bearer("fresh")));
        let got = online.get("s1").await;
        assert_eq!(got.fallback_reason(), Some(&FallbackReason::EmptyRemote));
        let value = got.into_value().expect("local progress should be served");
        assert_eq!(value.completed_stages, vec!["client-interview"]);
    }

    #[tokio::test]
    async fn get_all_skips_corrupt_local_entries() {
        let (store, local) = adapter(ScriptedRemote::new(Script::Empty), None);
        store.save("valid", interview_done()).await;
        local.set(&progress_key("broken"), "{ not json").unwrap();
        local.set(&progress_key("anonymous"), r#"{"currentStage":"x"}"#).unwrap();
        local.set("unrelated", "{}").unwrap();

        let all = store.get_all().await.into_value();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].scenario_id, "valid");
    }

    #[tokio::test]
    async fn get_all_remaps_remote_records() {
        let remote = ScriptedRemote::new(Script::Record(remote_record("bail-draft")));
        let (store, _) = adapter(remote, Some("tok"));
        let all = store.get_all().await;
        assert!(all.is_remote());
        let all = all.into_value();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].current_stage.as_deref(), Some("bail-draft"));
        assert_eq!(all[0].total_time_spent, 120);
    }

    #[tokio::test]
    async fn get_all_falls_back_on_empty_remote() {
        let (store, local) = adapter(ScriptedRemote::new(Script::Empty), Some("tok"));
        let record = mapping::local_record("s9", interview_done(), Utc::now());
        local
            .set(&progress_key("s9"), &serde_json::to_string(&record).unwrap())
            .unwrap();
        let all = store.get_all().await;
        assert_eq!(all.fallback_reason(), Some(&FallbackReason::EmptyRemote));
        assert_eq!(all.into_value().len(), 1);
    }

    #[tokio::test]
    async fn network_failure_resolves_for_every_operation() {
        let remote = Arc::new(ProgressClient::new("http://127.0.0.1:1").unwrap());
        let (store, _) = adapter(remote, Some("tok"));

        let saved = store.save("s1", interview_done()).await;
        assert!(matches!(saved.fallback_reason(), Some(FallbackReason::Network(_))));

        let got = store.get("s1").await;
        assert!(matches!(got.fallback_reason(), Some(FallbackReason::Network(_))));
        assert!(got.into_value().is_some());

        let all = store.get_all().await;
        assert!(matches!(all.fallback_reason(), Some(FallbackReason::Network(_))));
        assert_eq!(all.into_value().len(), 1);
    }

    #[tokio::test]
    async fn malformed_remote_body_degrades() {
        let (store, _) = adapter(ScriptedRemote::new(Script::Garbage), Some("tok"));
        let got = store.get("s1").await;
        assert!(matches!(got.fallback_reason(), Some(FallbackReason::Decode(_))));
    }

    #[tokio::test]
    async fn forget_and_clear_only_touch_progress_keys() {
        let (store, local) = adapter(ScriptedRemote::new(Script::Empty), None);
        store.save("a", interview_done()).await;
        store.save("b", interview_done()).await;
        store.save("c", interview_done()).await;
        local.set("token", "keep-me").unwrap();

        assert!(store.forget_local("a"));
        assert!(!store.forget_local("a"));
        assert_eq!(store.clear_local(), 2);
        assert_eq!(local.keys().unwrap(), vec!["token"]);
    }

    #[tokio::test]
    async fn save_over_corrupt_profile_file_still_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ls.json");
        std::fs::write(&path, "{ truncated").unwrap();
        let local: Arc<dyn LocalStore> = Arc::new(FileStore::open(&path).unwrap());
        let store = ProgressStore::new(
            local.clone(),
            ScriptedRemote::new(Script::Status(500)),
            Arc::new(StaticToken::none()),
        );

        let saved = store.save("s1", ProgressPatch::default().stage("court-hearing")).await;
        assert!(!saved.local_write_failed());
        assert!(local.get(&progress_key("s1")).unwrap().is_some());

        let got = store.get("s1").await.into_value().unwrap();
        assert_eq!(got.current_stage.as_deref(), Some("court-hearing"));
    }

    #[tokio::test]
    async fn failed_local_write_is_reported() {
        let remote = ScriptedRemote::new(Script::Record(remote_record("court-hearing")));
        let creds = Arc::new(StaticToken::none());
        let offline = ProgressStore::new(Arc::new(ReadOnlyStore), remote.clone(), creds);
        let saved = offline.save("s1", interview_done()).await;
        assert_eq!(saved.fallback_reason(), Some(&FallbackReason::NoCredential));
        assert!(saved.local_write_failed());
        assert!(saved.is_degraded());
        assert_eq!(saved.value().current_stage.as_deref(), Some("digital-evidence"));

        let online = ProgressStore::new(Arc::new(ReadOnlyStore), remote, Arc::new(StaticToken::bearer("tok")));
        let saved = online.save("s1", interview_done()).await;
        assert!(saved.is_remote());
        assert!(saved.is_degraded());
        let json = serde_json::to_value(&saved).unwrap();
        assert_eq!(json["source"], "remote");
        assert!(json["local_write_error"].as_str().unwrap().contains("quota exceeded"));
    }

    #[test]
    fn served_serializes_with_source_tag() {
        let served = Served::local(1, FallbackReason::Status(502));
        let json = serde_json::to_value(&served).unwrap();
        assert_eq!(json["source"], "local");
        assert_eq!(json["reason"]["kind"], "status");
        assert_eq!(json["reason"]["detail"], 502);
    }
}
