//! On-disk archive of HTTP exchanges.
//!
//! A recording transport stores every successful exchange as a JSON file; a
//! replaying transport answers requests from those files without touching the
//! network. Files are keyed by a SHA-256 digest of method, URL and payload.

use super::transport::Transport;
use super::types::{Method, Payload, Response};
use crate::error::{LiferayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One stored request/response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedExchange {
    pub method: Method,
    pub url: String,
    pub payload: Option<Payload>,
    pub response: Response,
    pub recorded_at: DateTime<Utc>,
}

/// Directory of archived exchanges
pub struct Archive {
    /// Root archive directory
    dir: PathBuf,
}

impl Archive {
    /// Open an archive directory, creating it if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            LiferayError::Archive(format!("failed to create {}: {}", dir.display(), e))
        })?;
        info!(archive_dir = %dir.display(), "Archive opened");
        Ok(Self { dir })
    }

    /// Key identifying an exchange
    pub fn key_for(method: Method, url: &str, payload: Option<&Payload>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
        if let Some(payload) = payload {
            // Map keys are sorted, so the encoding is stable
            hasher.update(serde_json::Value::Object(payload.clone()).to_string().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Look up a stored exchange
    pub fn load(&self, key: &str) -> Result<Option<ArchivedExchange>> {
        let path = self.entry_path(key);
        if !path.exists() {
            debug!(key = key, "Archive miss");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            LiferayError::Archive(format!("failed to read {}: {}", path.display(), e))
        })?;
        let exchange = serde_json::from_str(&content).map_err(|e| {
            LiferayError::Archive(format!("failed to decode {}: {}", path.display(), e))
        })?;

        debug!(key = key, "Archive hit");
        Ok(Some(exchange))
    }

    /// Store an exchange, replacing any previous recording of the same request
    pub fn store(&self, exchange: &ArchivedExchange) -> Result<()> {
        let key = Self::key_for(exchange.method, &exchange.url, exchange.payload.as_ref());
        let path = self.entry_path(&key);

        let content = serde_json::to_string_pretty(exchange)
            .map_err(|e| LiferayError::Archive(format!("failed to encode exchange: {}", e)))?;
        std::fs::write(&path, content).map_err(|e| {
            LiferayError::Archive(format!("failed to write {}: {}", path.display(), e))
        })?;

        debug!(key = %key, url = %exchange.url, "Exchange archived");
        Ok(())
    }

    /// Number of stored exchanges
    pub fn entry_count(&self) -> Result<usize> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            LiferayError::Archive(format!("failed to list {}: {}", self.dir.display(), e))
        })?;
        Ok(entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .count())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

/// Forwards requests to a live transport and archives the responses
pub struct RecordingTransport<T> {
    inner: T,
    archive: Archive,
}

impl<T: Transport> RecordingTransport<T> {
    pub fn new(inner: T, archive: Archive) -> Self {
        Self { inner, archive }
    }
}

#[async_trait]
impl<T: Transport> Transport for RecordingTransport<T> {
    async fn fetch(
        &self,
        url: &str,
        method: Method,
        payload: Option<&Payload>,
    ) -> Result<Response> {
        let response = self.inner.fetch(url, method, payload).await?;
        self.archive.store(&ArchivedExchange {
            method,
            url: url.to_string(),
            payload: payload.cloned(),
            response: response.clone(),
            recorded_at: Utc::now(),
        })?;
        Ok(response)
    }
}

/// Answers requests from the archive only
pub struct ReplayTransport {
    archive: Archive,
}

impl ReplayTransport {
    pub fn new(archive: Archive) -> Self {
        Self { archive }
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn fetch(
        &self,
        url: &str,
        method: Method,
        payload: Option<&Payload>,
    ) -> Result<Response> {
        let key = Archive::key_for(method, url, payload);
        match self.archive.load(&key)? {
            Some(exchange) => Ok(exchange.response),
            None => Err(LiferayError::Archive(format!(
                "no archived response for {} {}",
                method, url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    const URL: &str = "http://liferay.test/api/jsonws/blogs.blogsentry/get-group-entries";

    fn page_payload(start: u64) -> Payload {
        json!({"groupId": 10, "categoryId": 0, "status": 0, "start": start, "end": start + 2})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_key_depends_on_every_part() {
        let first = Archive::key_for(Method::Post, URL, Some(&page_payload(0)));
        assert_eq!(first, Archive::key_for(Method::Post, URL, Some(&page_payload(0))));
        assert_ne!(first, Archive::key_for(Method::Post, URL, Some(&page_payload(2))));
        assert_ne!(first, Archive::key_for(Method::Get, URL, Some(&page_payload(0))));
        assert_ne!(first, Archive::key_for(Method::Post, URL, None));
        assert_eq!(first.len(), 64);
    }

    #[tokio::test]
    async fn test_record_then_replay() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let live = Arc::new(ScriptedTransport::new());
        live.respond(Method::Post, URL, r#"[{"entryId": 1}]"#);
        live.respond(Method::Post, URL, r#"[{"entryId": 2}]"#);

        let recorder = RecordingTransport::new(live.clone(), Archive::open(temp_dir.path())?);
        let first = recorder.fetch(URL, Method::Post, Some(&page_payload(0))).await?;
        let second = recorder.fetch(URL, Method::Post, Some(&page_payload(2))).await?;
        assert_eq!(live.requests().len(), 2);

        let archive = Archive::open(temp_dir.path())?;
        assert_eq!(archive.entry_count()?, 2);

        let replay = ReplayTransport::new(archive);
        assert_eq!(replay.fetch(URL, Method::Post, Some(&page_payload(0))).await?, first);
        assert_eq!(replay.fetch(URL, Method::Post, Some(&page_payload(2))).await?, second);

        Ok(())
    }

    #[tokio::test]
    async fn test_replay_miss_is_an_archive_error() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let replay = ReplayTransport::new(Archive::open(temp_dir.path())?);
        assert_eq!(replay.archive.entry_count()?, 0);

        let result = replay.fetch(URL, Method::Get, None).await;
        assert!(matches!(result, Err(LiferayError::Archive(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_exchanges_are_not_recorded() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let recorder = RecordingTransport::new(
            ScriptedTransport::new(),
            Archive::open(temp_dir.path())?,
        );

        assert!(recorder.fetch(URL, Method::Get, None).await.is_err());
        assert_eq!(recorder.archive.entry_count()?, 0);
        Ok(())
    }
}
