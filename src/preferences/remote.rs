//! Remote backup tier.
//!
//! The backup is advisory: it may be slow or unavailable, and nothing in
//! the engine depends on it succeeding.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::record::PreferenceRecord;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backup unavailable: {0}")]
    Unavailable(String),

    #[error("backup for '{requested}' holds the record of '{found}'")]
    ReportMismatch { requested: String, found: String },
}

/// Best-effort copy of preference records, keyed by report id.
#[async_trait]
pub trait RemoteBackup: Send + Sync {
    /// Insert or replace the record under its report id.
    async fn upsert(&self, record: &PreferenceRecord) -> Result<(), BackupError>;
    async fn fetch(&self, report_id: &str) -> Result<Option<PreferenceRecord>, BackupError>;
    async fn remove(&self, report_id: &str) -> Result<(), BackupError>;
}

/// Backup to a directory of JSON files, one per report.
///
/// File names are the report id with unsafe characters replaced, followed
/// by a digest of the exact id, so `sales/q1` and `sales_q1` never share a
/// file.
#[derive(Debug, Clone)]
pub struct DirectoryBackup {
    root: PathBuf,
}

impl DirectoryBackup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, report_id: &str) -> PathBuf {
        let readable: String = report_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let digest = Sha256::digest(report_id.as_bytes());
        let suffix: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
        self.root.join(format!("{}-{}.json", readable, suffix))
    }
}

#[async_trait]
impl RemoteBackup for DirectoryBackup {
    async fn upsert(&self, record: &PreferenceRecord) -> Result<(), BackupError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let json = serde_json::to_vec_pretty(record)?;
        let path = self.path_for(&record.report_id);
        // one temp file per write; concurrent writers never share one
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn fetch(&self, report_id: &str) -> Result<Option<PreferenceRecord>, BackupError> {
        let bytes = match tokio::fs::read(self.path_for(report_id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: PreferenceRecord = serde_json::from_slice(&bytes)?;
        if record.report_id != report_id {
            return Err(BackupError::ReportMismatch {
                requested: report_id.to_string(),
                found: record.report_id,
            });
        }
        Ok(Some(record))
    }

    async fn remove(&self, report_id: &str) -> Result<(), BackupError> {
        match tokio::fs::remove_file(self.path_for(report_id)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Backup held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackup {
    records: DashMap<String, PreferenceRecord>,
}

impl MemoryBackup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, report_id: &str) -> Option<PreferenceRecord> {
        self.records.get(report_id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl RemoteBackup for MemoryBackup {
    async fn upsert(&self, record: &PreferenceRecord) -> Result<(), BackupError> {
        self.records.insert(record.report_id.clone(), record.clone());
        Ok(())
    }

    async fn fetch(&self, report_id: &str) -> Result<Option<PreferenceRecord>, BackupError> {
        Ok(self.get(report_id))
    }

    async fn remove(&self, report_id: &str) -> Result<(), BackupError> {
        self.records.remove(report_id);
        Ok(())
    }
}

/// A backup that always fails.
#[derive(Debug, Clone)]
pub struct UnavailableBackup {
    reason: String,
}

impl UnavailableBackup {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RemoteBackup for UnavailableBackup {
    async fn upsert(&self, _record: &PreferenceRecord) -> Result<(), BackupError> {
        Err(BackupError::Unavailable(self.reason.clone()))
    }

    async fn fetch(&self, _report_id: &str) -> Result<Option<PreferenceRecord>, BackupError> {
        Err(BackupError::Unavailable(self.reason.clone()))
    }

    async fn remove(&self, _report_id: &str) -> Result<(), BackupError> {
        Err(BackupError::Unavailable(self.reason.clone()))
    }
}
