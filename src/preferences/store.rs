//! Two-tier preference store.
//!
//! ```text
//! save ──► local (sync, required) ──► remote (spawned, advisory)
//!                                          │
//!                                          ▼
//!                                   BackupStatus watch
//!
//! load ──► local ──miss──► remote ──miss/fail──► default
//!                            │
//!                            └─hit──► written through to local
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::local::LocalStore;
use super::record::PreferenceRecord;
use super::remote::RemoteBackup;
use crate::error::{ReportError, ReportResult};

/// Outcome of the most recent remote backup write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    /// No backup attempted yet, or no backup configured.
    Idle,
    Pending,
    Synced,
    Failed(String),
}

/// Where a loaded record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Local,
    Remote,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPreferences {
    pub record: PreferenceRecord,
    pub source: LoadSource,
}

/// Handed back once the local write succeeded.
#[derive(Debug)]
pub struct SaveReceipt {
    pub fingerprint: String,
    backup: Option<JoinHandle<ReportResult<()>>>,
}

impl SaveReceipt {
    /// Whether a remote write was started for this save.
    pub fn backup_started(&self) -> bool {
        self.backup.is_some()
    }

    /// Wait for the remote write started by this save, if any.
    ///
    /// Callers never need to; the save already succeeded.
    pub async fn backup_outcome(self) -> Option<ReportResult<()>> {
        let handle = self.backup?;
        Some(match handle.await {
            Ok(result) => result,
            Err(e) => Err(ReportError::RemoteBackupFailure(e.to_string())),
        })
    }
}

/// Remote writes of one report run one at a time, and only the newest runs.
#[derive(Default)]
struct ReportWrites {
    latest: AtomicU64,
    lock: Mutex<()>,
}

impl ReportWrites {
    fn is_latest(&self, sequence: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == sequence
    }
}

/// Local store plus optional remote backup behind one interface.
pub struct PreferenceStore {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteBackup>>,
    status: Arc<watch::Sender<BackupStatus>>,
    sequence: AtomicU64,
    /// Sequence of the latest save's remote write; older writes never report status.
    latest_write: Arc<AtomicU64>,
    writes: DashMap<String, Arc<ReportWrites>>,
}

impl PreferenceStore {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        let (status, _) = watch::channel(BackupStatus::Idle);
        Self {
            local,
            remote: None,
            status: Arc::new(status),
            sequence: AtomicU64::new(0),
            latest_write: Arc::new(AtomicU64::new(0)),
            writes: DashMap::new(),
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteBackup>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn status(&self) -> BackupStatus {
        self.status.borrow().clone()
    }

    /// Watch backup status changes.
    pub fn subscribe(&self) -> watch::Receiver<BackupStatus> {
        self.status.subscribe()
    }

    /// Save a record.
    ///
    /// The local write must succeed or the save fails with
    /// `LocalPersistFailure`. The remote write is then started in the
    /// background and only updates the backup status. A remote write that
    /// a newer save of the same report overtakes is skipped. Without a
    /// running tokio runtime the remote write is skipped.
    pub fn save(&self, record: &PreferenceRecord) -> ReportResult<SaveReceipt> {
        if record.selected_column_count() == 0 {
            return Err(ReportError::InvalidComposition(
                "cannot save a report without selected columns".to_string(),
            ));
        }
        let fingerprint = record
            .fingerprint()
            .map_err(|e| ReportError::LocalPersistFailure(e.to_string()))?;

        self.local.put(record).map_err(|e| {
            tracing::error!(report_id = %record.report_id, error = %e, "local preference write failed");
            ReportError::LocalPersistFailure(e.to_string())
        })?;
        tracing::debug!(report_id = %record.report_id, "preferences saved locally");

        let backup = self.spawn_backup(record);
        Ok(SaveReceipt {
            fingerprint,
            backup,
        })
    }

    fn spawn_backup(&self, record: &PreferenceRecord) -> Option<JoinHandle<ReportResult<()>>> {
        let remote = Arc::clone(self.remote.as_ref()?);
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(report_id = %record.report_id, "no async runtime, remote backup skipped");
                return None;
            }
        };

        let (sequence, writes) = self.next_write(&record.report_id);
        self.latest_write.fetch_max(sequence, Ordering::SeqCst);
        self.status.send_replace(BackupStatus::Pending);

        let status = Arc::clone(&self.status);
        let latest = Arc::clone(&self.latest_write);
        let record = record.clone();
        Some(runtime.spawn(async move {
            let _turn = writes.lock.lock().await;
            let result = if writes.is_latest(sequence) {
                remote.upsert(&record).await
            } else {
                tracing::debug!(report_id = %record.report_id, "superseded remote backup skipped");
                Ok(())
            };
            let current = latest.load(Ordering::SeqCst) == sequence;
            match result {
                Ok(()) => {
                    if current {
                        status.send_replace(BackupStatus::Synced);
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(report_id = %record.report_id, error = %e, "remote backup failed");
                    if current {
                        status.send_replace(BackupStatus::Failed(e.to_string()));
                    }
                    Err(ReportError::RemoteBackupFailure(e.to_string()))
                }
            }
        }))
    }

    fn next_write(&self, report_id: &str) -> (u64, Arc<ReportWrites>) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let writes = self.writes.entry(report_id.to_string()).or_default().value().clone();
        writes.latest.fetch_max(sequence, Ordering::SeqCst);
        (sequence, writes)
    }

    /// Load the record for a report.
    ///
    /// Never fails: a local miss falls back to the remote backup, and a
    /// remote miss or failure falls back to the default record for
    /// `primary_table`.
    pub async fn load(&self, report_id: &str, primary_table: &str) -> LoadedPreferences {
        match self.local.get(report_id) {
            Ok(Some(record)) => {
                return LoadedPreferences {
                    record,
                    source: LoadSource::Local,
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(report_id, error = %e, "local preference read failed");
            }
        }

        if let Some(remote) = &self.remote {
            match remote.fetch(report_id).await {
                Ok(Some(record)) if record.report_id != report_id => {
                    tracing::warn!(
                        report_id,
                        found = %record.report_id,
                        "remote backup returned another report's preferences"
                    );
                }
                Ok(Some(record)) => {
                    if let Err(e) = self.local.put(&record) {
                        tracing::warn!(report_id, error = %e, "could not cache restored preferences locally");
                    }
                    tracing::info!(report_id, "preferences restored from remote backup");
                    return LoadedPreferences {
                        record,
                        source: LoadSource::Remote,
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(report_id, error = %e, "remote preference read failed");
                }
            }
        }

        tracing::info!(report_id, "no saved preferences, using defaults");
        LoadedPreferences {
            record: PreferenceRecord::default_for(report_id, primary_table),
            source: LoadSource::Default,
        }
    }

    /// Delete a report's record locally and, in the background, remotely.
    ///
    /// Returns true if a local record existed.
    pub fn clear(&self, report_id: &str) -> ReportResult<bool> {
        let existed = self
            .local
            .delete(report_id)
            .map_err(|e| ReportError::LocalPersistFailure(e.to_string()))?;

        if let (Some(remote), Ok(runtime)) =
            (self.remote.clone(), tokio::runtime::Handle::try_current())
        {
            // queued behind pending writes, and cancels them
            let (_, writes) = self.next_write(report_id);
            let report_id = report_id.to_string();
            runtime.spawn(async move {
                let _turn = writes.lock.lock().await;
                if let Err(e) = remote.remove(&report_id).await {
                    tracing::warn!(report_id = %report_id, error = %e, "remote backup delete failed");
                }
            });
        }
        Ok(existed)
    }

    /// Copy the locally saved record of `from` under the id `to`.
    ///
    /// Returns `None` when `from` has no saved record.
    pub fn copy(&self, from: &str, to: &str) -> ReportResult<Option<SaveReceipt>> {
        let record = self
            .local
            .get(from)
            .map_err(|e| ReportError::LocalPersistFailure(e.to_string()))?;
        match record {
            Some(mut record) => {
                record.report_id = to.to_string();
                self.save(&record).map(Some)
            }
            None => Ok(None),
        }
    }
}
