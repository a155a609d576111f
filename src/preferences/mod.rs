//! Preference persistence.
//!
//! A report's composition, filters and sort are saved as a
//! [`PreferenceRecord`] under its report id. The local store is
//! authoritative; the remote backup is advisory and fails independently.

mod local;
mod record;
mod remote;
mod store;

pub use local::{LocalStore, SqlitePreferenceStore, StoreError, StoreResult};
pub use record::{PreferenceRecord, TablePreference};
pub use remote::{BackupError, DirectoryBackup, MemoryBackup, RemoteBackup, UnavailableBackup};
pub use store::{BackupStatus, LoadSource, LoadedPreferences, PreferenceStore, SaveReceipt};
