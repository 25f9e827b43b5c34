use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::activity::Activity;
use crate::auth::User;
use crate::config::StorageConfig;
use crate::employees::Employee;
use crate::error::AppResult;
use crate::evaluation::Evaluation;

/// The whole persisted document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub reviews: Vec<Evaluation>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// Read and parse a JSON file
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Serialize `data` and replace `path` with it. Goes through a sibling
/// temp file and a rename so a crash never leaves a half-written document.
pub fn write_json_file<T: Serialize>(path: &Path, data: &T, pretty: bool) -> anyhow::Result<()> {
    let body = if pretty {
        serde_json::to_vec_pretty(data)?
    } else {
        serde_json::to_vec(data)?
    };
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// JSON document store.
///
/// The document is loaded once and served from memory. Every mutation runs
/// on a copy, is written to disk, and only then becomes visible.
pub struct Store {
    path: PathBuf,
    pretty: bool,
    doc: RwLock<Database>,
    write_lock: Mutex<()>,
    writes: AtomicU64,
}

impl Store {
    /// Load the document, creating an empty one (and its directory) if missing
    pub fn open(config: &StorageConfig) -> anyhow::Result<Self> {
        let path = PathBuf::from(&config.path);
        let doc = if path.exists() {
            let db: Database = read_json_file(&path)?;
            info!(
                "Loaded {} ({} employees, {} reviews, {} users)",
                path.display(),
                db.employees.len(),
                db.reviews.len(),
                db.users.len()
            );
            db
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let db = Database::default();
            write_json_file(&path, &db, config.pretty)?;
            info!("Created empty data file {}", path.display());
            db
        };

        Ok(Self {
            path,
            pretty: config.pretty,
            doc: RwLock::new(doc),
            write_lock: Mutex::new(()),
            writes: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read-only query against the document. `f` must not call back
    /// into the store.
    pub fn read<R>(&self, f: impl FnOnce(&Database) -> R) -> R {
        f(&self.doc.read())
    }

    /// Run a mutation and persist it. If `f` fails or the write fails,
    /// nothing changes.
    pub fn write<R>(&self, f: impl FnOnce(&mut Database) -> AppResult<R>) -> AppResult<R> {
        let _guard = self.write_lock.lock();
        let mut next = self.doc.read().clone();
        let result = f(&mut next)?;
        write_json_file(&self.path, &next, self.pretty)?;
        *self.doc.write() = next;
        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!("Persisted {}", self.path.display());
        Ok(result)
    }

    pub fn get_stats(&self) -> serde_json::Value {
        let db = self.doc.read();
        serde_json::json!({
            "path": self.path.display().to_string(),
            "users": db.users.len(),
            "employees": db.employees.len(),
            "reviews": db.reviews.len(),
            "activities": db.activities.len(),
            "total_writes": self.writes.load(Ordering::Relaxed),
        })
    }
}
