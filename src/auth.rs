use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::{AuthConfig, SeedUser};
use crate::error::{AppError, AppResult};
use crate::store::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Hr,
    Evaluator,
    Employee,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hr => "hr",
            Role::Evaluator => "evaluator",
            Role::Employee => "employee",
        }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => &[
                ViewEmployees,
                ManageEmployees,
                CreateReviews,
                EditAllReviews,
                ViewAllReviews,
                DecideReviews,
                DeleteReviews,
                ViewStats,
            ],
            Role::Hr => &[
                ViewEmployees,
                ManageEmployees,
                CreateReviews,
                EditAllReviews,
                ViewAllReviews,
                DecideReviews,
                DeleteReviews,
            ],
            Role::Evaluator => &[ViewEmployees, CreateReviews],
            Role::Employee => &[],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewEmployees,
    ManageEmployees,
    /// Create reviews and edit the ones you authored
    CreateReviews,
    EditAllReviews,
    ViewAllReviews,
    DecideReviews,
    DeleteReviews,
    ViewStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub department: String,
    pub employee_id: Option<String>,
    pub notifications_read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// What the API reveals about an account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
    pub department: String,
    pub employee_id: Option<String>,
    pub permissions: &'static [Permission],
}

impl User {
    pub fn new(seed: &SeedUser, now: DateTime<Utc>) -> Self {
        let salt = random_hex(16);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: seed.email.trim().to_lowercase(),
            password_hash: hash_password(&salt, &seed.password),
            salt,
            role: seed.role,
            name: seed.name.clone(),
            department: seed.department.clone(),
            employee_id: seed.employee_id.clone(),
            notifications_read_at: None,
            created_at: now,
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        let candidate = hash_password(&self.salt, password);
        candidate.as_bytes().ct_eq(self.password_hash.as_bytes()).into()
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.permissions().contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> AppResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(self.role.to_string()))
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
            name: self.name.clone(),
            department: self.department.clone(),
            employee_id: self.employee_id.clone(),
            permissions: self.role.permissions(),
        }
    }
}

/// Salted SHA-256, hex encoded
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// `n` bytes from the OS CSPRNG, hex encoded
pub fn random_hex(n: usize) -> String {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Insert configured accounts whose email is not on file yet.
/// Returns how many were added.
pub fn seed_users(db: &mut Database, seeds: &[SeedUser], now: DateTime<Utc>) -> usize {
    let mut added = 0;
    for seed in seeds {
        let email = seed.email.trim().to_lowercase();
        if db.users.iter().any(|u| u.email == email) {
            continue;
        }
        db.users.push(User::new(seed, now));
        added += 1;
    }
    added
}

pub fn find_by_email<'a>(db: &'a Database, email: &str) -> Option<&'a User> {
    let email = email.trim().to_lowercase();
    db.users.iter().find(|u| u.email == email)
}

struct Session {
    user_id: String,
    expires_at: Instant,
}

/// Active login sessions keyed by bearer token. Memory only; a restart
/// logs everyone out.
pub struct SessionManager {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    issued: AtomicU64,
    expired: AtomicU64,
}

impl SessionManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_ttl(Duration::from_secs(config.session_ttl_secs))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            issued: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session and return its token
    pub fn issue(&self, user_id: &str) -> String {
        let token = random_hex(32);
        self.sessions.insert(
            token.clone(),
            Session {
                user_id: user_id.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        self.issued.fetch_add(1, Ordering::Relaxed);
        token
    }

    /// User id behind a live token. Expired tokens are dropped on sight.
    pub fn resolve(&self, token: &str) -> Option<String> {
        let live = {
            let session = self.sessions.get(token)?;
            if Instant::now() < session.expires_at {
                Some(session.user_id.clone())
            } else {
                None
            }
        };
        if live.is_none() {
            self.sessions.remove(token);
            self.expired.fetch_add(1, Ordering::Relaxed);
        }
        live
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every expired session
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| now < s.expires_at);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            self.expired.fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Swept {} expired sessions", removed);
        }
        removed
    }

    pub fn get_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "active": self.sessions.len(),
            "ttl_secs": self.ttl.as_secs(),
            "total_issued": self.issued.load(Ordering::Relaxed),
            "total_expired": self.expired.load(Ordering::Relaxed),
        })
    }
}
