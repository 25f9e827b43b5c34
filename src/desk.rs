use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::activity::{Activity, ActivityKind, ActivityLog, Notifications};
use crate::auth::{self, Permission, SessionManager, User, UserProfile};
use crate::config::Config;
use crate::dashboard;
use crate::employees::{self, Employee, EmployeeFilter, EmployeePatch, NewEmployee};
use crate::error::{AppError, AppResult};
use crate::evaluation::{Decision, DetailsPatch, Evaluation, FormStep, StepUpdate};
use crate::report;
use crate::reviews::{self, ReviewFilter};
use crate::store::{Database, Store};

/// Core service - every API operation goes through here
pub struct ReviewDesk {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub sessions: Arc<SessionManager>,
    pub activity: Arc<ActivityLog>,
}

/// Successful login
#[derive(Debug, Clone, serde::Serialize)]
pub struct Login {
    pub token: String,
    pub user: UserProfile,
}

impl ReviewDesk {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let store = Arc::new(Store::open(&config.storage)?);
        let sessions = Arc::new(SessionManager::new(&config.auth));
        let activity = Arc::new(ActivityLog::new(&config.activity));

        let seeds = &config.auth.users;
        let added = store
            .write(|db| Ok(auth::seed_users(db, seeds, Utc::now())))
            .map_err(|e| anyhow::anyhow!("seeding users: {}", e))?;
        if added > 0 {
            info!("👤 Seeded {} user account(s)", added);
        }
        if store.read(|db| db.users.is_empty()) {
            warn!("No user accounts configured; nobody can log in");
        }

        Ok(Self {
            config,
            store,
            sessions,
            activity,
        })
    }

    /// Session sweeper loop - periodically drop expired logins
    pub async fn run_session_sweeper(&self) {
        let interval = std::time::Duration::from_secs(self.config.auth.sweep_interval_secs.max(1));
        info!("Session sweeper started (interval: {:?})", interval);

        loop {
            tokio::time::sleep(interval).await;
            let removed = self.sessions.sweep();
            if removed > 0 {
                debug!("Session sweeper removed {} session(s)", removed);
            }
        }
    }

    // ---- auth ----

    pub fn login(&self, email: &str, password: &str) -> AppResult<Login> {
        let user = self
            .store
            .read(|db| auth::find_by_email(db, email).cloned())
            .filter(|u| u.verify_password(password));
        let Some(user) = user else {
            warn!("Failed login for {}", email.trim());
            return Err(AppError::InvalidCredentials);
        };
        let token = self.sessions.issue(&user.id);
        info!("🔑 {} logged in as {}", user.email, user.role);
        Ok(Login {
            token,
            user: user.profile(),
        })
    }

    /// Current account behind a bearer token
    pub fn authenticate(&self, token: &str) -> AppResult<User> {
        let user_id = self.sessions.resolve(token).ok_or(AppError::Unauthorized)?;
        self.store
            .read(|db| db.users.iter().find(|u| u.id == user_id).cloned())
            .ok_or(AppError::Unauthorized)
    }

    pub fn logout(&self, token: &str) {
        if self.sessions.revoke(token) {
            debug!("Session revoked");
        }
    }

    // ---- employees ----

    pub fn list_employees(&self, actor: &User, filter: &EmployeeFilter) -> AppResult<Vec<Employee>> {
        actor.require(Permission::ViewEmployees)?;
        Ok(self.store.read(|db| employees::list(db, filter)))
    }

    /// Employees may read their own record
    pub fn get_employee(&self, actor: &User, id: &str) -> AppResult<Employee> {
        if !actor.can(Permission::ViewEmployees) && actor.employee_id.as_deref() != Some(id) {
            return Err(AppError::Forbidden(actor.role.to_string()));
        }
        self.store.read(|db| employees::get(db, id).cloned())
    }

    pub fn create_employee(&self, actor: &User, input: NewEmployee) -> AppResult<Employee> {
        actor.require(Permission::ManageEmployees)?;
        let employee = self.store.write(|db| {
            let now = Utc::now();
            let employee = employees::create(db, input, now)?;
            let message = format!("{} added employee {}", actor.name, employee.name);
            self.activity.record(
                db,
                Activity::new(ActivityKind::EmployeeCreated, actor, message, now).employee(&employee.id),
            );
            Ok(employee)
        })?;
        info!("Employee {} created ({})", employee.name, employee.id);
        Ok(employee)
    }

    pub fn update_employee(&self, actor: &User, id: &str, patch: EmployeePatch) -> AppResult<Employee> {
        actor.require(Permission::ManageEmployees)?;
        self.store.write(|db| {
            let now = Utc::now();
            let employee = employees::update(db, id, patch, now)?;
            let message = format!("{} updated employee {}", actor.name, employee.name);
            self.activity.record(
                db,
                Activity::new(ActivityKind::EmployeeUpdated, actor, message, now).employee(&employee.id),
            );
            Ok(employee)
        })
    }

    pub fn delete_employee(&self, actor: &User, id: &str) -> AppResult<Employee> {
        actor.require(Permission::ManageEmployees)?;
        let employee = self.store.write(|db| {
            let now = Utc::now();
            let employee = employees::delete(db, id)?;
            let message = format!("{} removed employee {}", actor.name, employee.name);
            self.activity.record(
                db,
                Activity::new(ActivityKind::EmployeeDeleted, actor, message, now).employee(&employee.id),
            );
            Ok(employee)
        })?;
        info!("Employee {} deleted", employee.id);
        Ok(employee)
    }

    // ---- reviews ----

    pub fn list_reviews(&self, actor: &User, filter: &ReviewFilter) -> Vec<Evaluation> {
        self.store.read(|db| reviews::list(db, actor, filter))
    }

    pub fn recent_reviews(&self, actor: &User) -> Vec<Evaluation> {
        self.store.read(|db| reviews::recent(db, actor))
    }

    pub fn get_review(&self, actor: &User, id: &str) -> AppResult<Evaluation> {
        self.store.read(|db| reviews::get(db, actor, id).cloned())
    }

    pub fn create_review(
        &self,
        actor: &User,
        employee_id: &str,
        details: Option<DetailsPatch>,
    ) -> AppResult<Evaluation> {
        let review = self.store.write(|db| {
            let now = Utc::now();
            let review = reviews::create(db, actor, employee_id, details, now)?;
            let message = format!("{} started a review for {}", actor.name, employee_name(db, employee_id));
            self.activity.record(
                db,
                Activity::new(ActivityKind::ReviewCreated, actor, message, now)
                    .employee(employee_id)
                    .review(&review.id, &review.evaluator_id),
            );
            Ok(review)
        })?;
        info!("📝 Review {} started by {}", review.id, actor.email);
        Ok(review)
    }

    /// Save one wizard page. Drafts are not logged to the feed.
    pub fn update_step(&self, actor: &User, id: &str, step: FormStep, update: StepUpdate) -> AppResult<Evaluation> {
        self.store
            .write(|db| reviews::update_step(db, actor, id, step, update, Utc::now()))
    }

    pub fn submit_review(&self, actor: &User, id: &str) -> AppResult<Evaluation> {
        let review = self.store.write(|db| {
            let now = Utc::now();
            let review = reviews::submit(db, actor, id, now)?;
            let message = format!(
                "{} submitted the review for {} ({})",
                actor.name,
                employee_name(db, &review.employee_id),
                score_text(&review)
            );
            self.activity.record(
                db,
                Activity::new(ActivityKind::ReviewSubmitted, actor, message, now)
                    .employee(&review.employee_id)
                    .review(&review.id, &review.evaluator_id),
            );
            Ok(review)
        })?;
        info!("📨 Review {} submitted, final score {}", review.id, score_text(&review));
        Ok(review)
    }

    pub fn decide_review(
        &self,
        actor: &User,
        id: &str,
        decision: Decision,
        hr_comments: String,
    ) -> AppResult<Evaluation> {
        let review = self.store.write(|db| {
            let now = Utc::now();
            let review = reviews::decide(db, actor, id, decision, hr_comments, now)?;
            let (kind, verb) = match decision {
                Decision::Completed => (ActivityKind::ReviewCompleted, "approved"),
                Decision::Rejected => (ActivityKind::ReviewRejected, "rejected"),
            };
            let message = format!(
                "{} {} the review for {}",
                actor.name,
                verb,
                employee_name(db, &review.employee_id)
            );
            self.activity.record(
                db,
                Activity::new(kind, actor, message, now)
                    .employee(&review.employee_id)
                    .review(&review.id, &review.evaluator_id),
            );
            Ok(review)
        })?;
        info!("✅ Review {} is now {}", review.id, review.status);
        Ok(review)
    }

    pub fn delete_review(&self, actor: &User, id: &str) -> AppResult<Evaluation> {
        let review = self.store.write(|db| {
            let now = Utc::now();
            let review = reviews::delete(db, actor, id)?;
            let message = format!(
                "{} deleted a review for {}",
                actor.name,
                employee_name(db, &review.employee_id)
            );
            self.activity.record(
                db,
                Activity::new(ActivityKind::ReviewDeleted, actor, message, now)
                    .employee(&review.employee_id)
                    .review(&review.id, &review.evaluator_id),
            );
            Ok(review)
        })?;
        info!("Review {} deleted", review.id);
        Ok(review)
    }

    /// Printable HTML for a submitted review
    pub fn report(&self, actor: &User, id: &str) -> AppResult<String> {
        self.store.read(|db| {
            let review = reviews::get(db, actor, id)?;
            if review.is_draft() {
                return Err(AppError::Conflict("drafts have no report yet".to_string()));
            }
            let employee = employees::get(db, &review.employee_id).ok();
            let evaluator = db.users.iter().find(|u| u.id == review.evaluator_id);
            Ok(report::render(review, employee, evaluator))
        })
    }

    // ---- feed ----

    pub fn dashboard(&self, actor: &User) -> serde_json::Value {
        self.store.read(|db| dashboard::for_user(db, actor))
    }

    pub fn activities(&self, actor: &User, kind: Option<ActivityKind>, limit: Option<usize>) -> Vec<Activity> {
        self.store.read(|db| self.activity.search(db, actor, kind, limit))
    }

    pub fn notifications(&self, actor: &User, limit: Option<usize>) -> Notifications {
        self.store.read(|db| self.activity.notifications(db, actor, limit))
    }

    pub fn mark_notifications_read(&self, actor: &User) -> AppResult<Notifications> {
        self.store.write(|db| {
            let user = db
                .users
                .iter_mut()
                .find(|u| u.id == actor.id)
                .ok_or(AppError::Unauthorized)?;
            user.notifications_read_at = Some(Utc::now());
            let user = user.clone();
            Ok(self.activity.notifications(db, &user, None))
        })
    }

    /// Get stats for operators
    pub fn get_stats(&self, actor: &User) -> AppResult<serde_json::Value> {
        actor.require(Permission::ViewStats)?;
        // Store::get_stats takes its own read lock; never call it inside read()
        let store = self.store.get_stats();
        let activity = self.store.read(|db| self.activity.get_stats(db));
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "store": store,
            "sessions": self.sessions.get_stats(),
            "activity": activity,
        }))
    }
}

fn employee_name(db: &Database, id: &str) -> String {
    employees::get(db, id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|_| "an unknown employee".to_string())
}

fn score_text(review: &Evaluation) -> String {
    match &review.score_card {
        Some(card) => format!("{:.2}", card.final_score),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::SeedUser;
    use crate::employees::sample;
    use tempfile::TempDir;

    fn seed(email: &str, role: Role) -> SeedUser {
        SeedUser {
            email: email.to_string(),
            password: "secret".to_string(),
            role,
            name: format!("{} user", role),
            department: String::new(),
            employee_id: None,
        }
    }

    fn desk(dir: &TempDir) -> ReviewDesk {
        let mut config = Config::default();
        config.storage.path = dir.path().join("db.json").display().to_string();
        config.auth.users = vec![
            seed("hr@example.com", Role::Hr),
            seed("eval@example.com", Role::Evaluator),
            seed("admin@example.com", Role::Admin),
        ];
        ReviewDesk::new(Arc::new(config)).unwrap()
    }

    fn login(desk: &ReviewDesk, email: &str) -> User {
        let login = desk.login(email, "secret").unwrap();
        desk.authenticate(&login.token).unwrap()
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let dir = TempDir::new().unwrap();
        drop(desk(&dir));
        let desk = desk(&dir);
        assert_eq!(desk.store.read(|db| db.users.len()), 3);
    }

    #[test]
    fn test_login_and_logout() {
        let dir = TempDir::new().unwrap();
        let desk = desk(&dir);
        assert!(matches!(desk.login("hr@example.com", "nope"), Err(AppError::InvalidCredentials)));
        assert!(matches!(desk.login("ghost@example.com", "secret"), Err(AppError::InvalidCredentials)));

        let login = desk.login("HR@example.com ", "secret").unwrap();
        assert_eq!(login.user.role, Role::Hr);
        assert!(desk.authenticate(&login.token).is_ok());
        desk.logout(&login.token);
        assert!(matches!(desk.authenticate(&login.token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_review_flow_records_activity() {
        let dir = TempDir::new().unwrap();
        let desk = desk(&dir);
        let hr = login(&desk, "hr@example.com");
        let evaluator = login(&desk, "eval@example.com");

        let emp = desk.create_employee(&hr, sample("Ana Cruz", "Sales")).unwrap();
        let details = DetailsPatch {
            immediate_supervisor: Some("Maria Santos".into()),
            performance_coverage: Some("Q1".into()),
            ..Default::default()
        };
        let review = desk.create_review(&evaluator, &emp.id, Some(details)).unwrap();
        assert!(matches!(desk.report(&hr, &review.id), Err(AppError::Conflict(_))));
        desk.submit_review(&evaluator, &review.id).unwrap();

        assert_eq!(desk.notifications(&hr, None).unread, 1);
        let bell = desk.mark_notifications_read(&hr).unwrap();
        assert_eq!(bell.unread, 0);

        desk.decide_review(&hr, &review.id, Decision::Completed, "Fine".into()).unwrap();
        assert_eq!(desk.notifications(&evaluator, None).unread, 1);

        let kinds: Vec<ActivityKind> = desk.activities(&hr, None, None).iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::ReviewCompleted,
                ActivityKind::ReviewSubmitted,
                ActivityKind::ReviewCreated,
                ActivityKind::EmployeeCreated,
            ]
        );
        assert!(desk.report(&hr, &review.id).unwrap().contains("Ana Cruz"));
        assert!(matches!(desk.delete_employee(&hr, &emp.id), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_stats_admin_only() {
        let dir = TempDir::new().unwrap();
        let desk = desk(&dir);
        let hr = login(&desk, "hr@example.com");
        let admin = login(&desk, "admin@example.com");
        assert!(matches!(desk.get_stats(&hr), Err(AppError::Forbidden(_))));
        let stats = desk.get_stats(&admin).unwrap();
        assert_eq!(stats["store"]["users"], 3);
        assert_eq!(stats["sessions"]["active"], 2);
    }

    #[test]
    fn test_stats_while_writing() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::mpsc;
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let desk = Arc::new(desk(&dir));
        let hr = login(&desk, "hr@example.com");
        let admin = login(&desk, "admin@example.com");
        let done = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let writer = {
            let desk = desk.clone();
            let done = done.clone();
            let tx = tx.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    desk.create_employee(&hr, sample(&format!("Worker {}", i), "Ops")).unwrap();
                }
                done.store(true, Ordering::SeqCst);
                tx.send("writer").unwrap();
            })
        };
        let reader = {
            let desk = desk.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut polls = 0u32;
                while !done.load(Ordering::SeqCst) {
                    desk.get_stats(&admin).unwrap();
                    polls += 1;
                }
                tx.send("reader").unwrap();
                polls
            })
        };

        let mut finished = Vec::new();
        for _ in 0..2 {
            let who = rx
                .recv_timeout(Duration::from_secs(30))
                .expect("stats and writes deadlocked");
            finished.push(who);
        }
        finished.sort();
        assert_eq!(finished, vec!["reader", "writer"]);
        writer.join().unwrap();
        reader.join().unwrap();

        let admin = login(&desk, "admin@example.com");
        assert_eq!(desk.get_stats(&admin).unwrap()["store"]["employees"], 100);
    }
}
