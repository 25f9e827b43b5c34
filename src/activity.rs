use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{Role, User};
use crate::config::ActivityConfig;
use crate::store::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    EmployeeCreated,
    EmployeeUpdated,
    EmployeeDeleted,
    ReviewCreated,
    ReviewSubmitted,
    ReviewCompleted,
    ReviewRejected,
    ReviewDeleted,
}

/// One line of the recent-activity feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    pub message: String,
    pub actor_id: String,
    pub actor_name: String,
    pub employee_id: Option<String>,
    pub review_id: Option<String>,
    /// Author of the review this is about
    pub evaluator_id: Option<String>,
    pub at: DateTime<Utc>,
}

impl Activity {
    pub fn new(kind: ActivityKind, actor: &User, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            message: message.into(),
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            employee_id: None,
            review_id: None,
            evaluator_id: None,
            at,
        }
    }

    pub fn employee(mut self, employee_id: &str) -> Self {
        self.employee_id = Some(employee_id.to_string());
        self
    }

    pub fn review(mut self, review_id: &str, evaluator_id: &str) -> Self {
        self.review_id = Some(review_id.to_string());
        self.evaluator_id = Some(evaluator_id.to_string());
        self
    }

    /// Whether the entry shows up in `user`'s activity feed
    pub fn visible_to(&self, user: &User) -> bool {
        match user.role {
            Role::Admin | Role::Hr => true,
            Role::Evaluator => {
                self.actor_id == user.id || self.evaluator_id.as_deref() == Some(user.id.as_str())
            }
            Role::Employee => self.kind == ActivityKind::ReviewCompleted && self.is_about(user),
        }
    }

    /// Whether the entry is a notification for `user`
    pub fn notifies(&self, user: &User) -> bool {
        if self.actor_id == user.id {
            return false;
        }
        match user.role {
            Role::Admin | Role::Hr => self.kind == ActivityKind::ReviewSubmitted,
            Role::Evaluator => {
                matches!(self.kind, ActivityKind::ReviewCompleted | ActivityKind::ReviewRejected)
                    && self.evaluator_id.as_deref() == Some(user.id.as_str())
            }
            Role::Employee => self.kind == ActivityKind::ReviewCompleted && self.is_about(user),
        }
    }

    fn is_about(&self, user: &User) -> bool {
        user.employee_id.is_some() && self.employee_id == user.employee_id
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notifications {
    pub unread: usize,
    pub read_at: Option<DateTime<Utc>>,
    pub items: Vec<Activity>,
}

/// Bounded activity feed kept inside the document
pub struct ActivityLog {
    config: ActivityConfig,
    total_recorded: AtomicU64,
}

impl ActivityLog {
    pub fn new(config: &ActivityConfig) -> Self {
        Self {
            config: config.clone(),
            total_recorded: AtomicU64::new(0),
        }
    }

    /// Append an entry, dropping the oldest ones past `max_entries`
    pub fn record(&self, db: &mut Database, activity: Activity) {
        debug!("Activity: {}", activity.message);
        db.activities.push(activity);
        self.total_recorded.fetch_add(1, Ordering::Relaxed);

        if db.activities.len() > self.config.max_entries {
            let drain_count = db.activities.len() - self.config.max_entries;
            db.activities.drain(..drain_count);
        }
    }

    /// Entries `user` may see, newest first
    pub fn search(
        &self,
        db: &Database,
        user: &User,
        kind: Option<ActivityKind>,
        limit: Option<usize>,
    ) -> Vec<Activity> {
        let limit = limit.unwrap_or(self.config.default_limit);
        db.activities
            .iter()
            .rev()
            .filter(|a| a.visible_to(user))
            .filter(|a| kind.map_or(true, |k| a.kind == k))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Notification bell contents for `user`
    pub fn notifications(&self, db: &Database, user: &User, limit: Option<usize>) -> Notifications {
        let limit = limit.unwrap_or(self.config.default_limit);
        let mine: Vec<&Activity> = db.activities.iter().rev().filter(|a| a.notifies(user)).collect();
        let unread = mine
            .iter()
            .filter(|a| user.notifications_read_at.map_or(true, |read| a.at > read))
            .count();
        Notifications {
            unread,
            read_at: user.notifications_read_at,
            items: mine.into_iter().take(limit).cloned().collect(),
        }
    }

    pub fn get_stats(&self, db: &Database) -> serde_json::Value {
        serde_json::json!({
            "current_entries": db.activities.len(),
            "max_entries": self.config.max_entries,
            "total_recorded": self.total_recorded.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedUser;
    use chrono::Duration;

    fn user(role: Role, employee_id: Option<&str>) -> User {
        User::new(
            &SeedUser {
                email: format!("{}@example.com", role),
                password: "pw".to_string(),
                role,
                name: format!("{} user", role),
                department: String::new(),
                employee_id: employee_id.map(str::to_string),
            },
            Utc::now(),
        )
    }

    fn log(max: usize) -> ActivityLog {
        ActivityLog::new(&ActivityConfig { max_entries: max, default_limit: 10 })
    }

    #[test]
    fn test_rotation_keeps_newest() {
        let log = log(3);
        let mut db = Database::default();
        let hr = user(Role::Hr, None);
        for i in 0..5 {
            log.record(&mut db, Activity::new(ActivityKind::EmployeeCreated, &hr, format!("#{}", i), Utc::now()));
        }
        assert_eq!(db.activities.len(), 3);
        let recent = log.search(&db, &hr, None, None);
        assert_eq!(recent[0].message, "#4");
        assert_eq!(recent[2].message, "#2");
        assert_eq!(log.get_stats(&db)["total_recorded"], 5);
    }

    #[test]
    fn test_search_filters_kind_and_limit() {
        let log = log(100);
        let mut db = Database::default();
        let hr = user(Role::Hr, None);
        log.record(&mut db, Activity::new(ActivityKind::EmployeeCreated, &hr, "a", Utc::now()));
        log.record(&mut db, Activity::new(ActivityKind::ReviewCreated, &hr, "b", Utc::now()));
        log.record(&mut db, Activity::new(ActivityKind::ReviewCreated, &hr, "c", Utc::now()));
        let found = log.search(&db, &hr, Some(ActivityKind::ReviewCreated), Some(1));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "c");
    }

    #[test]
    fn test_notifications_by_role() {
        let log = log(100);
        let mut db = Database::default();
        let hr = user(Role::Hr, None);
        let evaluator = user(Role::Evaluator, None);
        let employee = user(Role::Employee, Some("emp-1"));

        let submitted = Activity::new(ActivityKind::ReviewSubmitted, &evaluator, "submitted", Utc::now())
            .employee("emp-1")
            .review("rev-1", &evaluator.id);
        let completed = Activity::new(ActivityKind::ReviewCompleted, &hr, "completed", Utc::now())
            .employee("emp-1")
            .review("rev-1", &evaluator.id);
        log.record(&mut db, submitted);
        log.record(&mut db, completed);

        let hr_bell = log.notifications(&db, &hr, None);
        assert_eq!(hr_bell.unread, 1);
        assert_eq!(hr_bell.items[0].kind, ActivityKind::ReviewSubmitted);

        let ev_bell = log.notifications(&db, &evaluator, None);
        assert_eq!(ev_bell.unread, 1);
        assert_eq!(ev_bell.items[0].kind, ActivityKind::ReviewCompleted);

        let emp_bell = log.notifications(&db, &employee, None);
        assert_eq!(emp_bell.unread, 1);
        assert_eq!(log.search(&db, &employee, None, None).len(), 1);

        let other = user(Role::Employee, Some("emp-2"));
        assert_eq!(log.notifications(&db, &other, None).unread, 0);
    }

    #[test]
    fn test_read_marker() {
        let log = log(100);
        let mut db = Database::default();
        let mut hr = user(Role::Hr, None);
        let evaluator = user(Role::Evaluator, None);
        let at = Utc::now();
        log.record(&mut db, Activity::new(ActivityKind::ReviewSubmitted, &evaluator, "old", at - Duration::minutes(5)));
        log.record(&mut db, Activity::new(ActivityKind::ReviewSubmitted, &evaluator, "new", at + Duration::minutes(5)));
        hr.notifications_read_at = Some(at);
        let bell = log.notifications(&db, &hr, None);
        assert_eq!(bell.unread, 1);
        assert_eq!(bell.items.len(), 2);
    }
}
