use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::{Permission, Role, User};
use crate::employees;
use crate::error::{AppError, AppResult};
use crate::evaluation::{Decision, DetailsPatch, Evaluation, FormStep, ReviewStatus, StepUpdate};
use crate::store::Database;

/// How many reviews the "recent" list shows
pub const RECENT_COUNT: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilter {
    pub employee_id: Option<String>,
    pub status: Option<ReviewStatus>,
    pub department: Option<String>,
    pub evaluator_id: Option<String>,
}

/// Read access: HR and admins see everything, evaluators their own
/// reviews, employees only their own completed ones.
pub fn can_view(user: &User, review: &Evaluation) -> bool {
    if user.can(Permission::ViewAllReviews) {
        return true;
    }
    match user.role {
        Role::Evaluator => review.evaluator_id == user.id,
        Role::Employee => {
            review.status == ReviewStatus::Completed
                && user.employee_id.as_deref() == Some(review.employee_id.as_str())
        }
        Role::Admin | Role::Hr => false,
    }
}

pub fn can_edit(user: &User, review: &Evaluation) -> bool {
    user.can(Permission::EditAllReviews)
        || (user.can(Permission::CreateReviews) && review.evaluator_id == user.id)
}

pub fn create(
    db: &mut Database,
    actor: &User,
    employee_id: &str,
    details: Option<DetailsPatch>,
    now: DateTime<Utc>,
) -> AppResult<Evaluation> {
    actor.require(Permission::CreateReviews)?;
    let employee = employees::get(db, employee_id)?;
    let mut review = Evaluation::new(employee, &actor.id, now);
    if let Some(details) = details {
        let update = StepUpdate { details: Some(details), ..Default::default() };
        review.apply_step(FormStep::Details, update, now)?;
    }
    db.reviews.push(review.clone());
    Ok(review)
}

pub fn get<'a>(db: &'a Database, actor: &User, id: &str) -> AppResult<&'a Evaluation> {
    let review = db
        .reviews
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| AppError::not_found("review"))?;
    if !can_view(actor, review) {
        // Hidden reviews look the same as missing ones
        return Err(AppError::not_found("review"));
    }
    Ok(review)
}

fn get_mut<'a>(db: &'a mut Database, actor: &User, id: &str) -> AppResult<&'a mut Evaluation> {
    get(db, actor, id)?;
    db.reviews
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| AppError::not_found("review"))
}

/// Reviews visible to `actor` that match `filter`, newest first
pub fn list(db: &Database, actor: &User, filter: &ReviewFilter) -> Vec<Evaluation> {
    let mut found: Vec<Evaluation> = db
        .reviews
        .iter()
        .filter(|r| can_view(actor, r))
        .filter(|r| filter.employee_id.as_ref().map_or(true, |id| &r.employee_id == id))
        .filter(|r| filter.status.map_or(true, |s| r.status == s))
        .filter(|r| {
            filter
                .department
                .as_ref()
                .map_or(true, |d| r.details.department.eq_ignore_ascii_case(d))
        })
        .filter(|r| filter.evaluator_id.as_ref().map_or(true, |id| &r.evaluator_id == id))
        .cloned()
        .collect();
    found.sort_by(|a, b| b.activity_time().cmp(&a.activity_time()));
    found
}

/// Most recent reviews by submitted-or-created time
pub fn recent(db: &Database, actor: &User) -> Vec<Evaluation> {
    let mut all = list(db, actor, &ReviewFilter::default());
    all.truncate(RECENT_COUNT);
    all
}

pub fn update_step(
    db: &mut Database,
    actor: &User,
    id: &str,
    step: FormStep,
    update: StepUpdate,
    now: DateTime<Utc>,
) -> AppResult<Evaluation> {
    let review = get_mut(db, actor, id)?;
    if !can_edit(actor, review) {
        return Err(AppError::Forbidden(actor.role.to_string()));
    }
    review.apply_step(step, update, now)?;
    Ok(review.clone())
}

pub fn submit(db: &mut Database, actor: &User, id: &str, now: DateTime<Utc>) -> AppResult<Evaluation> {
    let review = get_mut(db, actor, id)?;
    if !can_edit(actor, review) {
        return Err(AppError::Forbidden(actor.role.to_string()));
    }
    review.submit(now)?;
    Ok(review.clone())
}

pub fn decide(
    db: &mut Database,
    actor: &User,
    id: &str,
    decision: Decision,
    hr_comments: String,
    now: DateTime<Utc>,
) -> AppResult<Evaluation> {
    actor.require(Permission::DecideReviews)?;
    let review = get_mut(db, actor, id)?;
    review.decide(decision, hr_comments, &actor.id, now)?;
    Ok(review.clone())
}

pub fn delete(db: &mut Database, actor: &User, id: &str) -> AppResult<Evaluation> {
    actor.require(Permission::DeleteReviews)?;
    let index = db
        .reviews
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| AppError::not_found("review"))?;
    Ok(db.reviews.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedUser;
    use crate::rubric::Criterion;
    use chrono::Duration;

    fn user(role: Role, employee_id: Option<&str>) -> User {
        User::new(
            &SeedUser {
                email: format!("{}@example.com", role),
                password: "pw".to_string(),
                role,
                name: role.to_string(),
                department: String::new(),
                employee_id: employee_id.map(str::to_string),
            },
            Utc::now(),
        )
    }

    fn details() -> DetailsPatch {
        DetailsPatch {
            immediate_supervisor: Some("Maria Santos".to_string()),
            performance_coverage: Some("2025".to_string()),
            ..Default::default()
        }
    }

    fn setup() -> (Database, String) {
        let mut db = Database::default();
        let emp = employees::create(&mut db, employees::sample("Ana Cruz", "Sales"), Utc::now()).unwrap();
        (db, emp.id)
    }

    #[test]
    fn test_create_requires_known_employee() {
        let (mut db, _) = setup();
        let evaluator = user(Role::Evaluator, None);
        let result = create(&mut db, &evaluator, "missing", None, Utc::now());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_employee_cannot_create() {
        let (mut db, emp_id) = setup();
        let employee = user(Role::Employee, Some(&emp_id));
        let result = create(&mut db, &employee, &emp_id, None, Utc::now());
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_evaluator_edits_only_own_drafts() {
        let (mut db, emp_id) = setup();
        let author = user(Role::Evaluator, None);
        let other = user(Role::Evaluator, None);
        let review = create(&mut db, &author, &emp_id, Some(details()), Utc::now()).unwrap();

        let mut update = StepUpdate::default();
        update.scores.insert(Criterion::JobKnowledge, 4.0);
        let result = update_step(&mut db, &other, &review.id, FormStep::JobKnowledge, update.clone(), Utc::now());
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let updated = update_step(&mut db, &author, &review.id, FormStep::JobKnowledge, update, Utc::now()).unwrap();
        assert_eq!(updated.answered(), 1);
    }

    #[test]
    fn test_full_workflow_and_visibility() {
        let (mut db, emp_id) = setup();
        let evaluator = user(Role::Evaluator, None);
        let hr = user(Role::Hr, None);
        let employee = user(Role::Employee, Some(&emp_id));

        let review = create(&mut db, &evaluator, &emp_id, Some(details()), Utc::now()).unwrap();
        assert!(matches!(get(&db, &employee, &review.id), Err(AppError::NotFound(_))));

        submit(&mut db, &evaluator, &review.id, Utc::now()).unwrap();
        assert!(matches!(
            decide(&mut db, &evaluator, &review.id, Decision::Completed, String::new(), Utc::now()),
            Err(AppError::Forbidden(_))
        ));

        let done = decide(&mut db, &hr, &review.id, Decision::Completed, "Good".into(), Utc::now()).unwrap();
        assert_eq!(done.status, ReviewStatus::Completed);
        assert_eq!(get(&db, &employee, &review.id).unwrap().hr_comments, "Good");
        assert_eq!(list(&db, &employee, &ReviewFilter::default()).len(), 1);
    }

    #[test]
    fn test_list_filters_and_orders() {
        let (mut db, emp_id) = setup();
        let hr = user(Role::Hr, None);
        let now = Utc::now();
        let first = create(&mut db, &hr, &emp_id, Some(details()), now).unwrap();
        let second = create(&mut db, &hr, &emp_id, Some(details()), now + Duration::seconds(1)).unwrap();
        submit(&mut db, &hr, &first.id, now + Duration::seconds(10)).unwrap();

        let all = list(&db, &hr, &ReviewFilter::default());
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);

        let pending = ReviewFilter { status: Some(ReviewStatus::PendingHrReview), ..Default::default() };
        assert_eq!(list(&db, &hr, &pending).len(), 1);
        let sales = ReviewFilter { department: Some("SALES".into()), ..Default::default() };
        assert_eq!(list(&db, &hr, &sales).len(), 2);
    }

    #[test]
    fn test_recent_caps_at_five() {
        let (mut db, emp_id) = setup();
        let hr = user(Role::Hr, None);
        for i in 0..7 {
            create(&mut db, &hr, &emp_id, None, Utc::now() + Duration::seconds(i)).unwrap();
        }
        assert_eq!(recent(&db, &hr).len(), RECENT_COUNT);
    }

    #[test]
    fn test_delete_requires_permission() {
        let (mut db, emp_id) = setup();
        let evaluator = user(Role::Evaluator, None);
        let hr = user(Role::Hr, None);
        let review = create(&mut db, &evaluator, &emp_id, None, Utc::now()).unwrap();
        assert!(delete(&mut db, &evaluator, &review.id).is_err());
        delete(&mut db, &hr, &review.id).unwrap();
        assert!(db.reviews.is_empty());
        // employee can be removed once no reviews remain
        employees::delete(&mut db, &emp_id).unwrap();
    }
}
