//! Role-specific dashboard aggregates

use std::collections::BTreeMap;

use serde_json::json;

use crate::auth::{Role, User};
use crate::evaluation::{Evaluation, ReviewStatus};
use crate::reviews::{self, ReviewFilter};
use crate::rubric::{score::round2, Rating};
use crate::store::Database;

/// Dashboard for whoever is asking
pub fn for_user(db: &Database, user: &User) -> serde_json::Value {
    match user.role {
        Role::Admin | Role::Hr => hr(db, user),
        Role::Evaluator => evaluator(db, user),
        Role::Employee => employee(db, user),
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(round2(sum / n as f64))
    }
}

fn summary(db: &Database, review: &Evaluation) -> serde_json::Value {
    let employee_name = db
        .employees
        .iter()
        .find(|e| e.id == review.employee_id)
        .map(|e| e.name.as_str())
        .unwrap_or("Unknown Employee");
    let card = review.score_card.as_ref();
    json!({
        "id": review.id,
        "employeeId": review.employee_id,
        "employeeName": employee_name,
        "department": review.details.department,
        "reviewPeriod": review.details.review_period,
        "status": review.status,
        "finalScore": card.map(|c| c.final_score),
        "finalPercentage": card.map(|c| c.final_percentage),
        "finalRating": card.and_then(|c| c.final_rating),
        "answered": review.answered(),
        "touchedSteps": review.touched_steps(),
        "lastActivity": review.activity_time(),
    })
}

fn hr(db: &Database, user: &User) -> serde_json::Value {
    let all = reviews::list(db, user, &ReviewFilter::default());

    let status_counts: BTreeMap<&str, usize> = ReviewStatus::ALL
        .iter()
        .map(|s| (s.name(), all.iter().filter(|r| r.status == *s).count()))
        .collect();

    let completed: Vec<&Evaluation> = all
        .iter()
        .filter(|r| r.status == ReviewStatus::Completed)
        .collect();

    let rating_distribution: BTreeMap<&str, usize> = Rating::ALL
        .iter()
        .map(|rating| {
            let count = completed
                .iter()
                .filter(|r| r.score_card.as_ref().and_then(|c| c.final_rating) == Some(*rating))
                .count();
            (rating.label(), count)
        })
        .collect();

    let mut by_department: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for review in &completed {
        if let Some(score) = review.final_score() {
            by_department
                .entry(review.details.department.as_str())
                .or_default()
                .push(score);
        }
    }
    let department_averages: BTreeMap<&str, Option<f64>> = by_department
        .into_iter()
        .map(|(d, scores)| (d, average(scores.into_iter())))
        .collect();

    let recent_submissions: Vec<serde_json::Value> = all
        .iter()
        .filter(|r| r.submitted_at.is_some())
        .take(reviews::RECENT_COUNT)
        .map(|r| summary(db, r))
        .collect();

    json!({
        "role": user.role,
        "totalEmployees": db.employees.len(),
        "totalReviews": all.len(),
        "statusCounts": status_counts,
        "averageFinalScore": average(completed.iter().filter_map(|r| r.final_score())),
        "ratingDistribution": rating_distribution,
        "departmentAverages": department_averages,
        "recentSubmissions": recent_submissions,
    })
}

fn evaluator(db: &Database, user: &User) -> serde_json::Value {
    let mine = reviews::list(db, user, &ReviewFilter::default());
    let pick = |statuses: &[ReviewStatus]| -> Vec<serde_json::Value> {
        mine.iter()
            .filter(|r| statuses.contains(&r.status))
            .map(|r| summary(db, r))
            .collect()
    };

    json!({
        "role": user.role,
        "drafts": pick(&[ReviewStatus::InProgress]),
        "awaitingHr": pick(&[ReviewStatus::PendingHrReview]),
        "decided": pick(&[ReviewStatus::Completed, ReviewStatus::Rejected]),
        "totalReviews": mine.len(),
    })
}

fn employee(db: &Database, user: &User) -> serde_json::Value {
    // list() already limits employees to their own completed reviews
    let mine = reviews::list(db, user, &ReviewFilter::default());
    let latest = mine.first();

    // oldest first for charting
    let history: Vec<serde_json::Value> = mine
        .iter()
        .rev()
        .map(|r| {
            json!({
                "reviewId": r.id,
                "reviewPeriod": r.details.review_period,
                "finalScore": r.final_score(),
                "submittedAt": r.submitted_at,
            })
        })
        .collect();

    let profile = user
        .employee_id
        .as_ref()
        .and_then(|id| db.employees.iter().find(|e| &e.id == id));

    json!({
        "role": user.role,
        "employee": profile,
        "latestScore": latest.and_then(|r| r.final_score()),
        "latestRating": latest.and_then(|r| r.score_card.as_ref()).and_then(|c| c.final_rating),
        "averageScore": average(mine.iter().filter_map(|r| r.final_score())),
        "reviews": mine.iter().map(|r| summary(db, r)).collect::<Vec<_>>(),
        "history": history,
    })
}
