//! Evaluation record and the multi-step form it is filled in through.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::employees::Employee;
use crate::error::{AppError, AppResult};
use crate::rubric::{Category, Criterion, ScoreCard, Scores};

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;

/// Every submitted sub-score must lie in `MIN_SCORE..=MAX_SCORE`
pub fn validate_scores(scores: &Scores) -> AppResult<()> {
    match scores
        .iter()
        .find(|(_, value)| !(MIN_SCORE..=MAX_SCORE).contains(*value))
    {
        Some((criterion, value)) => Err(AppError::validation(format!(
            "{} must be between {} and {}, got {}",
            criterion, MIN_SCORE, MAX_SCORE, value
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    Quarterly,
    Annual,
    Probationary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Pending HR Review")]
    PendingHrReview,
    Completed,
    Rejected,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [
        ReviewStatus::InProgress,
        ReviewStatus::PendingHrReview,
        ReviewStatus::Completed,
        ReviewStatus::Rejected,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReviewStatus::InProgress => "In Progress",
            ReviewStatus::PendingHrReview => "Pending HR Review",
            ReviewStatus::Completed => "Completed",
            ReviewStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HR outcome for a submitted review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Completed,
    Rejected,
}

impl From<Decision> for ReviewStatus {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Completed => ReviewStatus::Completed,
            Decision::Rejected => ReviewStatus::Rejected,
        }
    }
}

/// Wizard pages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormStep {
    Details,
    JobKnowledge,
    QualityOfWork,
    Adaptability,
    Teamwork,
    Reliability,
    Ethics,
    CustomerService,
    Overall,
}

impl FormStep {
    pub const ALL: [FormStep; 9] = [
        FormStep::Details,
        FormStep::JobKnowledge,
        FormStep::QualityOfWork,
        FormStep::Adaptability,
        FormStep::Teamwork,
        FormStep::Reliability,
        FormStep::Ethics,
        FormStep::CustomerService,
        FormStep::Overall,
    ];

    /// Rubric category edited on this page, if any
    pub fn category(&self) -> Option<Category> {
        match self {
            FormStep::Details | FormStep::Overall => None,
            FormStep::JobKnowledge => Some(Category::JobKnowledge),
            FormStep::QualityOfWork => Some(Category::QualityOfWork),
            FormStep::Adaptability => Some(Category::Adaptability),
            FormStep::Teamwork => Some(Category::Teamwork),
            FormStep::Reliability => Some(Category::Reliability),
            FormStep::Ethics => Some(Category::Ethics),
            FormStep::CustomerService => Some(Category::CustomerService),
        }
    }
}

/// Identifying metadata entered on the first page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetails {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub immediate_supervisor: String,
    #[serde(default)]
    pub performance_coverage: String,
    pub review_type: Option<ReviewType>,
    #[serde(default)]
    pub review_period: String,
    pub date_hired: Option<NaiveDate>,
    pub review_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsPatch {
    pub position: Option<String>,
    pub department: Option<String>,
    pub immediate_supervisor: Option<String>,
    pub performance_coverage: Option<String>,
    pub review_type: Option<ReviewType>,
    pub review_period: Option<String>,
    pub date_hired: Option<NaiveDate>,
    pub review_date: Option<NaiveDate>,
}

/// Free text from the last page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    #[serde(default)]
    pub key_strengths: String,
    #[serde(default)]
    pub areas_for_improvement: String,
    #[serde(default)]
    pub development_goals: String,
    #[serde(default)]
    pub additional_comments: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativePatch {
    pub key_strengths: Option<String>,
    pub areas_for_improvement: Option<String>,
    pub development_goals: Option<String>,
    pub additional_comments: Option<String>,
}

/// Body of a step update. Only the part matching the step may be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdate {
    pub details: Option<DetailsPatch>,
    #[serde(default)]
    pub scores: Scores,
    #[serde(default)]
    pub comments: BTreeMap<Criterion, String>,
    pub narrative: Option<NarrativePatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: String,
    pub employee_id: String,
    /// User id of the author
    pub evaluator_id: String,
    #[serde(default)]
    pub details: ReviewDetails,
    #[serde(default)]
    pub scores: Scores,
    #[serde(default)]
    pub comments: BTreeMap<Criterion, String>,
    #[serde(default)]
    pub narrative: Narrative,
    pub status: ReviewStatus,
    pub score_card: Option<ScoreCard>,
    #[serde(default)]
    pub hr_comments: String,
    pub decided_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Evaluation {
    /// Fresh draft for `employee`, position and department copied from the record
    pub fn new(employee: &Employee, evaluator_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id: employee.id.clone(),
            evaluator_id: evaluator_id.to_string(),
            details: ReviewDetails {
                position: employee.position.clone(),
                department: employee.department.clone(),
                date_hired: employee.date_hired,
                ..Default::default()
            },
            scores: Scores::new(),
            comments: BTreeMap::new(),
            narrative: Narrative::default(),
            status: ReviewStatus::InProgress,
            score_card: None,
            hr_comments: String::new(),
            decided_by: None,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            decided_at: None,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.status == ReviewStatus::InProgress
    }

    /// Submission time, falling back to creation time
    pub fn activity_time(&self) -> DateTime<Utc> {
        self.submitted_at.unwrap_or(self.created_at)
    }

    pub fn final_score(&self) -> Option<f64> {
        self.score_card.as_ref().map(|c| c.final_score)
    }

    /// Number of criteria answered so far, out of 27
    pub fn answered(&self) -> usize {
        self.scores.len()
    }

    /// Wizard pages that hold any data
    pub fn touched_steps(&self) -> Vec<FormStep> {
        FormStep::ALL
            .iter()
            .copied()
            .filter(|step| match step.category() {
                Some(category) => category.criteria().iter().any(|c| self.scores.contains_key(c)),
                None if *step == FormStep::Details => !self.details.immediate_supervisor.is_empty(),
                None => self.narrative != Narrative::default(),
            })
            .collect()
    }

    /// Merge one wizard page into the draft
    pub fn apply_step(&mut self, step: FormStep, update: StepUpdate, now: DateTime<Utc>) -> AppResult<()> {
        if !self.is_draft() {
            return Err(AppError::Conflict(format!(
                "review is {} and can no longer be edited",
                self.status
            )));
        }

        match step.category() {
            Some(category) => {
                if update.details.is_some() || update.narrative.is_some() {
                    return Err(AppError::validation("category steps only accept scores and comments"));
                }
                let stray = update
                    .scores
                    .keys()
                    .chain(update.comments.keys())
                    .find(|c| c.category() != category);
                if let Some(criterion) = stray {
                    return Err(AppError::validation(format!(
                        "{} does not belong to {}",
                        criterion, category
                    )));
                }
                validate_scores(&update.scores)?;
                self.scores.extend(update.scores);
                for (criterion, comment) in update.comments {
                    if comment.trim().is_empty() {
                        self.comments.remove(&criterion);
                    } else {
                        self.comments.insert(criterion, comment);
                    }
                }
            }
            None if step == FormStep::Details => {
                if !update.scores.is_empty() || !update.comments.is_empty() || update.narrative.is_some() {
                    return Err(AppError::validation("details step only accepts details"));
                }
                let patch = update
                    .details
                    .ok_or_else(|| AppError::validation("details are missing"))?;
                let d = &mut self.details;
                if let Some(v) = patch.position {
                    d.position = v;
                }
                if let Some(v) = patch.department {
                    d.department = v;
                }
                if let Some(v) = patch.immediate_supervisor {
                    d.immediate_supervisor = v;
                }
                if let Some(v) = patch.performance_coverage {
                    d.performance_coverage = v;
                }
                if patch.review_type.is_some() {
                    d.review_type = patch.review_type;
                }
                if let Some(v) = patch.review_period {
                    d.review_period = v;
                }
                if patch.date_hired.is_some() {
                    d.date_hired = patch.date_hired;
                }
                if patch.review_date.is_some() {
                    d.review_date = patch.review_date;
                }
            }
            None => {
                if !update.scores.is_empty() || !update.comments.is_empty() || update.details.is_some() {
                    return Err(AppError::validation("overall step only accepts the narrative"));
                }
                let patch = update
                    .narrative
                    .ok_or_else(|| AppError::validation("narrative is missing"))?;
                let n = &mut self.narrative;
                if let Some(v) = patch.key_strengths {
                    n.key_strengths = v;
                }
                if let Some(v) = patch.areas_for_improvement {
                    n.areas_for_improvement = v;
                }
                if let Some(v) = patch.development_goals {
                    n.development_goals = v;
                }
                if let Some(v) = patch.additional_comments {
                    n.additional_comments = v;
                }
            }
        }

        self.updated_at = now;
        Ok(())
    }

    /// Finalize the draft: score it and hand it to HR.
    /// Unanswered criteria count as 0.
    pub fn submit(&mut self, now: DateTime<Utc>) -> AppResult<&ScoreCard> {
        if !self.is_draft() {
            return Err(AppError::Conflict(format!("review is already {}", self.status)));
        }
        let d = &self.details;
        let required = [
            ("position", &d.position),
            ("department", &d.department),
            ("immediateSupervisor", &d.immediate_supervisor),
            ("performanceCoverage", &d.performance_coverage),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::validation(format!("{} is required before submitting", field)));
        }

        self.status = ReviewStatus::PendingHrReview;
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(&*self.score_card.insert(ScoreCard::compute(&self.scores)))
    }

    /// Record the HR outcome. Allowed once, on a submitted review.
    pub fn decide(
        &mut self,
        decision: Decision,
        hr_comments: String,
        decided_by: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status != ReviewStatus::PendingHrReview {
            return Err(AppError::Conflict(format!(
                "only reviews pending HR review can be decided, this one is {}",
                self.status
            )));
        }
        self.status = decision.into();
        self.hr_comments = hr_comments;
        self.decided_by = Some(decided_by.to_string());
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employees::EmployeeStatus;
    use crate::rubric::Rating;

    fn employee() -> Employee {
        Employee {
            id: "emp-1".to_string(),
            name: "Ana Cruz".to_string(),
            email: "ana@example.com".to_string(),
            phone: String::new(),
            position: "Cashier".to_string(),
            department: "Retail".to_string(),
            location: String::new(),
            status: EmployeeStatus::Active,
            date_hired: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn details() -> StepUpdate {
        StepUpdate {
            details: Some(DetailsPatch {
                immediate_supervisor: Some("Maria Santos".to_string()),
                performance_coverage: Some("Jan - Mar 2025".to_string()),
                review_type: Some(ReviewType::Quarterly),
                review_period: Some("Q1 2025".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn scores(pairs: &[(Criterion, f64)]) -> StepUpdate {
        StepUpdate {
            scores: pairs.iter().copied().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_copies_employee_fields() {
        let review = Evaluation::new(&employee(), "user-1", Utc::now());
        assert_eq!(review.details.position, "Cashier");
        assert_eq!(review.details.department, "Retail");
        assert_eq!(review.status, ReviewStatus::InProgress);
        assert!(review.touched_steps().is_empty());
    }

    #[test]
    fn test_category_step_merges_scores() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        review
            .apply_step(FormStep::JobKnowledge, scores(&[(Criterion::JobKnowledge, 4.0)]), Utc::now())
            .unwrap();
        review
            .apply_step(FormStep::JobKnowledge, scores(&[(Criterion::PromptnessOfWork, 3.0)]), Utc::now())
            .unwrap();
        assert_eq!(review.answered(), 2);
        assert_eq!(review.touched_steps(), vec![FormStep::JobKnowledge]);
    }

    #[test]
    fn test_category_step_rejects_foreign_criterion() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        let result = review.apply_step(
            FormStep::Teamwork,
            scores(&[(Criterion::Punctuality, 4.0)]),
            Utc::now(),
        );
        match result {
            Err(AppError::Validation(msg)) => assert!(msg.starts_with("punctualityScore "), "{}", msg),
            other => panic!("expected a validation error, got {:?}", other),
        }
        assert_eq!(review.answered(), 0);
    }

    #[test]
    fn test_scores_must_be_in_range() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        for bad in [0.0, 5.5, -1.0] {
            let result = review.apply_step(
                FormStep::Ethics,
                scores(&[(Criterion::EthicalRespect, bad)]),
                Utc::now(),
            );
            assert!(result.is_err(), "{} should be rejected", bad);
        }
        assert_eq!(review.answered(), 0);
    }

    #[test]
    fn test_validate_scores_names_the_criterion() {
        let ok = Scores::from([(Criterion::EthicalRespect, 1.0), (Criterion::Punctuality, 5.0)]);
        assert!(validate_scores(&ok).is_ok());
        assert!(validate_scores(&Scores::new()).is_ok());

        let bad = Scores::from([(Criterion::Punctuality, 9.0)]);
        match validate_scores(&bad) {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "punctualityScore must be between 1 and 5, got 9")
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_are_scoped_and_cleared() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        let mut update = StepUpdate::default();
        update.comments.insert(Criterion::CustomerListening, "Listens well".to_string());
        review.apply_step(FormStep::CustomerService, update, Utc::now()).unwrap();
        assert_eq!(review.comments.len(), 1);

        let mut update = StepUpdate::default();
        update.comments.insert(Criterion::CustomerListening, " ".to_string());
        review.apply_step(FormStep::CustomerService, update, Utc::now()).unwrap();
        assert!(review.comments.is_empty());
    }

    #[test]
    fn test_submit_requires_details() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        assert!(matches!(review.submit(Utc::now()), Err(AppError::Validation(_))));
        review.apply_step(FormStep::Details, details(), Utc::now()).unwrap();
        assert!(review.submit(Utc::now()).is_ok());
        assert_eq!(review.status, ReviewStatus::PendingHrReview);
    }

    #[test]
    fn test_submit_scores_and_freezes() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        review.apply_step(FormStep::Details, details(), Utc::now()).unwrap();
        for category in Category::ALL {
            let pairs: Vec<(Criterion, f64)> = category.criteria().iter().map(|&c| (c, 4.0)).collect();
            let step = FormStep::ALL.iter().copied().find(|s| s.category() == Some(category)).unwrap();
            review.apply_step(step, scores(&pairs), Utc::now()).unwrap();
        }
        let card = review.submit(Utc::now()).unwrap();
        assert_eq!(card.final_score, 4.0);
        assert_eq!(card.final_rating, Some(Rating::Advanced));

        let edit = review.apply_step(FormStep::Ethics, scores(&[(Criterion::EthicalRespect, 1.0)]), Utc::now());
        assert!(matches!(edit, Err(AppError::Conflict(_))));
        assert!(matches!(review.submit(Utc::now()), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_submit_with_missing_scores_counts_zero() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        review.apply_step(FormStep::Details, details(), Utc::now()).unwrap();
        review
            .apply_step(
                FormStep::CustomerService,
                scores(&[
                    (Criterion::CustomerListening, 5.0),
                    (Criterion::CustomerProblemSolving, 5.0),
                    (Criterion::CustomerProductKnowledge, 5.0),
                    (Criterion::CustomerProfessionalAttitude, 5.0),
                    (Criterion::CustomerTimelyResolution, 5.0),
                ]),
                Utc::now(),
            )
            .unwrap();
        let card = review.submit(Utc::now()).unwrap();
        assert_eq!(card.final_score, 1.5);
        assert_eq!(card.final_rating, Some(Rating::Basic));
    }

    #[test]
    fn test_decide_once() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        assert!(review.decide(Decision::Completed, String::new(), "hr-1", Utc::now()).is_err());
        review.apply_step(FormStep::Details, details(), Utc::now()).unwrap();
        review.submit(Utc::now()).unwrap();
        review
            .decide(Decision::Rejected, "Scores lack evidence".to_string(), "hr-1", Utc::now())
            .unwrap();
        assert_eq!(review.status, ReviewStatus::Rejected);
        assert_eq!(review.decided_by.as_deref(), Some("hr-1"));
        assert!(review.decide(Decision::Completed, String::new(), "hr-1", Utc::now()).is_err());
    }

    #[test]
    fn test_overall_step() {
        let mut review = Evaluation::new(&employee(), "user-1", Utc::now());
        let update = StepUpdate {
            narrative: Some(NarrativePatch {
                key_strengths: Some("Customer rapport".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        review.apply_step(FormStep::Overall, update, Utc::now()).unwrap();
        assert_eq!(review.narrative.key_strengths, "Customer rapport");
        assert_eq!(review.touched_steps(), vec![FormStep::Overall]);
        assert!(review.apply_step(FormStep::Overall, StepUpdate::default(), Utc::now()).is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ReviewStatus::PendingHrReview).unwrap();
        assert_eq!(json, "\"Pending HR Review\"");
    }
}
