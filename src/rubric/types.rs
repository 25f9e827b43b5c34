use std::fmt;

use serde::{Deserialize, Serialize};

/// Rubric category. Each one averages a fixed set of [`Criterion`] slots
/// and contributes to the final score with a fixed weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    JobKnowledge,
    QualityOfWork,
    Adaptability,
    Teamwork,
    Reliability,
    Ethics,
    CustomerService,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::JobKnowledge,
        Category::QualityOfWork,
        Category::Adaptability,
        Category::Teamwork,
        Category::Reliability,
        Category::Ethics,
        Category::CustomerService,
    ];

    /// Share of the final score. The seven weights sum to 1.0.
    pub fn weight(&self) -> f64 {
        match self {
            Category::JobKnowledge => 0.20,
            Category::QualityOfWork => 0.20,
            Category::Adaptability => 0.10,
            Category::Teamwork => 0.10,
            Category::Reliability => 0.05,
            Category::Ethics => 0.05,
            Category::CustomerService => 0.30,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::JobKnowledge => "Job Knowledge / Work Output",
            Category::QualityOfWork => "Quality of Work",
            Category::Adaptability => "Adaptability",
            Category::Teamwork => "Teamwork",
            Category::Reliability => "Reliability",
            Category::Ethics => "Ethical & Professional Behavior",
            Category::CustomerService => "Customer Service",
        }
    }

    pub fn criteria(&self) -> &'static [Criterion] {
        use Criterion::*;
        match self {
            Category::JobKnowledge => &[JobKnowledge, QualityOfWork, PromptnessOfWork],
            Category::QualityOfWork => &[
                QualityMeetsStandards,
                QualityTimeliness,
                QualityWorkOutputVolume,
                QualityConsistency,
                QualityJobTargets,
            ],
            Category::Adaptability => &[
                AdaptabilityOpenness,
                AdaptabilityFlexibility,
                AdaptabilityResilience,
            ],
            Category::Teamwork => &[
                ActiveParticipation,
                PositiveTeamCulture,
                EffectiveCommunication,
            ],
            Category::Reliability => &[
                ConsistentAttendance,
                Punctuality,
                FollowsThrough,
                ReliableHandling,
            ],
            Category::Ethics => &[
                EthicalFollowsPolicies,
                EthicalProfessionalism,
                EthicalAccountability,
                EthicalRespect,
            ],
            Category::CustomerService => &[
                CustomerListening,
                CustomerProblemSolving,
                CustomerProductKnowledge,
                CustomerProfessionalAttitude,
                CustomerTimelyResolution,
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One 1-5 sub-score slot on the evaluation form.
///
/// Serialized with the form's field names so that stored documents and
/// request bodies read `{"jobKnowledge": 4, "punctualityScore": 5}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criterion {
    #[serde(rename = "jobKnowledge")]
    JobKnowledge,
    #[serde(rename = "qualityOfWork")]
    QualityOfWork,
    #[serde(rename = "promptnessOfWork")]
    PromptnessOfWork,
    #[serde(rename = "qualityMeetsStandards")]
    QualityMeetsStandards,
    #[serde(rename = "qualityTimeliness")]
    QualityTimeliness,
    #[serde(rename = "qualityWorkOutputVolume")]
    QualityWorkOutputVolume,
    #[serde(rename = "qualityConsistency")]
    QualityConsistency,
    #[serde(rename = "qualityJobTargets")]
    QualityJobTargets,
    #[serde(rename = "adaptabilityOpenness")]
    AdaptabilityOpenness,
    #[serde(rename = "adaptabilityFlexibility")]
    AdaptabilityFlexibility,
    #[serde(rename = "adaptabilityResilience")]
    AdaptabilityResilience,
    #[serde(rename = "activeParticipationScore")]
    ActiveParticipation,
    #[serde(rename = "positiveTeamCultureScore")]
    PositiveTeamCulture,
    #[serde(rename = "effectiveCommunicationScore")]
    EffectiveCommunication,
    #[serde(rename = "consistentAttendanceScore")]
    ConsistentAttendance,
    #[serde(rename = "punctualityScore")]
    Punctuality,
    #[serde(rename = "followsThroughScore")]
    FollowsThrough,
    #[serde(rename = "reliableHandlingScore")]
    ReliableHandling,
    #[serde(rename = "ethicalFollowsPoliciesScore")]
    EthicalFollowsPolicies,
    #[serde(rename = "ethicalProfessionalismScore")]
    EthicalProfessionalism,
    #[serde(rename = "ethicalAccountabilityScore")]
    EthicalAccountability,
    #[serde(rename = "ethicalRespectScore")]
    EthicalRespect,
    #[serde(rename = "customerListeningScore")]
    CustomerListening,
    #[serde(rename = "customerProblemSolvingScore")]
    CustomerProblemSolving,
    #[serde(rename = "customerProductKnowledgeScore")]
    CustomerProductKnowledge,
    #[serde(rename = "customerProfessionalAttitudeScore")]
    CustomerProfessionalAttitude,
    #[serde(rename = "customerTimelyResolutionScore")]
    CustomerTimelyResolution,
}

impl Criterion {
    pub fn category(&self) -> Category {
        use Criterion::*;
        match self {
            JobKnowledge | QualityOfWork | PromptnessOfWork => Category::JobKnowledge,
            QualityMeetsStandards | QualityTimeliness | QualityWorkOutputVolume
            | QualityConsistency | QualityJobTargets => Category::QualityOfWork,
            AdaptabilityOpenness | AdaptabilityFlexibility | AdaptabilityResilience => {
                Category::Adaptability
            }
            ActiveParticipation | PositiveTeamCulture | EffectiveCommunication => Category::Teamwork,
            ConsistentAttendance | Punctuality | FollowsThrough | ReliableHandling => {
                Category::Reliability
            }
            EthicalFollowsPolicies | EthicalProfessionalism | EthicalAccountability
            | EthicalRespect => Category::Ethics,
            CustomerListening | CustomerProblemSolving | CustomerProductKnowledge
            | CustomerProfessionalAttitude | CustomerTimelyResolution => Category::CustomerService,
        }
    }

    /// Field name used on the wire and in stored documents
    pub fn key(&self) -> &'static str {
        use Criterion::*;
        match self {
            JobKnowledge => "jobKnowledge",
            QualityOfWork => "qualityOfWork",
            PromptnessOfWork => "promptnessOfWork",
            QualityMeetsStandards => "qualityMeetsStandards",
            QualityTimeliness => "qualityTimeliness",
            QualityWorkOutputVolume => "qualityWorkOutputVolume",
            QualityConsistency => "qualityConsistency",
            QualityJobTargets => "qualityJobTargets",
            AdaptabilityOpenness => "adaptabilityOpenness",
            AdaptabilityFlexibility => "adaptabilityFlexibility",
            AdaptabilityResilience => "adaptabilityResilience",
            ActiveParticipation => "activeParticipationScore",
            PositiveTeamCulture => "positiveTeamCultureScore",
            EffectiveCommunication => "effectiveCommunicationScore",
            ConsistentAttendance => "consistentAttendanceScore",
            Punctuality => "punctualityScore",
            FollowsThrough => "followsThroughScore",
            ReliableHandling => "reliableHandlingScore",
            EthicalFollowsPolicies => "ethicalFollowsPoliciesScore",
            EthicalProfessionalism => "ethicalProfessionalismScore",
            EthicalAccountability => "ethicalAccountabilityScore",
            EthicalRespect => "ethicalRespectScore",
            CustomerListening => "customerListeningScore",
            CustomerProblemSolving => "customerProblemSolvingScore",
            CustomerProductKnowledge => "customerProductKnowledgeScore",
            CustomerProfessionalAttitude => "customerProfessionalAttitudeScore",
            CustomerTimelyResolution => "customerTimelyResolutionScore",
        }
    }

    /// Row label on the printed report
    pub fn label(&self) -> &'static str {
        use Criterion::*;
        match self {
            JobKnowledge => "Job Knowledge",
            QualityOfWork => "Quality of Work",
            PromptnessOfWork => "Promptness of Work",
            QualityMeetsStandards => "Meets Standards and Requirements",
            QualityTimeliness => "Timeliness",
            QualityWorkOutputVolume => "Work Output Volume",
            QualityConsistency => "Consistency in Performance",
            QualityJobTargets => "Job Targets",
            AdaptabilityOpenness => "Openness to Change",
            AdaptabilityFlexibility => "Flexibility in New Situations",
            AdaptabilityResilience => "Resilience in the Face of Challenges",
            ActiveParticipation => "Active Participation in Team Activities",
            PositiveTeamCulture => "Promotion of a Positive Team Culture",
            EffectiveCommunication => "Effective Communication",
            ConsistentAttendance => "Consistent Attendance",
            Punctuality => "Punctuality",
            FollowsThrough => "Follows Through on Commitments",
            ReliableHandling => "Reliable Handling of Routine Tasks",
            EthicalFollowsPolicies => "Follows Company Policies",
            EthicalProfessionalism => "Professionalism",
            EthicalAccountability => "Accountability for Mistakes",
            EthicalRespect => "Respect for Others",
            CustomerListening => "Listening and Understanding",
            CustomerProblemSolving => "Problem-Solving for Customers",
            CustomerProductKnowledge => "Product Knowledge for Customer Support",
            CustomerProfessionalAttitude => "Positive and Professional Attitude",
            CustomerTimelyResolution => "Timely Resolution of Customer Issues",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Category::ALL.iter().map(|c| c.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9, "weights sum to {}", total);
    }

    #[test]
    fn test_criteria_belong_to_their_category() {
        let mut count = 0;
        for category in Category::ALL {
            for criterion in category.criteria() {
                assert_eq!(criterion.category(), category);
                count += 1;
            }
        }
        assert_eq!(count, 27);
    }

    #[test]
    fn test_criterion_uses_form_field_names() {
        let json = serde_json::to_string(&Criterion::ActiveParticipation).unwrap();
        assert_eq!(json, "\"activeParticipationScore\"");
        let parsed: Criterion = serde_json::from_str("\"qualityJobTargets\"").unwrap();
        assert_eq!(parsed, Criterion::QualityJobTargets);
    }

    #[test]
    fn test_display_matches_wire_name() {
        for criterion in Category::ALL.iter().flat_map(|c| c.criteria()) {
            let json = serde_json::to_string(criterion).unwrap();
            assert_eq!(json, format!("\"{}\"", criterion));
        }
        assert_eq!(Criterion::Punctuality.to_string(), "punctualityScore");
    }
}
