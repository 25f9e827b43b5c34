use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rating::Rating;
use super::types::{Category, Criterion};

/// Sub-scores keyed by criterion. Absent keys are unanswered slots.
pub type Scores = BTreeMap<Criterion, f64>;

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Unweighted mean over a fixed number of slots.
/// Missing or non-finite values count as 0; the divisor is always `values.len()`.
pub fn mean(values: &[Option<f64>]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values
        .iter()
        .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
        .sum();
    sum / values.len() as f64
}

/// Mean of one category's sub-scores
pub fn category_mean(category: Category, scores: &Scores) -> f64 {
    let values: Vec<Option<f64>> = category
        .criteria()
        .iter()
        .map(|c| scores.get(c).copied())
        .collect();
    mean(&values)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: Category,
    pub mean: f64,
    pub weight: f64,
    pub weighted: f64,
    pub rating: Option<Rating>,
}

/// Scored result of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub categories: Vec<CategoryScore>,
    pub final_score: f64,
    pub final_percentage: f64,
    pub final_rating: Option<Rating>,
}

impl ScoreCard {
    /// Build the card from per-category means.
    ///
    /// Formula:
    ///   mean_c           = round2(category average)
    ///   weighted_c       = mean_c * weight_c
    ///   final_score      = round2(sum of weighted_c)
    ///   final_percentage = final_score / 5 * 100
    ///
    /// A category missing from `means` contributes 0.
    pub fn from_means(means: &BTreeMap<Category, f64>) -> Self {
        let categories: Vec<CategoryScore> = Category::ALL
            .iter()
            .map(|&category| {
                let mean = round2(means.get(&category).copied().unwrap_or(0.0));
                CategoryScore {
                    category,
                    mean,
                    weight: category.weight(),
                    weighted: mean * category.weight(),
                    rating: Rating::classify(mean),
                }
            })
            .collect();

        let final_score = round2(categories.iter().map(|c| c.weighted).sum());
        Self {
            categories,
            final_score,
            final_percentage: final_score / 5.0 * 100.0,
            final_rating: Rating::classify(final_score),
        }
    }

    /// Score a full set of sub-scores
    pub fn compute(scores: &Scores) -> Self {
        let means = Category::ALL
            .iter()
            .map(|&c| (c, category_mean(c, scores)))
            .collect();
        Self::from_means(&means)
    }

    pub fn category(&self, category: Category) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category == category)
    }
}
