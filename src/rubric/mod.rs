//! Performance rubric: categories, weights, score aggregation and rating tiers.
//!
//! Everything in here is pure and synchronous.

pub mod rating;
pub mod score;
pub mod types;

pub use rating::Rating;
pub use score::{category_mean, CategoryScore, ScoreCard, Scores};
pub use types::{Category, Criterion};
