pub mod activity;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod desk;
pub mod employees;
pub mod error;
pub mod evaluation;
pub mod report;
pub mod reviews;
pub mod rubric;
pub mod store;
pub mod web;
