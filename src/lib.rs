//! SF Health Analyzer: AI categorization and insights for Salesforce health
//! alerts, backed by a managed inference service.

pub mod ai;
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod service;
pub mod state;

pub use error::{AppError, Result};
