//! Lost & Found Claim Orchestrator
//!
//! AI-assisted workflows for a campus lost & found service:
//! - Auto-fill of lost item reports from a description or photo
//! - Match verification between a lost and a found item
//! - Fraud screening of claims for administrators
//! - Smart search suggestions while browsing
//!
//! FLOW PIPELINE:
//! VALIDATE REQUEST → RENDER PROMPT → INFER → VALIDATE REPLY

pub mod api;
pub mod audit;
pub mod catalog;
pub mod claim_dialog;
pub mod config;
pub mod error;
pub mod flows;
pub mod gemini;
pub mod inference;
pub mod media;
pub mod models;
pub mod prompts;
pub mod report;
pub mod repository;
pub mod schema;
pub mod session;
pub mod workflow;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use config::AppConfig;
pub use workflow::WorkflowOrchestrator;
