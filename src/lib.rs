//! Ledger Chat Agent
//!
//! A conversational agent that turns free-form Portuguese chat messages into
//! ledger operations:
//! - Extracts amounts, descriptions and entry ids from raw text
//! - Categorizes entries with keyword rules or a model learned from history
//! - Classifies intents with weighted triggers biased by recent history
//! - Drives guided, multi-message registration flows per owner
//! - Reports summaries, budget alerts, forecasts and recommendations
//!
//! MESSAGE LOOP:
//! INPUT → CLASSIFY | CONTINUE FLOW → HANDLE → REPLY → PERSIST STATE

pub mod agent;
pub mod analytics;
pub mod api;
pub mod categorizer;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod state;
pub mod store;

pub use error::Result;

// Re-export common types
pub use agent::Agent;
pub use classifier::{Intent, IntentClassifier};
pub use config::AgentConfig;
pub use models::*;
pub use store::{build_store, LedgerStore};
