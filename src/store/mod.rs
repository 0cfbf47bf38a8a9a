//! Ledger, profile and conversation-state persistence
//!
//! The agent only talks to storage through [`LedgerStore`]. The in-memory
//! store is the default; PostgreSQL is used when a database URL is
//! configured.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::models::{EntryKind, LedgerEntry, NewEntry, UserProfile};
use crate::state::ConversationState;
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Trait for ledger persistence
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Profile for an owner, created with defaults on first access
    async fn get_profile(&self, owner_id: &str) -> Result<UserProfile>;

    async fn put_profile(&self, profile: &UserProfile) -> Result<()>;

    async fn append_category(&self, owner_id: &str, kind: EntryKind, label: &str) -> Result<()>;

    /// Entries in creation order
    async fn list_entries(&self, owner_id: &str) -> Result<Vec<LedgerEntry>>;

    async fn create_entry(&self, owner_id: &str, entry: NewEntry) -> Result<LedgerEntry>;

    /// Append the entry's category to the profile, create the entry and save
    /// the owner's next conversation state as one atomic unit
    async fn commit_entry(
        &self,
        owner_id: &str,
        entry: NewEntry,
        next_state: &ConversationState,
    ) -> Result<LedgerEntry>;

    /// Removed entry, or `None` when the owner has no entry with that id
    async fn delete_entry(&self, owner_id: &str, entry_id: u64) -> Result<Option<LedgerEntry>>;

    async fn get_state(&self, owner_id: &str) -> Result<Option<ConversationState>>;

    async fn put_state(&self, owner_id: &str, state: &ConversationState) -> Result<()>;
}

/// Pick the store backend from configuration, falling back to memory
pub fn build_store(config: &AgentConfig) -> Arc<dyn LedgerStore> {
    if let Some(url) = config.database_url.as_deref() {
        match PgStore::connect_lazy(url) {
            Ok(store) => {
                info!("Ledger store backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Ledger store backend: in-memory");
    Arc::new(InMemoryStore::new())
}
