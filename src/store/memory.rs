//! In-memory ledger store for development and tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::LedgerStore;
use crate::models::{EntryKind, LedgerEntry, NewEntry, UserProfile};
use crate::state::ConversationState;
use crate::Result;

/// Entries and profiles share one lock so an entry and its category land
/// together.
#[derive(Default)]
struct Ledger {
    next_id: u64,
    entries: Vec<LedgerEntry>,
    profiles: HashMap<String, UserProfile>,
}

impl Ledger {
    fn profile_mut(&mut self, owner_id: &str) -> &mut UserProfile {
        self.profiles
            .entry(owner_id.to_string())
            .or_insert_with(|| UserProfile::new(owner_id))
    }

    fn insert(&mut self, owner_id: &str, entry: NewEntry) -> LedgerEntry {
        self.next_id += 1;
        let entry = entry.into_entry(self.next_id, owner_id);
        self.entries.push(entry.clone());
        entry
    }
}

pub struct InMemoryStore {
    ledger: Arc<RwLock<Ledger>>,
    states: Arc<RwLock<HashMap<String, ConversationState>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Ledger::default())),
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn get_profile(&self, owner_id: &str) -> Result<UserProfile> {
        {
            let ledger = self.ledger.read().await;
            if let Some(profile) = ledger.profiles.get(owner_id) {
                return Ok(profile.clone());
            }
        }

        let mut ledger = self.ledger.write().await;
        Ok(ledger.profile_mut(owner_id).clone())
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        ledger
            .profiles
            .insert(profile.owner_id.clone(), profile.clone());
        Ok(())
    }

    async fn append_category(&self, owner_id: &str, kind: EntryKind, label: &str) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        ledger.profile_mut(owner_id).append_category(kind, label);
        Ok(())
    }

    async fn list_entries(&self, owner_id: &str) -> Result<Vec<LedgerEntry>> {
        let ledger = self.ledger.read().await;

        Ok(ledger
            .entries
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_entry(&self, owner_id: &str, entry: NewEntry) -> Result<LedgerEntry> {
        let mut ledger = self.ledger.write().await;
        Ok(ledger.insert(owner_id, entry))
    }

    async fn commit_entry(
        &self,
        owner_id: &str,
        entry: NewEntry,
        next_state: &ConversationState,
    ) -> Result<LedgerEntry> {
        // Ledger before states, the only place both are held
        let mut ledger = self.ledger.write().await;
        let mut states = self.states.write().await;

        ledger
            .profile_mut(owner_id)
            .append_category(entry.kind, &entry.category);
        states.insert(owner_id.to_string(), next_state.clone());
        Ok(ledger.insert(owner_id, entry))
    }

    async fn delete_entry(&self, owner_id: &str, entry_id: u64) -> Result<Option<LedgerEntry>> {
        let mut ledger = self.ledger.write().await;

        let position = ledger
            .entries
            .iter()
            .position(|entry| entry.id == entry_id && entry.owner_id == owner_id);

        Ok(position.map(|index| ledger.entries.remove(index)))
    }

    async fn get_state(&self, owner_id: &str) -> Result<Option<ConversationState>> {
        let states = self.states.read().await;
        Ok(states.get(owner_id).cloned())
    }

    async fn put_state(&self, owner_id: &str, state: &ConversationState) -> Result<()> {
        let mut states = self.states.write().await;
        states.insert(owner_id.to_string(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn expense(description: &str, category: &str) -> NewEntry {
        NewEntry {
            kind: EntryKind::Expense,
            amount: 20.0,
            description: description.to_string(),
            category: category.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_profile_created_lazily() {
        let store = InMemoryStore::new();
        let profile = store.get_profile("owner").await.unwrap();
        assert_eq!(profile.owner_id, "owner");
        assert!(!profile.expense_categories.is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_across_owners() {
        let store = InMemoryStore::new();
        let a = store.create_entry("a", expense("pão", "alimentação")).await.unwrap();
        let b = store.create_entry("b", expense("uber", "transporte")).await.unwrap();
        let c = store.create_entry("a", expense("café", "alimentação")).await.unwrap();

        assert!(a.id < b.id && b.id < c.id);
        assert_eq!(store.list_entries("a").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_commit_appends_new_category() {
        let store = InMemoryStore::new();
        let state = ConversationState::new("owner");
        store
            .commit_entry("owner", expense("ração", "pets"), &state)
            .await
            .unwrap();

        let profile = store.get_profile("owner").await.unwrap();
        assert!(profile.expense_categories.iter().any(|c| c == "pets"));
        assert!(!profile.income_categories.iter().any(|c| c == "pets"));
    }

    #[tokio::test]
    async fn test_commit_saves_next_state_with_entry() {
        use crate::state::DialogState;

        let store = InMemoryStore::new();
        let mut waiting = ConversationState::new("owner");
        waiting.transition(DialogState::AwaitingDescription { amount: 20.0 });
        store.put_state("owner", &waiting).await.unwrap();

        let idle = ConversationState::new("owner");
        let entry = store
            .commit_entry("owner", expense("almoço", "alimentação"), &idle)
            .await
            .unwrap();

        assert_eq!(store.list_entries("owner").await.unwrap(), vec![entry]);
        assert_eq!(store.get_state("owner").await.unwrap(), Some(idle));
    }

    #[tokio::test]
    async fn test_delete_respects_owner() {
        let store = InMemoryStore::new();
        let entry = store.create_entry("a", expense("pão", "alimentação")).await.unwrap();

        assert!(store.delete_entry("b", entry.id).await.unwrap().is_none());
        assert_eq!(
            store.delete_entry("a", entry.id).await.unwrap().map(|e| e.id),
            Some(entry.id)
        );
        assert!(store.delete_entry("a", entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_state_is_none() {
        let store = InMemoryStore::new();
        assert!(store.get_state("nobody").await.unwrap().is_none());

        let state = ConversationState::new("owner");
        store.put_state("owner", &state).await.unwrap();
        assert_eq!(store.get_state("owner").await.unwrap(), Some(state));
    }
}
