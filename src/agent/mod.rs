//! Conversation agent
//!
//! Drives the per-owner dialog state machine. Every inbound message is
//! handled under the owner's lock: the state is loaded, advanced by exactly
//! one step and written back. When a collaborator fails the state is not
//! written, so the owner can simply resend. Completing an entry stores the
//! entry and the idle state together, so a resend never records it twice.
//!
//! FLOW:
//! LOAD STATE → OVERRIDE? → FLOW STEP | MENU OPTION | CLASSIFY → DISPATCH → SAVE STATE

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::categorizer::{categorize, Categorizer, LearnedCategorizer, RuleCategorizer};
use crate::classifier::IntentClassifier;
use crate::clock::{Clock, SystemClock};
use crate::config::AgentConfig;
use crate::models::{CategorizerMode, EntryKind, LedgerEntry, NewEntry};
use crate::state::{ConversationState, DialogState};
use crate::store::LedgerStore;
use crate::Result;

pub mod flow;
pub mod handlers;
pub mod replies;

pub use flow::{MenuOption, MENU_OPTIONS};

/// Words that always return to the menu, whatever the current state
pub const OVERRIDE_WORDS: &[&str] = &[
    "menu", "início", "inicio", "home", "voltar", "back", "ajuda", "help", "cancelar", "cancel",
];

pub fn is_global_override(normalized: &str) -> bool {
    OVERRIDE_WORDS.contains(&normalized)
}

/// One async mutex per owner, created on first use and dropped once no
/// message for that owner is in flight
#[derive(Default)]
struct OwnerLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    async fn acquire(&self, owner_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().await;
            table.entry(owner_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Forget the owner's lock when the table holds the only reference
    async fn release(&self, owner_id: &str, guard: OwnedMutexGuard<()>) {
        let mut table = self.table.lock().await;
        drop(guard);

        let idle = table
            .get(owner_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            table.remove(owner_id);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.table.lock().await.len()
    }
}

pub struct Agent {
    store: Arc<dyn LedgerStore>,
    classifier: IntentClassifier,
    config: AgentConfig,
    clock: Arc<dyn Clock>,
    rng: std::sync::Mutex<StdRng>,
    locks: OwnerLocks,
}

impl Agent {
    pub fn new(store: Arc<dyn LedgerStore>, config: AgentConfig) -> Self {
        Self {
            store,
            classifier: IntentClassifier::with_boost(config.history_boost),
            config,
            clock: Arc::new(SystemClock),
            rng: std::sync::Mutex::new(StdRng::from_entropy()),
            locks: OwnerLocks::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Deterministic tip sampling
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = std::sync::Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Handle a message stamped with the agent clock
    pub async fn handle(&self, owner_id: &str, raw_text: &str) -> String {
        let now = self.clock.now();
        self.handle_message(owner_id, raw_text, now).await
    }

    /// Handle one inbound message and return the reply text.
    ///
    /// Never fails: collaborator errors become an apology and leave the
    /// stored state untouched.
    pub async fn handle_message(&self, owner_id: &str, raw_text: &str, now: DateTime<Utc>) -> String {
        let guard = self.locks.acquire(owner_id).await;

        let reply = match self.process(owner_id, raw_text, now).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    owner_id = %owner_id,
                    error = %error,
                    "Message handling failed, state left unchanged"
                );
                replies::apology()
            }
        };

        self.locks.release(owner_id, guard).await;
        reply
    }

    async fn process(&self, owner_id: &str, raw_text: &str, now: DateTime<Utc>) -> Result<String> {
        let mut state = self
            .store
            .get_state(owner_id)
            .await?
            .unwrap_or_else(|| ConversationState::new(owner_id));

        let before = state.dialog.name();
        let reply = self.step(&mut state, raw_text, now).await?;

        if let Err(error) = self.store.put_state(owner_id, &state).await {
            // A completed entry already saved this state alongside it
            match self.store.get_state(owner_id).await {
                Ok(Some(stored)) if stored == state => {
                    warn!(owner_id = %owner_id, error = %error, "State write failed, already persisted");
                }
                _ => return Err(error),
            }
        }

        debug!(
            owner_id = %owner_id,
            from = before,
            to = state.dialog.name(),
            "Dialog advanced"
        );

        Ok(reply)
    }

    async fn step(&self, state: &mut ConversationState, raw_text: &str, now: DateTime<Utc>) -> Result<String> {
        let text = raw_text.trim();
        let normalized = text.to_lowercase();

        if is_global_override(&normalized) {
            info!(owner_id = %state.owner_id, word = %normalized, "Override, back to menu");
            state.transition(DialogState::Menu);
            return Ok(replies::menu());
        }

        let outcome = match state.dialog.clone() {
            DialogState::Idle => self.route_command(state, text, now).await,
            DialogState::Menu => match MenuOption::parse(&normalized) {
                Some(option) => self.select_menu_option(state, option, now).await,
                None => self.route_command(state, text, now).await,
            },
            DialogState::AwaitingDescription { amount } => {
                self.receive_description(state, amount, text, now).await
            }
            DialogState::CollectingAmount { kind } => self.receive_amount(state, kind, text),
            DialogState::CollectingDescription { kind, amount } => {
                self.receive_flow_description(state, kind, amount, text).await
            }
            DialogState::CollectingCategory {
                kind,
                amount,
                description,
                options,
            } => {
                self.receive_category(state, kind, amount, description, &options, text, now)
                    .await
            }
        };

        match outcome {
            Err(error) => match replies::for_error(&error) {
                Some(reply) => {
                    debug!(owner_id = %state.owner_id, error = %error, "Recovered locally");
                    Ok(reply)
                }
                None => Err(error),
            },
            ok => ok,
        }
    }

    /// Categorizer for the owner: profile preference, then configuration
    async fn categorizer_for(&self, owner_id: &str, kind: EntryKind) -> Result<Box<dyn Categorizer>> {
        let profile = self.store.get_profile(owner_id).await?;
        let mode = profile.categorizer.unwrap_or(self.config.categorizer);

        Ok(match mode {
            CategorizerMode::Rules => Box::new(RuleCategorizer::new()),
            CategorizerMode::Learned => {
                let entries = self.store.list_entries(owner_id).await?;
                Box::new(LearnedCategorizer::from_history(&entries, kind))
            }
        })
    }

    /// Categorize and persist a quick expense, settling the dialog back to
    /// idle in the same store write
    async fn record_quick_expense(
        &self,
        state: &mut ConversationState,
        amount: f64,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        let owner_id = state.owner_id.clone();
        let strategy = self.categorizer_for(&owner_id, EntryKind::Expense).await?;
        let category = categorize(strategy.as_ref(), Some(&description));

        state.transition(DialogState::Idle);
        let entry = self
            .store
            .commit_entry(
                &owner_id,
                NewEntry {
                    kind: EntryKind::Expense,
                    amount,
                    description,
                    category,
                    timestamp: now,
                },
                state,
            )
            .await?;

        info!(
            owner_id = %owner_id,
            entry_id = entry.id,
            category = %entry.category,
            strategy = strategy.name(),
            "Expense recorded"
        );

        Ok(entry)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::AgentError;
    use crate::models::UserProfile;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use chrono::TimeZone;

    pub fn may_15() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    pub fn agent() -> (Agent, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let agent = Agent::new(store.clone(), AgentConfig::default()).with_rng_seed(7);
        (agent, store)
    }

    /// Every call fails as if the database were down
    pub struct FailingStore;

    fn down() -> AgentError {
        AgentError::StoreUnavailable("connection refused".to_string())
    }

    #[async_trait]
    impl LedgerStore for FailingStore {
        async fn get_profile(&self, _owner_id: &str) -> Result<UserProfile> {
            Err(down())
        }
        async fn put_profile(&self, _profile: &UserProfile) -> Result<()> {
            Err(down())
        }
        async fn append_category(&self, _owner_id: &str, _kind: EntryKind, _label: &str) -> Result<()> {
            Err(down())
        }
        async fn list_entries(&self, _owner_id: &str) -> Result<Vec<LedgerEntry>> {
            Err(down())
        }
        async fn create_entry(&self, _owner_id: &str, _entry: NewEntry) -> Result<LedgerEntry> {
            Err(down())
        }
        async fn commit_entry(
            &self,
            _owner_id: &str,
            _entry: NewEntry,
            _next_state: &ConversationState,
        ) -> Result<LedgerEntry> {
            Err(down())
        }
        async fn delete_entry(&self, _owner_id: &str, _entry_id: u64) -> Result<Option<LedgerEntry>> {
            Err(down())
        }
        async fn get_state(&self, _owner_id: &str) -> Result<Option<ConversationState>> {
            Err(down())
        }
        async fn put_state(&self, _owner_id: &str, _state: &ConversationState) -> Result<()> {
            Err(down())
        }
    }
}
