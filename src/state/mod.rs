//! Per-owner conversation state
//!
//! One [`ConversationState`] exists per owner. Pending fields live inside the
//! [`DialogState`] variant that needs them, so a state can never carry data
//! that does not belong to it.

use serde::{Deserialize, Serialize};

use crate::classifier::{Intent, IntentHistory};
use crate::models::EntryKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DialogState {
    #[default]
    Idle,
    /// Menu text was shown; numbered selections are accepted
    Menu,
    /// Amount captured from a one-line command, description pending
    AwaitingDescription { amount: f64 },
    CollectingAmount { kind: EntryKind },
    CollectingDescription { kind: EntryKind, amount: f64 },
    CollectingCategory {
        kind: EntryKind,
        amount: f64,
        description: String,
        /// Categories exactly as numbered in the prompt
        options: Vec<String>,
    },
}

impl DialogState {
    pub fn name(&self) -> &'static str {
        match self {
            DialogState::Idle => "idle",
            DialogState::Menu => "menu",
            DialogState::AwaitingDescription { .. } => "awaiting_description",
            DialogState::CollectingAmount { .. } => "collecting_amount",
            DialogState::CollectingDescription { .. } => "collecting_description",
            DialogState::CollectingCategory { .. } => "collecting_category",
        }
    }

    /// Idle and menu accept fresh commands; everything else is mid-flow
    pub fn is_resting(&self) -> bool {
        matches!(self, DialogState::Idle | DialogState::Menu)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    pub owner_id: String,
    pub dialog: DialogState,
    /// Survives resets; only bias for the classifier
    #[serde(default)]
    pub recent_intents: IntentHistory,
}

impl ConversationState {
    pub fn new(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            dialog: DialogState::Idle,
            recent_intents: IntentHistory::new(),
        }
    }

    /// Move to `next`, discarding whatever the current state was holding
    pub fn transition(&mut self, next: DialogState) {
        self.dialog = next;
    }

    pub fn remember(&mut self, intent: Intent, window: usize) {
        if intent != Intent::Unknown {
            self.recent_intents.record(intent, window);
        }
    }
}
