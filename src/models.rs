//! Core data models for the ledger agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::categorizer::rules::RULE_TABLE;

/// Labels every new profile starts with on the income side
pub const DEFAULT_INCOME_CATEGORIES: &[&str] = &["salário", "freelance", "investimentos"];

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(EntryKind::Income),
            "expense" => Some(EntryKind::Expense),
            _ => None,
        }
    }

    /// Portuguese noun used in replies
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Income => "Receita",
            EntryKind::Expense => "Despesa",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategorizerMode {
    #[default]
    Rules,
    Learned,
}

impl CategorizerMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "rules" | "regras" => Some(CategorizerMode::Rules),
            "learned" | "aprendizado" | "ml" => Some(CategorizerMode::Learned),
            _ => None,
        }
    }
}

//
// ================= Ledger =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: u64,
    pub owner_id: String,
    pub kind: EntryKind,
    /// Unsigned magnitude; the sign lives in `kind`
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    /// `YYYY-MM` bucket of the entry timestamp
    pub fn period(&self) -> String {
        self.timestamp.format("%Y-%m").to_string()
    }
}

/// Fields of an entry before the store assigns its id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
}

impl NewEntry {
    pub fn into_entry(self, id: u64, owner_id: &str) -> LedgerEntry {
        LedgerEntry {
            id,
            owner_id: owner_id.to_string(),
            kind: self.kind,
            amount: self.amount,
            description: self.description,
            category: self.category,
            timestamp: self.timestamp,
        }
    }
}

//
// ================= Profile =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsGoal {
    pub label: String,
    pub target: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub owner_id: String,
    pub income_categories: Vec<String>,
    pub expense_categories: Vec<String>,
    /// Monthly limit per expense category
    #[serde(default)]
    pub budgets: BTreeMap<String, f64>,
    #[serde(default)]
    pub goal: Option<SavingsGoal>,
    /// Overrides the process-wide categorizer when set
    #[serde(default)]
    pub categorizer: Option<CategorizerMode>,
}

impl UserProfile {
    pub fn new(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            income_categories: DEFAULT_INCOME_CATEGORIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            expense_categories: RULE_TABLE
                .iter()
                .map(|(label, _)| label.to_string())
                .collect(),
            budgets: BTreeMap::new(),
            goal: None,
            categorizer: None,
        }
    }

    pub fn categories(&self, kind: EntryKind) -> &[String] {
        match kind {
            EntryKind::Income => &self.income_categories,
            EntryKind::Expense => &self.expense_categories,
        }
    }

    /// Append a label if it is not already known. Returns true when added.
    pub fn append_category(&mut self, kind: EntryKind, label: &str) -> bool {
        let list = match kind {
            EntryKind::Income => &mut self.income_categories,
            EntryKind::Expense => &mut self.expense_categories,
        };

        if list.iter().any(|existing| existing == label) {
            return false;
        }

        list.push(label.to_string());
        true
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for CategorizerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CategorizerMode::Rules => "regras",
            CategorizerMode::Learned => "aprendizado",
        };
        write!(f, "{}", s)
    }
}
