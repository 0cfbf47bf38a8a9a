//! Frequency-learned categorizer
//!
//! Plain counting, not a trained model: every token longer than two
//! characters votes for the categories it has been seen with, weighted by
//! how often it appeared with each one. The model is rebuilt from ledger
//! history on demand and never persisted, so replaying the same history
//! always produces the same model.

use std::collections::{BTreeMap, HashMap};

use super::{Categorizer, UNCATEGORIZED};
use crate::models::{EntryKind, LedgerEntry};

/// Minimum token length (exclusive) that counts as a signal
const MIN_TOKEN_CHARS: usize = 2;

/// Lower-case whitespace tokenizer shared by training and prediction
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| word.chars().count() > MIN_TOKEN_CHARS)
}

/// Token/category occurrence counts
#[derive(Debug, Clone, Default)]
pub struct CategoryModel {
    /// Category labels in first-seen order
    labels: Vec<String>,
    label_index: HashMap<String, usize>,
    /// token → (label index → count)
    token_counts: HashMap<String, BTreeMap<usize, u32>>,
    /// label index → number of entries carrying it
    label_totals: Vec<u32>,
    trained_on: usize,
}

impl CategoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model by replaying entries in order
    pub fn train<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let mut model = Self::new();
        for entry in entries {
            model.observe(&entry.description, &entry.category);
        }
        model
    }

    pub fn observe(&mut self, description: &str, category: &str) {
        let label = self.label_slot(category);
        self.label_totals[label] += 1;
        self.trained_on += 1;

        for token in tokenize(description) {
            *self
                .token_counts
                .entry(token)
                .or_default()
                .entry(label)
                .or_insert(0) += 1;
        }
    }

    fn label_slot(&mut self, category: &str) -> usize {
        if let Some(&index) = self.label_index.get(category) {
            return index;
        }

        let index = self.labels.len();
        self.labels.push(category.to_string());
        self.label_index.insert(category.to_string(), index);
        self.label_totals.push(0);
        index
    }

    pub fn token_count(&self, token: &str, category: &str) -> u32 {
        let Some(&label) = self.label_index.get(category) else {
            return 0;
        };

        self.token_counts
            .get(token)
            .and_then(|per_label| per_label.get(&label))
            .copied()
            .unwrap_or(0)
    }

    pub fn category_total(&self, category: &str) -> u32 {
        self.label_index
            .get(category)
            .map(|&label| self.label_totals[label])
            .unwrap_or(0)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.token_counts.len()
    }

    pub fn category_count(&self) -> usize {
        self.labels.len()
    }

    pub fn trained_on(&self) -> usize {
        self.trained_on
    }

    /// Most frequent category in history, first-seen on ties
    pub fn most_frequent(&self) -> Option<&str> {
        let mut best: Option<(usize, u32)> = None;

        for (label, &total) in self.label_totals.iter().enumerate() {
            if best.map_or(true, |(_, best_total)| total > best_total) {
                best = Some((label, total));
            }
        }

        best.map(|(label, _)| self.labels[label].as_str())
    }

    pub fn predict(&self, description: &str) -> String {
        // (label, score) in the order each label first received a vote
        let mut scores: Vec<(usize, f64)> = Vec::new();

        for token in tokenize(description) {
            let Some(per_label) = self.token_counts.get(&token) else {
                continue;
            };

            let token_total: u32 = per_label.values().sum();
            if token_total == 0 {
                continue;
            }

            for (&label, &count) in per_label {
                let vote = count as f64 / token_total as f64;
                match scores.iter_mut().find(|(seen, _)| *seen == label) {
                    Some(slot) => slot.1 += vote,
                    None => scores.push((label, vote)),
                }
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (label, score) in scores {
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((label, score));
            }
        }

        match best {
            Some((label, _)) => self.labels[label].clone(),
            None => self
                .most_frequent()
                .unwrap_or(UNCATEGORIZED)
                .to_string(),
        }
    }
}

/// Categorizer backed by a [`CategoryModel`]
pub struct LearnedCategorizer {
    model: CategoryModel,
}

impl LearnedCategorizer {
    pub fn new(model: CategoryModel) -> Self {
        Self { model }
    }

    /// Train on the owner's entries of one kind
    pub fn from_history(entries: &[LedgerEntry], kind: EntryKind) -> Self {
        Self::new(CategoryModel::train(
            entries.iter().filter(|entry| entry.kind == kind),
        ))
    }

    pub fn model(&self) -> &CategoryModel {
        &self.model
    }
}

impl Categorizer for LearnedCategorizer {
    fn name(&self) -> &'static str {
        "learned"
    }

    fn classify(&self, description: &str) -> String {
        self.model.predict(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(id: u64, description: &str, category: &str) -> LedgerEntry {
        LedgerEntry {
            id,
            owner_id: "owner".to_string(),
            kind: EntryKind::Expense,
            amount: 10.0,
            description: description.to_string(),
            category: category.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, id as u32 % 28 + 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_seen_token_decides_category() {
        let history = vec![
            entry(1, "mercado do bairro", "alimentação"),
            entry(2, "uber centro", "transporte"),
            entry(3, "mercado grande", "alimentação"),
        ];
        let categorizer = LearnedCategorizer::from_history(&history, EntryKind::Expense);

        assert_eq!(categorizer.classify("mercado novo"), "alimentação");
    }

    #[test]
    fn test_normalized_votes() {
        let history = vec![
            entry(1, "uber", "transporte"),
            entry(2, "uber", "transporte"),
            entry(3, "uber", "transporte"),
            entry(4, "uber show", "lazer"),
        ];
        let model = CategoryModel::train(&history);

        assert_eq!(model.token_count("uber", "transporte"), 3);
        assert_eq!(model.token_count("show", "lazer"), 1);
        // transporte: 0.75, lazer: 0.25 + 1.0
        assert_eq!(model.predict("uber show"), "lazer");
        assert_eq!(model.predict("uber"), "transporte");
    }

    #[test]
    fn test_short_tokens_ignored() {
        let history = vec![entry(1, "pé de moleque", "doces")];
        let model = CategoryModel::train(&history);

        assert_eq!(model.token_count("pé", "doces"), 0);
        assert_eq!(model.token_count("de", "doces"), 0);
        assert_eq!(model.token_count("moleque", "doces"), 1);
    }

    #[test]
    fn test_tie_goes_to_first_voted_category() {
        let history = vec![
            entry(1, "pastel", "lanches"),
            entry(2, "cerveja", "bebidas"),
        ];
        let model = CategoryModel::train(&history);

        assert_eq!(model.predict("cerveja pastel"), "bebidas");
        assert_eq!(model.predict("pastel cerveja"), "lanches");
    }

    #[test]
    fn test_unknown_tokens_fall_back_to_most_frequent() {
        let history = vec![
            entry(1, "aluguel", "moradia"),
            entry(2, "uber", "transporte"),
            entry(3, "metrô", "transporte"),
        ];
        let model = CategoryModel::train(&history);

        assert_eq!(model.predict("presente"), "transporte");
        assert_eq!(model.category_total("transporte"), 2);
    }

    #[test]
    fn test_empty_history_is_uncategorized() {
        let model = CategoryModel::new();
        assert_eq!(model.predict("qualquer coisa"), UNCATEGORIZED);
        assert_eq!(model.trained_on(), 0);
    }

    #[test]
    fn test_replay_is_reproducible() {
        let history = vec![
            entry(1, "padaria", "alimentação"),
            entry(2, "padaria", "lanches"),
            entry(3, "ônibus", "transporte"),
        ];

        let first = CategoryModel::train(&history);
        let second = CategoryModel::train(&history);

        assert_eq!(first.predict("padaria"), second.predict("padaria"));
        assert_eq!(first.vocabulary_size(), second.vocabulary_size());
        assert_eq!(first.category_count(), 3);
    }
}
