//! Intent Classifier
//!
//! Maps a raw message to exactly one [`Intent`]. Every trigger is evaluated;
//! the matching intent with the highest weight wins. Intents the user asked
//! for recently get their weight boosted, so history can flip the winner
//! between two intents that both match.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::extractor;

/// Closed set of intents. Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    AddExpense,
    ListExpenses,
    FinancialSummary,
    SearchExpenses,
    SetBudget,
    SetGoal,
    CategoryAnalysis,
    Forecast,
    CompareMonths,
    Recommendation,
    Configure,
    RemoveExpense,
    TrainModel,
    Help,
    Unknown,
}

/// Default number of recent intents remembered per owner
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Weight multiplier for intents present in the recent history
pub const DEFAULT_HISTORY_BOOST: f64 = 1.2;

/// Static trigger table: (intent, pattern, base weight)
const TRIGGERS: &[(Intent, &str, f64)] = &[
    (
        Intent::Greeting,
        r"^(?:oi|olá|ola|bom dia|boa tarde|boa noite|e aí|eai|hello|hi)\b",
        0.6,
    ),
    (
        Intent::AddExpense,
        r"\b(?:gastei|paguei|comprei|adicionar|adicione|registrar|registre|lançar)\b",
        0.9,
    ),
    (
        Intent::ListExpenses,
        r"\b(?:listar|liste|lista|extrato|lançamentos|meus gastos)\b",
        0.8,
    ),
    (
        Intent::FinancialSummary,
        r"\b(?:resumo|total|saldo|balanço)\b",
        0.8,
    ),
    (
        Intent::SearchExpenses,
        r"\b(?:buscar|busque|busca|procurar|procure|pesquisar|encontrar)\b",
        0.85,
    ),
    (Intent::SetBudget, r"\b(?:orçamento|orcamento|limite)\b", 0.85),
    (Intent::SetGoal, r"\b(?:meta|objetivo|economizar)\b", 0.8),
    (
        Intent::CategoryAnalysis,
        r"\b(?:categoria|categorias|análise|analise)\b",
        0.75,
    ),
    (
        Intent::Forecast,
        r"\b(?:previsão|previsao|prever|projeção|projecao)\b",
        0.9,
    ),
    (
        Intent::CompareMonths,
        r"\b(?:comparar|compare|comparação|comparacao|mês passado|mes passado)\b",
        0.85,
    ),
    (
        Intent::Recommendation,
        r"\b(?:dica|dicas|recomendação|recomendacao|recomendações|sugestão|sugestao|conselho)\b",
        0.8,
    ),
    (
        Intent::Configure,
        r"\b(?:configurar|configuração|configuracao|config)\b",
        0.7,
    ),
    (
        Intent::RemoveExpense,
        r"\b(?:remover|remove|remova|deletar|delete|apagar|apague|excluir|exclua)\b",
        0.95,
    ),
    (
        Intent::TrainModel,
        r"\b(?:treinar|treine|treinamento|aprender)\b",
        0.7,
    ),
    (Intent::Help, r"\b(?:ajuda|help|comandos|socorro)\b", 0.7),
];

lazy_static! {
    static ref COMPILED_TRIGGERS: Vec<(Intent, Regex, f64)> = TRIGGERS
        .iter()
        .map(|(intent, pattern, weight)| {
            (
                *intent,
                Regex::new(pattern).expect("static intent trigger"),
                *weight,
            )
        })
        .collect();
}

impl Intent {
    /// Declaration order of the enum
    fn rank(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::AddExpense => "add_expense",
            Intent::ListExpenses => "list_expenses",
            Intent::FinancialSummary => "financial_summary",
            Intent::SearchExpenses => "search_expenses",
            Intent::SetBudget => "set_budget",
            Intent::SetGoal => "set_goal",
            Intent::CategoryAnalysis => "category_analysis",
            Intent::Forecast => "forecast",
            Intent::CompareMonths => "compare_months",
            Intent::Recommendation => "recommendation",
            Intent::Configure => "configure",
            Intent::RemoveExpense => "remove_expense",
            Intent::TrainModel => "train_model",
            Intent::Help => "help",
            Intent::Unknown => "unknown",
        }
    }
}

/// Bounded window of recently recognized intents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntentHistory {
    intents: VecDeque<Intent>,
}

impl IntentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an intent, dropping the oldest beyond `window`
    pub fn record(&mut self, intent: Intent, window: usize) {
        self.intents.push_back(intent);
        while self.intents.len() > window {
            self.intents.pop_front();
        }
    }

    pub fn contains(&self, intent: Intent) -> bool {
        self.intents.contains(&intent)
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }
}

/// Weighted trigger classifier
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    history_boost: f64,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::with_boost(DEFAULT_HISTORY_BOOST)
    }

    pub fn with_boost(history_boost: f64) -> Self {
        Self { history_boost }
    }

    /// Every intent whose trigger matches, with its history-adjusted weight
    pub fn scores(&self, text: &str, history: &IntentHistory) -> Vec<(Intent, f64)> {
        let normalized = text.trim().to_lowercase();

        COMPILED_TRIGGERS
            .iter()
            .filter(|(_, regex, _)| regex.is_match(&normalized))
            .map(|(intent, _, weight)| {
                let adjusted = if history.contains(*intent) {
                    weight * self.history_boost
                } else {
                    *weight
                };
                (*intent, adjusted)
            })
            .collect()
    }

    pub fn classify(&self, text: &str, history: &IntentHistory) -> Intent {
        let mut best: Option<(Intent, f64)> = None;

        for (intent, weight) in self.scores(text, history) {
            let replace = match best {
                None => true,
                Some((current, best_weight)) => {
                    weight > best_weight
                        || (weight == best_weight && intent.rank() < current.rank())
                }
            };
            if replace {
                best = Some((intent, weight));
            }
        }

        if let Some((intent, _)) = best {
            return intent;
        }

        if text.chars().any(|c| c.is_ascii_digit()) && extractor::has_currency_marker(text) {
            Intent::AddExpense
        } else {
            Intent::Unknown
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        IntentClassifier::new().classify(text, &IntentHistory::new())
    }

    #[test]
    fn test_single_trigger_intents() {
        let cases = vec![
            ("oi", Intent::Greeting),
            ("gastei 50 no almoço", Intent::AddExpense),
            ("listar", Intent::ListExpenses),
            ("total", Intent::FinancialSummary),
            ("buscar mercado", Intent::SearchExpenses),
            ("orçamento lazer 300", Intent::SetBudget),
            ("meta 1000 viagem", Intent::SetGoal),
            ("previsão", Intent::Forecast),
            ("comparar meses", Intent::CompareMonths),
            ("me dá uma dica", Intent::Recommendation),
            ("remover 7", Intent::RemoveExpense),
            ("delete 3", Intent::RemoveExpense),
            ("remove 3", Intent::RemoveExpense),
            ("deletar 3", Intent::RemoveExpense),
            ("treinar", Intent::TrainModel),
            ("comandos", Intent::Help),
        ];

        for (text, expected) in cases {
            assert_eq!(classify(text), expected, "text: {}", text);
        }
    }

    #[test]
    fn test_highest_weight_wins_over_order() {
        // remove (0.95) outranks list (0.8) although list is declared first
        assert_eq!(classify("listar e remover 3"), Intent::RemoveExpense);
    }

    #[test]
    fn test_tie_broken_by_declaration_order() {
        // list_expenses and financial_summary share 0.8
        assert_eq!(classify("listar total"), Intent::ListExpenses);
    }

    #[test]
    fn test_history_flips_winner() {
        let classifier = IntentClassifier::new();
        let mut history = IntentHistory::new();
        history.record(Intent::FinancialSummary, DEFAULT_HISTORY_WINDOW);

        assert_eq!(
            classifier.classify("listar total", &history),
            Intent::FinancialSummary
        );
    }

    #[test]
    fn test_currency_fallback() {
        assert_eq!(classify("50 reais pizza"), Intent::AddExpense);
        assert_eq!(classify("R$ 12,50 sorvete"), Intent::AddExpense);
        assert_eq!(classify("pizza reais"), Intent::Unknown);
        assert_eq!(classify("3"), Intent::Unknown);
        assert_eq!(classify("blá blá"), Intent::Unknown);
    }

    #[test]
    fn test_history_window_is_bounded() {
        let mut history = IntentHistory::new();
        history.record(Intent::Forecast, 3);
        for _ in 0..3 {
            history.record(Intent::Help, 3);
        }

        assert_eq!(history.len(), 3);
        assert!(!history.contains(Intent::Forecast));
        assert!(history.contains(Intent::Help));
    }

    #[test]
    fn test_scores_report_every_match() {
        let scores = IntentClassifier::new().scores("listar total", &IntentHistory::new());
        let intents: Vec<Intent> = scores.iter().map(|(intent, _)| *intent).collect();
        assert_eq!(intents, vec![Intent::ListExpenses, Intent::FinancialSummary]);
    }
}
