//! Guided menu flow
//!
//! Menu options and the multi-step collection states. Each receiver handles
//! the message for one state and either advances it or returns a parse
//! error, which the agent recovers without touching the state.

use chrono::{DateTime, Utc};
use tracing::info;

use super::{replies, Agent};
use crate::classifier::Intent;
use crate::error::AgentError;
use crate::extractor;
use crate::models::{EntryKind, NewEntry};
use crate::state::{ConversationState, DialogState};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    RegisterExpense,
    RegisterIncome,
    Statement,
    Summary,
    Forecast,
    Tips,
}

/// (option, number, aliases, menu label)
pub const MENU_OPTIONS: &[(MenuOption, &str, &[&str], &str)] = &[
    (MenuOption::RegisterExpense, "1", &["despesa", "registrar despesa"], "Registrar despesa"),
    (MenuOption::RegisterIncome, "2", &["receita", "registrar receita"], "Registrar receita"),
    (MenuOption::Statement, "3", &["extrato"], "Ver extrato"),
    (MenuOption::Summary, "4", &["resumo"], "Resumo do mês"),
    (MenuOption::Forecast, "5", &["previsão", "previsao"], "Previsão de gastos"),
    (MenuOption::Tips, "6", &["dicas"], "Dicas de economia"),
];

impl MenuOption {
    /// Match a normalized message against the option numbers and aliases
    pub fn parse(normalized: &str) -> Option<Self> {
        MENU_OPTIONS
            .iter()
            .find(|(_, number, aliases, _)| *number == normalized || aliases.contains(&normalized))
            .map(|(option, ..)| *option)
    }

    /// Intent recorded in the owner's history for this option
    pub fn intent(&self) -> Intent {
        match self {
            MenuOption::RegisterExpense | MenuOption::RegisterIncome => Intent::AddExpense,
            MenuOption::Statement => Intent::ListExpenses,
            MenuOption::Summary => Intent::FinancialSummary,
            MenuOption::Forecast => Intent::Forecast,
            MenuOption::Tips => Intent::Recommendation,
        }
    }
}

/// Amount typed on its own, optionally prefixed with `R$`
fn parse_flow_amount(text: &str) -> Option<f64> {
    let lowered = text.trim().to_lowercase();
    let bare = lowered.trim_start_matches("r$").trim();

    extractor::parse_decimal(bare).filter(|amount| *amount > 0.0)
}

impl Agent {
    pub(super) async fn select_menu_option(
        &self,
        state: &mut ConversationState,
        option: MenuOption,
        now: DateTime<Utc>,
    ) -> Result<String> {
        info!(owner_id = %state.owner_id, option = ?option, "Menu option selected");
        state.remember(option.intent(), self.config.intent_history_window);

        let owner_id = state.owner_id.clone();
        let reply = match option {
            MenuOption::RegisterExpense | MenuOption::RegisterIncome => {
                let kind = if option == MenuOption::RegisterExpense {
                    EntryKind::Expense
                } else {
                    EntryKind::Income
                };
                state.transition(DialogState::CollectingAmount { kind });
                return Ok(replies::ask_amount(kind));
            }
            MenuOption::Statement => self.statement(&owner_id, "").await?,
            MenuOption::Summary => self.summary(&owner_id, "", now).await?,
            MenuOption::Forecast => self.forecast(&owner_id, "").await?,
            MenuOption::Tips => self.recommendation(&owner_id).await?,
        };

        state.transition(DialogState::Idle);
        Ok(reply)
    }

    /// Description for an amount captured from a one-line command
    pub(super) async fn receive_description(
        &self,
        state: &mut ConversationState,
        amount: f64,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        if text.is_empty() {
            return Ok(replies::ask_description(amount));
        }

        let entry = self
            .record_quick_expense(state, amount, text.to_string(), now)
            .await?;

        Ok(replies::entry_recorded(&entry))
    }

    pub(super) fn receive_amount(
        &self,
        state: &mut ConversationState,
        kind: EntryKind,
        text: &str,
    ) -> Result<String> {
        let amount = parse_flow_amount(text).ok_or_else(|| {
            AgentError::Parse("Valor inválido. Envie só o número, por exemplo 25,90".to_string())
        })?;

        state.transition(DialogState::CollectingDescription { kind, amount });
        Ok(replies::ask_flow_description(kind, amount))
    }

    pub(super) async fn receive_flow_description(
        &self,
        state: &mut ConversationState,
        kind: EntryKind,
        amount: f64,
        text: &str,
    ) -> Result<String> {
        if text.is_empty() {
            return Ok(replies::ask_flow_description(kind, amount));
        }

        let profile = self.store.get_profile(&state.owner_id).await?;
        let options = profile.categories(kind).to_vec();
        let reply = replies::choose_category(kind, &options);

        state.transition(DialogState::CollectingCategory {
            kind,
            amount,
            description: text.to_string(),
            options,
        });
        Ok(reply)
    }

    /// A number picks a listed category; any other text is a new label
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn receive_category(
        &self,
        state: &mut ConversationState,
        kind: EntryKind,
        amount: f64,
        description: String,
        options: &[String],
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        if text.is_empty() {
            return Ok(replies::choose_category(kind, options));
        }

        let category = match text.parse::<i64>() {
            Ok(choice) => {
                let index = usize::try_from(choice)
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .filter(|index| *index < options.len())
                    .ok_or_else(|| {
                        AgentError::Parse(format!(
                            "Opção {} inválida. Escolha de 1 a {} ou digite o nome de uma nova categoria.",
                            choice,
                            options.len()
                        ))
                    })?;
                options[index].clone()
            }
            Err(_) => text.to_lowercase(),
        };

        let owner_id = state.owner_id.clone();
        state.transition(DialogState::Idle);

        let entry = self
            .store
            .commit_entry(
                &owner_id,
                NewEntry {
                    kind,
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
            kind = kind.as_str(),
            category = %entry.category,
            "Guided entry recorded"
        );

        Ok(replies::entry_recorded(&entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_option_parse() {
        assert_eq!(MenuOption::parse("1"), Some(MenuOption::RegisterExpense));
        assert_eq!(MenuOption::parse("receita"), Some(MenuOption::RegisterIncome));
        assert_eq!(MenuOption::parse("previsao"), Some(MenuOption::Forecast));
        assert_eq!(MenuOption::parse("7"), None);
        assert_eq!(MenuOption::parse("quanto gastei"), None);
    }

    #[test]
    fn test_flow_amount_parsing() {
        assert_eq!(parse_flow_amount("25,90"), Some(25.9));
        assert_eq!(parse_flow_amount("R$ 10"), Some(10.0));
        assert_eq!(parse_flow_amount("0"), None);
        assert_eq!(parse_flow_amount("dez"), None);
    }
}
