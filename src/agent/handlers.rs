//! One-shot intent handlers
//!
//! Routing for messages received while idle (or a free-text message in the
//! menu) and the handlers that answer them in a single step.

use chrono::{DateTime, Utc};
use tracing::info;

use super::{replies, Agent};
use crate::analytics::{self, period_of};
use crate::categorizer::CategoryModel;
use crate::classifier::Intent;
use crate::error::AgentError;
use crate::extractor;
use crate::models::{CategorizerMode, EntryKind, SavingsGoal};
use crate::state::{ConversationState, DialogState};
use crate::Result;

const BUDGET_WORDS: &[&str] = &[
    "orçamento", "orcamento", "limite", "mensal", "definir", "defina", "mês", "mes", "meu",
];

const GOAL_WORDS: &[&str] = &[
    "meta", "objetivo", "economizar", "juntar", "quero", "definir", "defina", "minha",
];

/// Label used when a goal message names no purpose
const DEFAULT_GOAL_LABEL: &str = "economia";

/// Amount in a command that may not carry a currency marker
fn command_amount(text: &str) -> Option<f64> {
    extractor::extract_amount(text)
        .or_else(|| extractor::extract_first_number(text))
        .filter(|amount| *amount > 0.0)
}

impl Agent {
    /// Classify a fresh command and dispatch it
    pub(super) async fn route_command(
        &self,
        state: &mut ConversationState,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let intent = self.classifier.classify(text, &state.recent_intents);

        info!(
            owner_id = %state.owner_id,
            intent = intent.as_str(),
            state = state.dialog.name(),
            "Intent classified"
        );

        state.remember(intent, self.config.intent_history_window);

        match intent {
            Intent::Unknown => return Ok(replies::not_recognized()),
            Intent::Greeting => {
                state.transition(DialogState::Menu);
                return Ok(replies::greeting());
            }
            Intent::Help => {
                state.transition(DialogState::Menu);
                return Ok(replies::menu());
            }
            Intent::AddExpense => return self.add_expense(state, text, now).await,
            _ => {}
        }

        state.transition(DialogState::Idle);
        let owner_id = state.owner_id.clone();

        match intent {
            Intent::ListExpenses => self.statement(&owner_id, text).await,
            Intent::FinancialSummary => self.summary(&owner_id, text, now).await,
            Intent::SearchExpenses => self.search(&owner_id, text).await,
            Intent::SetBudget => self.set_budget(&owner_id, text).await,
            Intent::SetGoal => self.set_goal(&owner_id, text).await,
            Intent::CategoryAnalysis => self.category_analysis(&owner_id).await,
            Intent::Forecast => self.forecast(&owner_id, text).await,
            Intent::CompareMonths => self.compare_months(&owner_id, now).await,
            Intent::Recommendation => self.recommendation(&owner_id).await,
            Intent::Configure => self.configure(&owner_id, text).await,
            Intent::RemoveExpense => self.remove_entry(&owner_id, text).await,
            Intent::TrainModel => self.train_model(&owner_id).await,
            Intent::Greeting | Intent::Help | Intent::AddExpense | Intent::Unknown => {
                Ok(replies::not_recognized())
            }
        }
    }

    async fn add_expense(
        &self,
        state: &mut ConversationState,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let entities = extractor::extract(text);

        match (entities.amount, entities.description) {
            (Some(amount), Some(description)) => {
                let entry = self
                    .record_quick_expense(state, amount, description, now)
                    .await?;
                Ok(replies::entry_recorded(&entry))
            }
            (Some(amount), None) => {
                state.transition(DialogState::AwaitingDescription { amount });
                Ok(replies::ask_description(amount))
            }
            (None, _) => {
                state.transition(DialogState::Idle);
                Err(AgentError::Parse(
                    "Não encontrei o valor. Tente algo como: gastei 50 no almoço".to_string(),
                ))
            }
        }
    }

    /// Entries, optionally filtered by a `YYYY-MM` period in the text
    pub(super) async fn statement(&self, owner_id: &str, text: &str) -> Result<String> {
        let period = extractor::extract_period(text);
        let mut entries = self.store.list_entries(owner_id).await?;

        if let Some(period) = &period {
            entries.retain(|entry| entry.period() == *period);
        }

        Ok(replies::statement(&entries, period.as_deref()))
    }

    pub(super) async fn summary(
        &self,
        owner_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let today = now.date_naive();
        let current = period_of(today);
        let period = extractor::extract_period(text).unwrap_or_else(|| current.clone());

        let entries = self.store.list_entries(owner_id).await?;
        let profile = self.store.get_profile(owner_id).await?;

        let expenses = analytics::period_summary(&entries, EntryKind::Expense, &period);
        let income = analytics::period_total(&entries, EntryKind::Income, &period);
        let all_time_expenses = analytics::total(&entries, EntryKind::Expense);
        let balance =
            analytics::total(&entries, EntryKind::Income) - all_time_expenses;

        let is_current = period == current;
        let comparison = is_current.then(|| analytics::month_over_month(&entries, today));
        let alerts = if is_current {
            analytics::budget_alerts(&entries, &profile.budgets, today)
        } else {
            Vec::new()
        };

        Ok(replies::summary(&replies::SummaryView {
            expenses: &expenses,
            income,
            all_time_expenses,
            balance,
            comparison: comparison.as_ref(),
            alerts: &alerts,
            goal: profile.goal.as_ref(),
        }))
    }

    async fn search(&self, owner_id: &str, text: &str) -> Result<String> {
        let term = extractor::extract_search_term(text).ok_or_else(|| {
            AgentError::Parse("O que devo buscar? Ex: buscar uber".to_string())
        })?;

        let matches: Vec<_> = self
            .store
            .list_entries(owner_id)
            .await?
            .into_iter()
            .filter(|entry| {
                entry.description.to_lowercase().contains(&term)
                    || entry.category.to_lowercase().contains(&term)
            })
            .collect();

        Ok(replies::search_results(&term, &matches))
    }

    async fn set_budget(&self, owner_id: &str, text: &str) -> Result<String> {
        let usage = || {
            AgentError::Parse("Use assim: orçamento alimentação 800".to_string())
        };

        let amount = command_amount(text).ok_or_else(usage)?;
        let category = extractor::extract_description_excluding(text, BUDGET_WORDS)
            .ok_or_else(usage)?;

        let mut profile = self.store.get_profile(owner_id).await?;
        profile.budgets.insert(category.clone(), amount);
        self.store.put_profile(&profile).await?;

        info!(owner_id = %owner_id, category = %category, limit = amount, "Budget set");
        Ok(replies::budget_set(&category, amount))
    }

    async fn set_goal(&self, owner_id: &str, text: &str) -> Result<String> {
        let target = command_amount(text).ok_or_else(|| {
            AgentError::Parse("Use assim: meta viagem 5000".to_string())
        })?;
        let label = extractor::extract_description_excluding(text, GOAL_WORDS)
            .unwrap_or_else(|| DEFAULT_GOAL_LABEL.to_string());

        let mut profile = self.store.get_profile(owner_id).await?;
        let goal = SavingsGoal { label, target };
        profile.goal = Some(goal.clone());
        self.store.put_profile(&profile).await?;

        Ok(replies::goal_set(&goal))
    }

    async fn category_analysis(&self, owner_id: &str) -> Result<String> {
        let entries = self.store.list_entries(owner_id).await?;
        let breakdown = analytics::category_breakdown(
            entries
                .iter()
                .filter(|entry| entry.kind == EntryKind::Expense),
        );

        Ok(replies::category_analysis(&breakdown))
    }

    pub(super) async fn forecast(&self, owner_id: &str, text: &str) -> Result<String> {
        let days = extractor::extract_days(text).unwrap_or(self.config.forecast_days);

        let expenses: Vec<_> = self
            .store
            .list_entries(owner_id)
            .await?
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::Expense)
            .collect();

        let forecast = analytics::forecast(&expenses, days)?;
        Ok(replies::forecast(&forecast))
    }

    async fn compare_months(&self, owner_id: &str, now: DateTime<Utc>) -> Result<String> {
        let entries = self.store.list_entries(owner_id).await?;
        let comparison = analytics::month_over_month(&entries, now.date_naive());

        Ok(replies::comparison(&comparison))
    }

    pub(super) async fn recommendation(&self, owner_id: &str) -> Result<String> {
        let entries = self.store.list_entries(owner_id).await?;

        let recommendations = {
            let mut rng = self
                .rng
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            analytics::recommend(&entries, &mut *rng)
        };

        Ok(replies::recommendations(&recommendations))
    }

    /// Switch the categorizer, or show the current settings
    async fn configure(&self, owner_id: &str, text: &str) -> Result<String> {
        let mut profile = self.store.get_profile(owner_id).await?;
        let requested = text.split_whitespace().find_map(CategorizerMode::parse);

        match requested {
            Some(mode) => {
                profile.categorizer = Some(mode);
                self.store.put_profile(&profile).await?;
                info!(owner_id = %owner_id, mode = %mode, "Categorizer preference saved");
                Ok(replies::categorizer_set(mode))
            }
            None => {
                let mode = profile.categorizer.unwrap_or(self.config.categorizer);
                Ok(replies::settings(mode, &profile))
            }
        }
    }

    async fn remove_entry(&self, owner_id: &str, text: &str) -> Result<String> {
        let entry_id = extractor::extract_entry_id(text).ok_or_else(|| {
            AgentError::Parse("Informe o número do lançamento. Ex: remover 7".to_string())
        })?;

        let removed = self
            .store
            .delete_entry(owner_id, entry_id)
            .await?
            .ok_or(AgentError::NotFound(entry_id))?;

        info!(owner_id = %owner_id, entry_id, "Entry removed");
        Ok(replies::entry_removed(&removed))
    }

    /// Rebuild the learned model from history and report its size
    async fn train_model(&self, owner_id: &str) -> Result<String> {
        let entries = self.store.list_entries(owner_id).await?;
        let model = CategoryModel::train(
            entries
                .iter()
                .filter(|entry| entry.kind == EntryKind::Expense),
        );

        let profile = self.store.get_profile(owner_id).await?;
        let mode = profile.categorizer.unwrap_or(self.config.categorizer);

        Ok(replies::model_trained(&model, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::analytics::FORECAST_WINDOW;
    use crate::models::UserProfile;
    use crate::state::DialogState;
    use crate::store::LedgerStore;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_greeting_shows_menu() {
        let (agent, store) = agent();

        let reply = agent.handle_message("ana", "Oi", may_15()).await;

        assert!(reply.contains("1."));
        let state = store.get_state("ana").await.unwrap().unwrap();
        assert_eq!(state.dialog, DialogState::Menu);
    }

    #[tokio::test]
    async fn test_add_without_amount_is_reported() {
        let (agent, store) = agent();

        let reply = agent.handle_message("ana", "gastei no almoço", may_15()).await;

        assert!(reply.contains("Não encontrei o valor"));
        assert!(store.list_entries("ana").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_command_form_from_legacy_bot() {
        let (agent, store) = agent();

        agent.handle_message("ana", "adicionar 50 mercado", may_15()).await;

        let entries = store.list_entries("ana").await.unwrap();
        assert_eq!(entries[0].amount, 50.0);
        assert_eq!(entries[0].description, "mercado");
    }

    #[tokio::test]
    async fn test_statement_filters_by_period() {
        let (agent, _store) = agent();
        let april = Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap();

        agent.handle_message("ana", "gastei 20 no cinema", april).await;
        agent.handle_message("ana", "gastei 35 no mercado", may_15()).await;

        let reply = agent.handle_message("ana", "listar 2024-04", may_15()).await;
        assert!(reply.contains("cinema"));
        assert!(!reply.contains("mercado"));

        let reply = agent.handle_message("ana", "extrato", may_15()).await;
        assert!(reply.contains("cinema"));
        assert!(reply.contains("mercado"));
    }

    #[tokio::test]
    async fn test_summary_reports_balance_and_alerts() {
        let (agent, store) = agent();

        agent.handle_message("ana", "orçamento alimentação 100", may_15()).await;
        let profile = store.get_profile("ana").await.unwrap();
        assert_eq!(profile.budgets.get("alimentação"), Some(&100.0));

        agent.handle_message("ana", "gastei 90 no mercado", may_15()).await;
        let reply = agent.handle_message("ana", "resumo", may_15()).await;

        assert!(reply.contains("90.00"));
        assert!(reply.contains("alimentação"));
        assert!(reply.contains("Atenção"));
    }

    #[tokio::test]
    async fn test_amounts_with_thousands_separators() {
        let (agent, store) = agent();

        agent.handle_message("ana", "orçamento moradia 1.500", may_15()).await;
        let profile = store.get_profile("ana").await.unwrap();
        assert_eq!(profile.budgets.get("moradia"), Some(&1500.0));

        let reply = agent
            .handle_message("ana", "paguei R$ 1.500,00 no aluguel", may_15())
            .await;
        assert!(reply.contains("1500.00"));

        let entries = store.list_entries("ana").await.unwrap();
        assert_eq!(entries[0].amount, 1500.0);
        assert_eq!(entries[0].category, "moradia");
    }

    #[tokio::test]
    async fn test_search_matches_description() {
        let (agent, _store) = agent();
        agent.handle_message("ana", "paguei 25 no uber", may_15()).await;
        agent.handle_message("ana", "gastei 40 no mercado", may_15()).await;

        let reply = agent.handle_message("ana", "buscar uber", may_15()).await;
        assert!(reply.contains("uber"));
        assert!(!reply.contains("mercado"));
    }

    #[tokio::test]
    async fn test_goal_is_saved() {
        let (agent, store) = agent();

        agent.handle_message("ana", "meta viagem 5000", may_15()).await;

        let goal = store.get_profile("ana").await.unwrap().goal.unwrap();
        assert_eq!(goal.label, "viagem");
        assert_eq!(goal.target, 5000.0);
    }

    #[tokio::test]
    async fn test_forecast_needs_history() {
        let (agent, _store) = agent();
        agent.handle_message("ana", "gastei 10 no café", may_15()).await;

        let reply = agent.handle_message("ana", "previsão", may_15()).await;
        assert!(reply.contains(&FORECAST_WINDOW.to_string()));
    }

    #[tokio::test]
    async fn test_forecast_with_history() {
        let (agent, _store) = agent();
        for day in 0..FORECAST_WINDOW as i64 {
            let at = may_15() - Duration::days(day);
            agent.handle_message("ana", "gastei 10 no café", at).await;
        }

        let reply = agent.handle_message("ana", "previsão 10 dias", may_15()).await;
        assert!(reply.contains("100.00"));
    }

    #[tokio::test]
    async fn test_configure_switches_categorizer() {
        let (agent, store) = agent();

        agent.handle_message("ana", "configurar aprendizado", may_15()).await;

        let profile: UserProfile = store.get_profile("ana").await.unwrap();
        assert_eq!(profile.categorizer, Some(crate::models::CategorizerMode::Learned));
    }

    #[tokio::test]
    async fn test_remove_without_id_is_a_parse_error() {
        let (agent, _store) = agent();

        let reply = agent.handle_message("ana", "remover", may_15()).await;
        assert!(reply.contains("remover 7"));
    }

    #[tokio::test]
    async fn test_train_reports_model_size() {
        let (agent, _store) = agent();
        agent.handle_message("ana", "gastei 10 no café", may_15()).await;
        agent.handle_message("ana", "paguei 25 no uber", may_15()).await;

        let reply = agent.handle_message("ana", "treinar", may_15()).await;
        assert!(reply.contains("2 lançamentos"));
    }

    #[tokio::test]
    async fn test_recommendation_names_top_category() {
        let (agent, _store) = agent();
        agent.handle_message("ana", "paguei 900 no aluguel", may_15()).await;
        agent.handle_message("ana", "gastei 30 no cinema", may_15()).await;

        let reply = agent.handle_message("ana", "dicas", may_15()).await;
        assert!(reply.contains("moradia"));
    }

    #[tokio::test]
    async fn test_compare_months() {
        let (agent, _store) = agent();
        let april = Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap();
        agent.handle_message("ana", "gastei 200 no mercado", april).await;
        agent.handle_message("ana", "gastei 250 no mercado", may_15()).await;

        let reply = agent.handle_message("ana", "comparar", may_15()).await;
        assert!(reply.contains("25.0%"));
    }
}
