//! Reply text
//!
//! Every user-facing string the agent produces. Amounts are rendered as
//! `R$ 0.00` and dates as `dd/mm/yyyy`.

use crate::analytics::{
    AlertLevel, BudgetAlert, CategoryShare, Forecast, MonthComparison, PeriodSummary,
    Recommendations,
};
use crate::categorizer::CategoryModel;
use crate::error::AgentError;
use crate::models::{CategorizerMode, EntryKind, LedgerEntry, SavingsGoal, UserProfile};

use super::flow::MENU_OPTIONS;

/// Most entries shown in a statement
const STATEMENT_LIMIT: usize = 20;

pub fn money(amount: f64) -> String {
    format!("R$ {:.2}", amount)
}

fn entry_line(entry: &LedgerEntry) -> String {
    let sign = match entry.kind {
        EntryKind::Income => "+",
        EntryKind::Expense => "-",
    };

    format!(
        "#{} {} {} {} ({}, {})",
        entry.id,
        entry.timestamp.format("%d/%m/%Y"),
        sign,
        money(entry.amount),
        entry.description,
        entry.category,
    )
}

fn trend_text(trend_pct: Option<f64>) -> String {
    match trend_pct {
        Some(pct) => format!("{:+.1}%", pct),
        None => "sem base de comparação".to_string(),
    }
}

// =============================
// Menu and fallbacks
// =============================

pub fn menu() -> String {
    let mut out = String::from("📋 Menu principal\n");
    for (_, number, _, label) in MENU_OPTIONS {
        out.push_str(&format!("{}. {}\n", number, label));
    }
    out.push_str("\nOu escreva livremente, ex: gastei 50 no almoço");
    out
}

pub fn greeting() -> String {
    format!("Olá! 👋 Sou seu assistente financeiro.\n\n{}", menu())
}

pub fn not_recognized() -> String {
    "🤔 Não entendi. Envie \"menu\" para ver as opções ou \"ajuda\" para exemplos.".to_string()
}

pub fn apology() -> String {
    "😕 Tive um problema para processar sua mensagem. Tente novamente em instantes.".to_string()
}

pub fn not_found(entry_id: u64) -> String {
    format!("Lançamento #{} não encontrado.", entry_id)
}

pub fn need_more_data(needed: usize, available: usize) -> String {
    format!(
        "📉 Preciso de pelo menos {} despesas para prever seus gastos. Você tem {} até agora.",
        needed, available
    )
}

/// User-facing text for errors that are recovered inside the conversation.
/// `None` means the error must abort the message.
pub fn for_error(error: &AgentError) -> Option<String> {
    match error {
        AgentError::Parse(message) => Some(format!("⚠️ {}", message)),
        AgentError::NotFound(entry_id) => Some(not_found(*entry_id)),
        AgentError::InsufficientHistory { needed, available } => {
            Some(need_more_data(*needed, *available))
        }
        _ => None,
    }
}

// =============================
// Registration
// =============================

pub fn ask_amount(kind: EntryKind) -> String {
    format!("{}: qual o valor? Ex: 25,90", kind.label())
}

pub fn ask_description(amount: f64) -> String {
    format!("Anotei {}. Com o que foi esse gasto?", money(amount))
}

pub fn ask_flow_description(kind: EntryKind, amount: f64) -> String {
    format!("{} de {}. Qual a descrição?", kind.label(), money(amount))
}

pub fn choose_category(kind: EntryKind, options: &[String]) -> String {
    let mut out = format!("Escolha a categoria da {}:\n", kind.label().to_lowercase());
    for (index, label) in options.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, label));
    }
    out.push_str("\nOu digite o nome de uma nova categoria.");
    out
}

pub fn entry_recorded(entry: &LedgerEntry) -> String {
    format!(
        "✅ {} de {} registrada: {} [{}] (#{})",
        entry.kind.label(),
        money(entry.amount),
        entry.description,
        entry.category,
        entry.id
    )
}

pub fn entry_removed(entry: &LedgerEntry) -> String {
    format!("🗑️ Lançamento removido: {}", entry_line(entry))
}

// =============================
// Queries
// =============================

pub fn statement(entries: &[LedgerEntry], period: Option<&str>) -> String {
    let scope = period
        .map(|p| format!(" de {}", p))
        .unwrap_or_default();

    if entries.is_empty() {
        return format!("Nenhum lançamento{} encontrado.", scope);
    }

    let mut out = format!("📄 Extrato{}\n", scope);
    let skipped = entries.len().saturating_sub(STATEMENT_LIMIT);
    for entry in &entries[skipped..] {
        out.push_str(&entry_line(entry));
        out.push('\n');
    }
    if skipped > 0 {
        out.push_str(&format!("... e mais {} lançamentos anteriores\n", skipped));
    }

    let income: f64 = entries
        .iter()
        .filter(|entry| entry.kind == EntryKind::Income)
        .map(|entry| entry.amount)
        .sum();
    let expenses: f64 = entries
        .iter()
        .filter(|entry| entry.kind == EntryKind::Expense)
        .map(|entry| entry.amount)
        .sum();
    out.push_str(&format!(
        "\nReceitas: {} | Despesas: {}",
        money(income),
        money(expenses)
    ));
    out
}

/// Everything the summary reply renders
pub struct SummaryView<'a> {
    pub expenses: &'a PeriodSummary,
    pub income: f64,
    pub all_time_expenses: f64,
    /// All-time income minus all-time expenses
    pub balance: f64,
    pub comparison: Option<&'a MonthComparison>,
    pub alerts: &'a [BudgetAlert],
    pub goal: Option<&'a SavingsGoal>,
}

fn shares(out: &mut String, categories: &[CategoryShare]) {
    for share in categories {
        out.push_str(&format!(
            "  • {}: {} ({:.1}%)\n",
            share.category,
            money(share.total),
            share.percentage
        ));
    }
}

fn alert_line(alert: &BudgetAlert) -> String {
    match alert.level {
        AlertLevel::Exceeded => format!(
            "🚨 Limite estourado em {}: {} de {} ({:.0}%)",
            alert.category,
            money(alert.spent),
            money(alert.limit),
            alert.percentage
        ),
        AlertLevel::NearLimit => format!(
            "⚠️ Atenção, {} perto do limite: {} de {} ({:.0}%)",
            alert.category,
            money(alert.spent),
            money(alert.limit),
            alert.percentage
        ),
    }
}

pub fn summary(view: &SummaryView<'_>) -> String {
    let expenses = view.expenses;
    let mut out = format!("📊 Resumo de {}\n", expenses.period);

    out.push_str(&format!("Receitas: {}\n", money(view.income)));
    out.push_str(&format!(
        "Despesas: {} em {} lançamentos\n",
        money(expenses.total),
        expenses.entry_count
    ));
    out.push_str(&format!(
        "Saldo do mês: {}\n",
        money(view.income - expenses.total)
    ));

    if !expenses.categories.is_empty() {
        out.push_str("\nPor categoria:\n");
        shares(&mut out, &expenses.categories);
    }

    out.push_str(&format!(
        "\nTotal gasto desde o início: {}\n",
        money(view.all_time_expenses)
    ));

    if let Some(comparison) = view.comparison {
        out.push_str(&format!(
            "Em relação a {}: {}\n",
            comparison.previous_period,
            trend_text(comparison.trend_pct)
        ));
    }

    for alert in view.alerts {
        out.push_str(&alert_line(alert));
        out.push('\n');
    }

    if let Some(goal) = view.goal {
        let saved = view.balance.max(0.0);
        out.push_str(&format!(
            "🎯 Meta {}: {} de {} ({:.0}%)\n",
            goal.label,
            money(saved),
            money(goal.target),
            crate::analytics::percentage(saved, goal.target).min(100.0)
        ));
    }

    out.trim_end().to_string()
}

pub fn search_results(term: &str, matches: &[LedgerEntry]) -> String {
    if matches.is_empty() {
        return format!("🔎 Nada encontrado para \"{}\".", term);
    }

    let mut out = format!("🔎 {} resultado(s) para \"{}\":\n", matches.len(), term);
    for entry in matches {
        out.push_str(&entry_line(entry));
        out.push('\n');
    }
    out.trim_end().to_string()
}

pub fn category_analysis(breakdown: &[CategoryShare]) -> String {
    if breakdown.is_empty() {
        return "Ainda não há despesas para analisar.".to_string();
    }

    let mut out = String::from("🗂️ Despesas por categoria:\n");
    shares(&mut out, breakdown);
    out.trim_end().to_string()
}

pub fn forecast(forecast: &Forecast) -> String {
    let mut out = format!(
        "🔮 Previsão para os próximos {} dias: {}\n",
        forecast.days,
        money(forecast.projected)
    );
    out.push_str(&format!(
        "Média recente por lançamento: {} (base: {} despesas)",
        money(forecast.moving_average),
        forecast.sample_size
    ));
    if let Some(trend) = forecast.trend_pct {
        out.push_str(&format!("\nTendência: {}", trend_text(Some(trend))));
    }
    out
}

pub fn comparison(comparison: &MonthComparison) -> String {
    format!(
        "📅 {}: {}\n📅 {}: {}\nVariação: {}",
        comparison.previous_period,
        money(comparison.previous),
        comparison.current_period,
        money(comparison.current),
        trend_text(comparison.trend_pct)
    )
}

pub fn recommendations(recommendations: &Recommendations) -> String {
    let mut out = String::from("💡 Recomendações\n");

    match recommendations.top_category() {
        Some(top) => out.push_str(&format!(
            "Seu maior gasto é {}: {} ({:.1}% do total).\n",
            top.category,
            money(top.total),
            top.percentage
        )),
        None => out.push_str("Registre suas despesas para receber dicas personalizadas.\n"),
    }

    for (description, count) in &recommendations.frequent {
        out.push_str(&format!(
            "Você comprou \"{}\" {} vezes. Vale rever esse hábito.\n",
            description, count
        ));
    }

    for tip in &recommendations.tips {
        out.push_str(&format!("• {}\n", tip));
    }

    out.trim_end().to_string()
}

// =============================
// Settings
// =============================

pub fn budget_set(category: &str, limit: f64) -> String {
    format!("✅ Orçamento mensal de {} definido em {}.", category, money(limit))
}

pub fn goal_set(goal: &SavingsGoal) -> String {
    format!("🎯 Meta \"{}\" definida: {}.", goal.label, money(goal.target))
}

pub fn categorizer_set(mode: CategorizerMode) -> String {
    format!("⚙️ Categorização automática agora usa {}.", mode)
}

pub fn settings(mode: CategorizerMode, profile: &UserProfile) -> String {
    let mut out = format!("⚙️ Categorização: {}\n", mode);
    out.push_str(&format!("Orçamentos definidos: {}\n", profile.budgets.len()));
    if let Some(goal) = &profile.goal {
        out.push_str(&format!("Meta: {} ({})\n", goal.label, money(goal.target)));
    }
    out.push_str("\nPara mudar: configurar regras | configurar aprendizado");
    out
}

pub fn model_trained(model: &CategoryModel, mode: CategorizerMode) -> String {
    let mut out = format!(
        "🧠 Modelo treinado com {} lançamentos: {} palavras, {} categorias.",
        model.trained_on(),
        model.vocabulary_size(),
        model.category_count()
    );
    if mode != CategorizerMode::Learned {
        out.push_str("\nPara usá-lo: configurar aprendizado");
    }
    out
}
