//! Entity extraction
//!
//! Pulls monetary amounts, descriptions and entry identifiers out of raw
//! message text. Every function here is pure: the only inputs are the text
//! and the static pattern tables below.
//!
//! The order of `AMOUNT_PATTERNS` and `ID_PATTERNS` is part of the contract.
//! The first pattern that yields a valid number wins, so reordering them
//! changes which number a message is read as.

use lazy_static::lazy_static;
use regex::Regex;

/// Which amount pattern produced a match, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountPattern {
    /// `R$ 12,50`
    CurrencySymbol,
    /// `12.50 reais`
    CurrencyWord,
    /// `valor 40`
    AfterValue,
    /// `gastei 50`
    AfterSpentVerb,
    /// `50 no almoço`
    BeforePreposition,
    /// `custou 35,90`
    AfterCosts,
    /// `adicionar 50 almoço`
    AfterCommand,
}

/// Structured values found in one message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entities {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub entry_id: Option<u64>,
}

const CURRENCY_WORDS: &[&str] = &["reais", "real", "conto", "contos", "pila"];

const COMMAND_WORDS: &[&str] = &[
    "gastei", "paguei", "comprei", "gasto", "gastos", "adicionar", "adicione", "add",
    "registrar", "registre", "lançar", "valor", "custa", "custou", "custam", "custaram",
];

const STOP_WORDS: &[&str] = &[
    "no", "na", "nos", "nas", "em", "com", "de", "do", "da", "dos", "das", "o", "a", "os",
    "as", "um", "uma", "uns", "umas", "pro", "pra", "para", "por", "ao", "à",
];

/// A number as people type it: `1.500,00` with dot-grouped thousands, or a
/// plain `12,50` / `12.50`
const NUMBER: &str = r"\d{1,3}(?:\.\d{3})+(?:,\d+)?|\d+(?:[.,]\d+)?";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static extraction pattern")
}

/// Compile a pattern whose `{n}` slot is replaced by a capturing [`NUMBER`]
fn compile_amount(pattern: &str) -> Regex {
    compile(&pattern.replace("{n}", &format!("({})", NUMBER)))
}

lazy_static! {
    static ref AMOUNT_PATTERNS: Vec<(AmountPattern, Regex)> = vec![
        (AmountPattern::CurrencySymbol, compile_amount(r"r\$\s*{n}")),
        (
            AmountPattern::CurrencyWord,
            compile_amount(r"{n}\s*(?:reais|real|contos|conto|pila)\b"),
        ),
        (
            AmountPattern::AfterValue,
            compile_amount(r"\bvalor\s*(?:de\s+|:\s*)?{n}"),
        ),
        (
            AmountPattern::AfterSpentVerb,
            compile_amount(r"\b(?:gastei|paguei|comprei|gastos|gasto)\s+(?:de\s+)?{n}"),
        ),
        (
            AmountPattern::BeforePreposition,
            compile_amount(r"{n}\s+(?:no|na|nos|nas|em|com|de|do|da|pro|pra|para|por)\b"),
        ),
        (
            AmountPattern::AfterCosts,
            compile_amount(r"\b(?:custa|custou|custam|custaram)\s+(?:r\$\s*)?{n}"),
        ),
        (
            AmountPattern::AfterCommand,
            compile_amount(r"\b(?:adicionar|adicione|add|registrar|registre|lançar)\s+{n}"),
        ),
    ];

    static ref ID_PATTERNS: Vec<Regex> = vec![
        compile(r"\b(?:remover|remove|remova)\s+#?(\d+)\b"),
        compile(r"\b(?:delete|deletar|apagar|apague|excluir|exclua)\s+#?(\d+)\b"),
        compile(r"\bid\s*:?\s*(\d+)\b"),
        compile(r"#(\d+)\b"),
        compile(r"(\d+)\s*$"),
    ];

    static ref NUMERIC_TOKEN: Regex = compile(r"\d+(?:[.,]\d+)*");
    static ref CURRENCY_SYMBOL: Regex = compile(r"r\$|\$");
    static ref PERIOD: Regex = compile(r"\b(\d{4})-(\d{2})\b");
    static ref DAYS: Regex = compile(r"(\d+)\s*dias?\b");
    static ref SEARCH_TERM: Regex =
        compile(r"\b(?:buscar|busque|busca|procurar|procure|pesquisar|encontrar)\s+(?:por\s+)?(.+)$");
    static ref FIRST_NUMBER: Regex = compile(NUMBER);
}

/// Run every extractor over one message
pub fn extract(text: &str) -> Entities {
    Entities {
        amount: extract_amount(text),
        description: extract_description(text),
        entry_id: extract_entry_id(text),
    }
}

/// Every dot separates a group of exactly three digits: `1.500`, `12.000.000`
fn is_dot_grouped(raw: &str) -> bool {
    let mut groups = raw.split('.');
    let head = groups.next().unwrap_or_default();
    let tail: Vec<&str> = groups.collect();

    (1..=3).contains(&head.len())
        && !tail.is_empty()
        && tail.iter().all(|group| group.len() == 3)
}

/// Parse a decimal number accepting a comma as the decimal separator and
/// dots as thousands separators
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else if is_dot_grouped(raw) {
        raw.replace('.', "")
    } else {
        raw.to_string()
    };

    let value: f64 = normalized.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

pub fn extract_amount(text: &str) -> Option<f64> {
    extract_amount_with_pattern(text).map(|(_, amount)| amount)
}

/// Like [`extract_amount`] but also reports which pattern matched
pub fn extract_amount_with_pattern(text: &str) -> Option<(AmountPattern, f64)> {
    let lowered = text.to_lowercase();

    AMOUNT_PATTERNS.iter().find_map(|(pattern, regex)| {
        let captured = regex.captures(&lowered)?.get(1)?;
        parse_decimal(captured.as_str()).map(|amount| (*pattern, amount))
    })
}

pub fn extract_description(text: &str) -> Option<String> {
    extract_description_excluding(text, &[])
}

/// Description extraction that also drops the caller's command words
pub fn extract_description_excluding(text: &str, extra_words: &[&str]) -> Option<String> {
    let lowered = text.to_lowercase();
    let without_symbols = CURRENCY_SYMBOL.replace_all(&lowered, " ");
    let without_numbers = NUMERIC_TOKEN.replace_all(&without_symbols, " ");

    let words: Vec<&str> = without_numbers
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .filter(|word| {
            !CURRENCY_WORDS.contains(word)
                && !COMMAND_WORDS.contains(word)
                && !STOP_WORDS.contains(word)
                && !extra_words.contains(word)
        })
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

pub fn extract_entry_id(text: &str) -> Option<u64> {
    let lowered = text.trim().to_lowercase();

    ID_PATTERNS.iter().find_map(|regex| {
        let captured = regex.captures(&lowered)?.get(1)?;
        captured.as_str().parse::<u64>().ok()
    })
}

/// True when the text carries `R$`, `$` or a currency word
pub fn has_currency_marker(text: &str) -> bool {
    let lowered = text.to_lowercase();

    CURRENCY_SYMBOL.is_match(&lowered)
        || lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| CURRENCY_WORDS.contains(&word))
}

/// `YYYY-MM` period mentioned in the text, if the month is valid
pub fn extract_period(text: &str) -> Option<String> {
    let caps = PERIOD.captures(text)?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;

    if (1..=12).contains(&month) {
        Some(format!("{}-{:02}", caps.get(1)?.as_str(), month))
    } else {
        None
    }
}

/// Day count from phrases such as "previsão 15 dias"
pub fn extract_days(text: &str) -> Option<u32> {
    let lowered = text.to_lowercase();
    let days: u32 = DAYS.captures(&lowered)?.get(1)?.as_str().parse().ok()?;
    (days > 0).then_some(days)
}

pub fn extract_search_term(text: &str) -> Option<String> {
    let lowered = text.trim().to_lowercase();
    let term = SEARCH_TERM.captures(&lowered)?.get(1)?.as_str().trim();

    if term.is_empty() {
        None
    } else {
        Some(term.to_string())
    }
}

/// First decimal number anywhere in the text
pub fn extract_first_number(text: &str) -> Option<f64> {
    FIRST_NUMBER
        .find_iter(text)
        .find_map(|m| parse_decimal(m.as_str()))
}
