//! Spending recommendations

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::{category_breakdown, CategoryShare};
use crate::models::{EntryKind, LedgerEntry};

/// A description seen more than this many times is a frequent purchase
pub const FREQUENT_PURCHASE_THRESHOLD: usize = 3;

/// Number of generic tips sampled per call
pub const TIPS_PER_CALL: usize = 2;

pub const TIP_POOL: &[&str] = &[
    "Anote todos os gastos no mesmo dia, até os pequenos.",
    "Defina um orçamento mensal para as categorias que mais pesam.",
    "Revise assinaturas e serviços que você não usa mais.",
    "Guarde uma parte da receita assim que ela entrar.",
    "Compare preços antes de compras acima de R$ 100.",
    "Planeje as refeições da semana para evitar delivery.",
    "Monte uma reserva de emergência equivalente a 6 meses de despesas.",
    "Evite parcelar compras pequenas no cartão.",
];

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    /// Expense categories by total spend, largest first
    pub ranking: Vec<CategoryShare>,
    /// (description, occurrences) above the threshold, most frequent first
    pub frequent: Vec<(String, usize)>,
    pub tips: Vec<&'static str>,
}

impl Recommendations {
    pub fn top_category(&self) -> Option<&CategoryShare> {
        self.ranking.first()
    }
}

fn frequent_purchases(entries: &[LedgerEntry]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for entry in entries.iter().filter(|entry| entry.kind == EntryKind::Expense) {
        let key = entry.description.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(description, _)| *description == key) {
            Some(slot) => slot.1 += 1,
            None => counts.push((key, 1)),
        }
    }

    counts.retain(|(_, count)| *count > FREQUENT_PURCHASE_THRESHOLD);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Build recommendations; `rng` only drives the generic tip sample
pub fn recommend<R: Rng + ?Sized>(entries: &[LedgerEntry], rng: &mut R) -> Recommendations {
    let ranking = category_breakdown(
        entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Expense),
    );

    let tips = TIP_POOL
        .choose_multiple(rng, TIPS_PER_CALL)
        .copied()
        .collect();

    Recommendations {
        ranking,
        frequent: frequent_purchases(entries),
        tips,
    }
}
