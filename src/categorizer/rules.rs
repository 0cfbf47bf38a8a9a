//! Keyword rule categorizer

use super::{Categorizer, UNCATEGORIZED};

/// Category → trigger keywords, scanned in this order
pub const RULE_TABLE: &[(&str, &[&str])] = &[
    (
        "alimentação",
        &[
            "almoço", "almoco", "jantar", "lanche", "café", "cafe", "mercado", "restaurante",
            "padaria", "pão", "pizza", "ifood", "comida", "açougue", "feira", "hamburguer",
        ],
    ),
    (
        "transporte",
        &[
            "uber", "99pop", "táxi", "taxi", "ônibus", "onibus", "metrô", "metro", "gasolina",
            "combustível", "combustivel", "estacionamento", "pedágio", "passagem",
        ],
    ),
    (
        "moradia",
        &[
            "aluguel", "condomínio", "condominio", "luz", "energia", "água", "agua", "internet",
            "gás", "iptu", "faxina",
        ],
    ),
    (
        "saúde",
        &[
            "farmácia", "farmacia", "remédio", "remedio", "médico", "medico", "consulta",
            "dentista", "exame", "academia", "plano de saúde",
        ],
    ),
    (
        "lazer",
        &[
            "cinema", "show", "viagem", "boteco", "barzinho", "netflix", "spotify", "jogo",
            "ingresso", "festa", "streaming",
        ],
    ),
    (
        "educação",
        &["curso", "livro", "faculdade", "escola", "mensalidade", "apostila"],
    ),
    (
        "vestuário",
        &["roupa", "sapato", "tênis", "tenis", "camisa", "calça", "vestido"],
    ),
];

/// First-match keyword categorizer over [`RULE_TABLE`]
pub struct RuleCategorizer {
    table: &'static [(&'static str, &'static [&'static str])],
}

impl RuleCategorizer {
    pub fn new() -> Self {
        Self { table: RULE_TABLE }
    }
}

impl Default for RuleCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Categorizer for RuleCategorizer {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn classify(&self, description: &str) -> String {
        let lowered = description.to_lowercase();

        self.table
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(label, _)| label.to_string())
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    }
}
