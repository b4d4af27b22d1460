//! USD cost accounting.

use rust_decimal::Decimal;

use llmproc_types::TokenUsage;

/// Per-MTok prices for a model-id prefix, in USD.
struct ModelPricing {
    prefix: &'static str,
    input_per_mtok: Decimal,
    output_per_mtok: Decimal,
}

const fn usd(cents_times_ten: i64) -> Decimal {
    // Three decimal places: usd(3000) == $3.000
    Decimal::from_parts(cents_times_ten as u32, 0, 0, false, 3)
}

/// Pricing table, first matching prefix wins. Longest prefixes first where
/// families overlap.
const PRICING: &[ModelPricing] = &[
    ModelPricing {
        prefix: "claude-opus-4",
        input_per_mtok: usd(15_000),
        output_per_mtok: usd(75_000),
    },
    ModelPricing {
        prefix: "claude-sonnet-4",
        input_per_mtok: usd(3_000),
        output_per_mtok: usd(15_000),
    },
    ModelPricing {
        prefix: "claude-haiku",
        input_per_mtok: usd(1_000),
        output_per_mtok: usd(5_000),
    },
    ModelPricing {
        prefix: "claude-3-7-sonnet",
        input_per_mtok: usd(3_000),
        output_per_mtok: usd(15_000),
    },
    ModelPricing {
        prefix: "claude-3-5-haiku",
        input_per_mtok: usd(800),
        output_per_mtok: usd(4_000),
    },
    ModelPricing {
        prefix: "claude-3-haiku",
        input_per_mtok: usd(250),
        output_per_mtok: usd(1_250),
    },
    ModelPricing {
        prefix: "gpt-4o",
        input_per_mtok: usd(2_500),
        output_per_mtok: usd(10_000),
    },
    ModelPricing {
        prefix: "o1",
        input_per_mtok: usd(15_000),
        output_per_mtok: usd(60_000),
    },
    ModelPricing {
        prefix: "o3-mini",
        input_per_mtok: usd(1_100),
        output_per_mtok: usd(4_400),
    },
];

/// Cost model with configurable cached-token pricing.
///
/// Cache pricing is model-dependent in practice; the factors here multiply
/// the regular input price and can be tuned per deployment.
#[derive(Debug, Clone)]
pub struct CostModel {
    /// Cache reads priced at this fraction of the input price.
    pub cache_read_factor: Decimal,
    /// Cache writes priced at this multiple of the input price.
    pub cache_write_factor: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cache_read_factor: Decimal::new(1, 1),   // 0.1
            cache_write_factor: Decimal::new(125, 2), // 1.25
        }
    }
}

impl CostModel {
    /// USD cost of one call, or `None` for a model without pricing.
    #[must_use]
    pub fn cost_of(&self, model: &str, usage: &TokenUsage) -> Option<Decimal> {
        let pricing = PRICING
            .iter()
            .find(|pricing| model.starts_with(pricing.prefix))?;
        let mtok = Decimal::new(1_000_000, 0);

        let mut cost = Decimal::from(usage.input_tokens) * pricing.input_per_mtok / mtok
            + Decimal::from(usage.output_tokens) * pricing.output_per_mtok / mtok;
        if let Some(read) = usage.cache_read_input_tokens {
            cost += Decimal::from(read) * pricing.input_per_mtok * self.cache_read_factor / mtok;
        }
        if let Some(written) = usage.cache_creation_input_tokens {
            cost +=
                Decimal::from(written) * pricing.input_per_mtok * self.cache_write_factor / mtok;
        }
        Some(cost)
    }
}
