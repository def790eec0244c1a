//! Per-token pricing for known models (USD).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// (input, output) cost per token for a model name, zero when unknown.
pub fn model_cost(model: &str) -> (Decimal, Decimal) {
    // Prices are per million tokens.
    let (input, output) = match model {
        m if m.starts_with("gpt-4.1-mini") => (dec!(0.40), dec!(1.60)),
        m if m.starts_with("gpt-4.1") => (dec!(2.00), dec!(8.00)),
        m if m.starts_with("gpt-4o-mini") => (dec!(0.15), dec!(0.60)),
        m if m.starts_with("gpt-4o") => (dec!(2.50), dec!(10.00)),
        m if m.contains("haiku") => (dec!(0.80), dec!(4.00)),
        m if m.contains("sonnet") => (dec!(3.00), dec!(15.00)),
        m if m.contains("opus") => (dec!(15.00), dec!(75.00)),
        _ => (Decimal::ZERO, Decimal::ZERO),
    };
    let per_million = dec!(1_000_000);
    (input / per_million, output / per_million)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mini_variant_matches_before_base_model() {
        let (mini_in, _) = model_cost("gpt-4.1-mini");
        let (base_in, _) = model_cost("gpt-4.1");
        assert!(mini_in < base_in);
    }

    #[test]
    fn unknown_model_is_free() {
        assert_eq!(model_cost("local-llama"), (Decimal::ZERO, Decimal::ZERO));
    }
}
