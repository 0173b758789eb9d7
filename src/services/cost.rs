//! Cost calculation
//!
//! Pure pricing of token usage against a pricing directory snapshot

use crate::models::pricing::{Cost, ModelPricing, PricingStatus};
use crate::models::TokenUsage;
use tracing::{debug, warn};

/// Price `usage` for `model_id`
///
/// `directory` is `None` when the pricing directory could not be loaded.
/// Unlisted models and unavailable directories price at zero; the
/// [`PricingStatus`] on the result tells the two apart from a real match.
pub fn calculate_cost(model_id: &str, usage: &TokenUsage, directory: Option<&[ModelPricing]>) -> Cost {
    let (model_pricing, pricing) = match directory {
        Some(entries) => match entries.iter().find(|entry| entry.id == model_id) {
            Some(entry) if has_valid_prices(entry) => (entry.clone(), PricingStatus::Matched),
            Some(entry) => {
                warn!(
                    "Ignoring invalid pricing for model {}: input={}, output={}",
                    model_id, entry.input_price, entry.output_price
                );
                (ModelPricing::default(), PricingStatus::Unknown)
            }
            None => {
                debug!("No pricing entry for model {}", model_id);
                (ModelPricing::default(), PricingStatus::Unknown)
            }
        },
        None => (ModelPricing::default(), PricingStatus::Unavailable),
    };

    let input_cost = usage.prompt_tokens as f64 * model_pricing.input_price;
    let output_cost = usage.completion_tokens as f64 * model_pricing.output_price;

    Cost {
        model_pricing,
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
        pricing,
    }
}

/// Prices must be finite and non-negative to be billed
fn has_valid_prices(entry: &ModelPricing) -> bool {
    [entry.input_price, entry.output_price]
        .iter()
        .all(|price| price.is_finite() && *price >= 0.0)
}
