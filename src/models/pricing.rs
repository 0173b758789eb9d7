//! Pricing directory and cost models

use super::null_as_default;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-model pricing entry from the pricing directory
///
/// Prices are per token. An all-zero record stands in for models the
/// directory does not list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelPricing {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub input_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub output_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cached_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub caching_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context_window: u64,
    #[serde(rename = "max_output_tokens", default, deserialize_with = "null_as_default")]
    pub max_tokens: u64,
}

/// Pricing directory listing (`GET /v1/models`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelListResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<ModelPricing>,
}

/// How the pricing record behind a cost was obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PricingStatus {
    /// The model id was found in the directory
    Matched,
    /// The directory was loaded but does not list the model
    #[default]
    Unknown,
    /// The directory could not be loaded
    Unavailable,
}

/// Cost breakdown attached to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cost {
    #[serde(rename = "model_info")]
    pub model_pricing: ModelPricing,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pricing: PricingStatus,
}
