//! Business services module
//!
//! Contains upstream communication, protocol conversion, pricing and stream translation

pub mod client;
pub mod converter;
pub mod cost;
pub mod pricing;
pub mod stream;

pub use client::{UpstreamClient, UpstreamEventStream};
pub use converter::{ApiConverter, PRIMARY_CHOICE};
pub use cost::calculate_cost;
pub use pricing::{HttpPricingSource, PricingCache, PricingSource};
pub use stream::{FrameSink, StreamOutcome, StreamSummary, StreamTranslator};
