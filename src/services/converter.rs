//! API converter service
//!
//! Responsible for converting between the client message protocol and the
//! upstream chat completion protocol

use crate::config::Settings;
use crate::models::messages::*;
use crate::models::openai::*;
use crate::models::pricing::ModelPricing;
use crate::services::cost::calculate_cost;
use crate::utils::error::{AppError, AppResult};
use tracing::debug;

/// Only this upstream choice is ever translated
pub const PRIMARY_CHOICE: usize = 0;

/// API converter
#[derive(Debug, Clone)]
pub struct ApiConverter {
    model_prefix: String,
}

impl ApiConverter {
    /// Create a new converter instance
    pub fn new(settings: &Settings) -> Self {
        Self::with_prefix(settings.upstream.model_prefix.clone())
    }

    /// Create a converter for the given provider namespace
    pub fn with_prefix(model_prefix: impl Into<String>) -> Self {
        Self {
            model_prefix: model_prefix.into(),
        }
    }

    /// Provider namespace prepended to model names
    pub fn model_prefix(&self) -> &str {
        &self.model_prefix
    }

    /// Convert a client request to an upstream request
    ///
    /// Pass-through mapping: messages are copied in order and nothing is
    /// validated.
    pub fn convert_request(&self, request: &ChatRequest) -> UpstreamRequest {
        let messages = request.messages
            .iter()
            .map(|message| UpstreamMessage {
                role: message.role.clone(),
                content: Some(message.content.clone()),
            })
            .collect();

        UpstreamRequest {
            model: format!("{}{}", self.model_prefix, request.model),
            messages,
            max_tokens: request.max_tokens,
            stream: request.stream,
        }
    }

    /// Model id used for the pricing lookup
    ///
    /// The upstream may or may not echo the namespace back, so it is
    /// stripped once and re-added.
    pub fn pricing_model_id(&self, upstream_model: &str) -> String {
        let bare = upstream_model
            .strip_prefix(self.model_prefix.as_str())
            .unwrap_or(upstream_model);
        format!("{}{}", self.model_prefix, bare)
    }

    /// Convert a complete upstream response to a client response
    pub fn convert_response(
        &self,
        response: UpstreamResponse,
        directory: Option<&[ModelPricing]>,
    ) -> AppResult<ChatResponse> {
        let choice = match response.choices.get(PRIMARY_CHOICE) {
            Some(choice) => choice,
            None => {
                let detail = response.error
                    .as_ref()
                    .map(|e| e.message.as_str())
                    .filter(|message| !message.is_empty())
                    .unwrap_or("no choices in upstream response");
                return Err(AppError::Conversion(detail.to_string()));
            }
        };

        let cost = calculate_cost(&self.pricing_model_id(&response.model), &response.usage, directory);

        debug!(
            "Converted upstream response: model={}, tokens={}+{}, cost={}",
            response.model, response.usage.prompt_tokens, response.usage.completion_tokens, cost.total_cost
        );

        Ok(ChatResponse {
            id: response.id.clone(),
            response_type: MESSAGE_TYPE.to_string(),
            role: choice.message.role.clone(),
            content: choice.message.content.clone().unwrap_or_default(),
            model: response.model.clone(),
            stop_reason: choice.finish_reason.clone(),
            usage: response.usage,
            cost,
        })
    }

    /// Convert one upstream stream chunk to a client stream event
    ///
    /// Returns `None` for chunks without choices and for deltas whose text is
    /// blank; those are never forwarded.
    pub fn convert_stream_chunk(&self, chunk: &UpstreamStreamChunk) -> Option<StreamEvent> {
        let choice = chunk.choices.get(PRIMARY_CHOICE)?;
        let text = choice.delta.content.as_deref().unwrap_or_default();

        if text.trim().is_empty() {
            return None;
        }

        Some(StreamEvent::text_delta(PRIMARY_CHOICE, text, choice.finish_reason.clone()))
    }
}
