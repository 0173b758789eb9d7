//! Shared test helpers

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use llm_gateway::config::Settings;
use llm_gateway::telemetry::TelemetrySink;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One telemetry call captured by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Request {
        request_id: String,
        model: String,
        message_count: usize,
        stream: bool,
    },
    Response {
        request_id: String,
        model: String,
        status: u16,
        error: bool,
    },
    Chunk {
        request_id: String,
        chunk_size: usize,
        sequence: u64,
    },
    Error {
        request_id: String,
        category: String,
        message: String,
    },
    Health {
        status: String,
        components: BTreeMap<String, String>,
    },
}

/// Telemetry sink that keeps every call in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Record>>,
    unhealthy: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<Record> {
        self.filter(|r| matches!(r, Record::Request { .. }))
    }

    pub fn responses(&self) -> Vec<Record> {
        self.filter(|r| matches!(r, Record::Response { .. }))
    }

    pub fn chunks(&self) -> Vec<Record> {
        self.filter(|r| matches!(r, Record::Chunk { .. }))
    }

    pub fn errors(&self) -> Vec<Record> {
        self.filter(|r| matches!(r, Record::Error { .. }))
    }

    pub fn error_categories(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Error { category, .. } => Some(category),
                _ => None,
            })
            .collect()
    }

    fn filter(&self, predicate: impl Fn(&Record) -> bool) -> Vec<Record> {
        self.records().into_iter().filter(|r| predicate(r)).collect()
    }

    fn push(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    async fn record_request(&self, request_id: &str, model: &str, message_count: usize, stream: bool) -> Result<()> {
        self.push(Record::Request {
            request_id: request_id.to_string(),
            model: model.to_string(),
            message_count,
            stream,
        });
        Ok(())
    }

    async fn record_response(
        &self,
        request_id: &str,
        model: &str,
        _duration: Duration,
        status: u16,
        error: bool,
    ) -> Result<()> {
        self.push(Record::Response {
            request_id: request_id.to_string(),
            model: model.to_string(),
            status,
            error,
        });
        Ok(())
    }

    async fn record_stream_chunk(&self, request_id: &str, chunk_size: usize, sequence: u64) -> Result<()> {
        self.push(Record::Chunk {
            request_id: request_id.to_string(),
            chunk_size,
            sequence,
        });
        Ok(())
    }

    async fn record_error(&self, request_id: &str, category: &str, message: &str) -> Result<()> {
        self.push(Record::Error {
            request_id: request_id.to_string(),
            category: category.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn record_health(
        &self,
        status: &str,
        components: &BTreeMap<String, String>,
        _duration: Duration,
    ) -> Result<()> {
        self.push(Record::Health {
            status: status.to_string(),
            components: components.clone(),
        });
        Ok(())
    }

    async fn check_health(&self) -> Result<()> {
        if self.unhealthy.load(Ordering::SeqCst) {
            anyhow::bail!("telemetry backend down");
        }
        Ok(())
    }
}

/// Build settings from a fixed key table, with a test API key
pub fn create_test_settings(overrides: &[(&str, &str)]) -> Settings {
    let mut values: BTreeMap<String, String> = BTreeMap::new();
    values.insert("API_KEY".to_string(), "sk-test-key".to_string());
    for (key, value) in overrides {
        values.insert(key.to_string(), value.to_string());
    }

    Settings::from_source(|key| values.get(key).cloned()).expect("Failed to create test settings")
}
