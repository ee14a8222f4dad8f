//! Shared state of one run
//!
//! A [`RunContext`] is created per run and handed to every item task by
//! `Arc`. It owns the only state mutated concurrently: the error list, the
//! budget counter, extraction timings and run counters.

use crate::page::SessionState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Where an error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    Navigation,
    Extraction,
}

impl ErrorStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Extraction => "extraction",
        }
    }
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub url: String,
    pub entity: String,
    pub stage: ErrorStage,
    pub field: Option<String>,
    pub selector: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn navigation(url: &str, entity: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            entity: entity.to_string(),
            stage: ErrorStage::Navigation,
            field: None,
            selector: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn extraction(
        url: &str,
        entity: &str,
        field: &str,
        selector: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            url: url.to_string(),
            entity: entity.to_string(),
            stage: ErrorStage::Extraction,
            field: Some(field.to_string()),
            selector: Some(selector.to_string()),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Point-in-time copy of the run counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub items_admitted: usize,
    pub items_skipped: usize,
    pub items_failed: usize,
    pub pages_fetched: usize,
    /// Errors counted against the budget
    pub budget_errors: u32,
    /// Every recorded error, counted or not
    pub total_errors: usize,
    /// Page load plus readiness wait, in seconds
    pub extraction_times: Vec<f64>,
}

/// Synchronized accumulators shared by all item tasks of a run
#[derive(Debug)]
pub struct RunContext {
    error_budget: u32,
    session: Option<SessionState>,
    errors: Mutex<Vec<ErrorRecord>>,
    budget_errors: AtomicU32,
    extraction_times: Mutex<Vec<f64>>,
    items_admitted: AtomicUsize,
    items_skipped: AtomicUsize,
    items_failed: AtomicUsize,
    pages_fetched: AtomicUsize,
}

impl RunContext {
    pub fn new(error_budget: u32, session: Option<SessionState>) -> Self {
        Self {
            error_budget,
            session,
            errors: Mutex::new(Vec::new()),
            budget_errors: AtomicU32::new(0),
            extraction_times: Mutex::new(Vec::new()),
            items_admitted: AtomicUsize::new(0),
            items_skipped: AtomicUsize::new(0),
            items_failed: AtomicUsize::new(0),
            pages_fetched: AtomicUsize::new(0),
        }
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn error_budget(&self) -> u32 {
        self.error_budget
    }

    /// True once the counted errors reached the budget
    pub fn budget_exhausted(&self) -> bool {
        self.budget_errors.load(Ordering::SeqCst) >= self.error_budget
    }

    pub fn budget_errors(&self) -> u32 {
        self.budget_errors.load(Ordering::SeqCst)
    }

    /// Records an error without consuming the budget
    pub fn record(&self, record: ErrorRecord) {
        tracing::error!(
            "[{}] {} error on {}: {}",
            record.entity,
            record.stage,
            record.url,
            record.message
        );
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Records an error and counts it against the budget
    pub fn record_counted(&self, record: ErrorRecord) {
        self.record(record);
        let count = self.budget_errors.fetch_add(1, Ordering::SeqCst) + 1;
        if count == self.error_budget {
            tracing::error!(
                "Error budget of {} exhausted, no further work items will be started",
                self.error_budget
            );
        }
    }

    pub fn record_extraction_time(&self, seconds: f64) {
        self.extraction_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(seconds);
    }

    pub fn item_admitted(&self) {
        self.items_admitted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn item_skipped(&self) {
        self.items_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn item_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn page_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst);
    }

    /// Copy of every recorded error, in recording order
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn statistics(&self) -> RunStatistics {
        RunStatistics {
            items_admitted: self.items_admitted.load(Ordering::SeqCst),
            items_skipped: self.items_skipped.load(Ordering::SeqCst),
            items_failed: self.items_failed.load(Ordering::SeqCst),
            pages_fetched: self.pages_fetched.load(Ordering::SeqCst),
            budget_errors: self.budget_errors(),
            total_errors: self
                .errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            extraction_times: self
                .extraction_times
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}
