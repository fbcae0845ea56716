//! In-memory query over staged records
//!
//! Backs the "stored logs" view of the ingestion API. It only sees what is
//! still in the staging queue; persisted rows are queried through the storage
//! backend's own surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Default page size
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Largest page size a caller may request
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Filters and paging for [`LogBuffer::get_stored_logs`](crate::LogBuffer::get_stored_logs)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    /// Exact record type
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// Level, compared case-insensitively
    pub level: Option<String>,

    /// Case-insensitive substring of the message
    pub message: Option<String>,

    /// Inclusive lower bound on `created_at`
    pub start_date: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `created_at`
    pub end_date: Option<DateTime<Utc>>,

    /// 1-based page number
    pub page: Option<usize>,

    /// Page size, capped at [`MAX_PAGE_LIMIT`]
    pub limit: Option<usize>,
}

/// One page of matching records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPage {
    pub records: Vec<Record>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl LogFilter {
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_message(mut self, needle: impl Into<String>) -> Self {
        self.message = Some(needle.into());
        self
    }

    pub fn with_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_page(mut self, page: usize, limit: usize) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Effective page number (at least 1)
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size (1..=MAX_PAGE_LIMIT)
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// Whether a record passes every filter
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(ref kind) = self.kind
            && record.kind != *kind
        {
            return false;
        }
        if let Some(ref level) = self.level
            && !record.level.eq_ignore_ascii_case(level)
        {
            return false;
        }
        if let Some(ref needle) = self.message
            && !record
                .message
                .to_lowercase()
                .contains(&needle.to_lowercase())
        {
            return false;
        }
        if self.start_date.is_some_and(|start| record.created_at < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| record.created_at > end) {
            return false;
        }
        true
    }

    /// Filter, sort newest first, and cut out the requested page
    pub fn apply(&self, records: Vec<Record>) -> LogPage {
        let mut matching: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len();
        let page = self.page();
        let limit = self.limit();
        let total_pages = total.div_ceil(limit);

        let records = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        LogPage {
            records,
            total,
            page,
            total_pages,
        }
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod query_test;
