// src/source/mod.rs
//! # Upstream query interface
//!
//! The crawler never talks HTTP or GraphQL directly. It sees one call,
//! [`Source::query`], that takes a range filter, an optional attribute combo,
//! a page size and a cursor, and answers with a normalized [`QueryPage`]:
//!
//! ```text
//! { total_hits, records: [...], has_next_page, end_cursor } | SourceError
//! ```
//!
//! Vendor quirks (envelope keys that change per search type, typename-tagged
//! error payloads, nested ids) are resolved inside each adapter before the
//! crawler ever sees a response.
//!
//! ## Adapters
//! - [`graphql`] – POSTs a configured GraphQL query and normalizes the envelope.
//! - [`memory`] – in-memory listing that enforces a result cap; used for dry
//!   runs, benches and tests.

pub mod graphql;
pub mod memory;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::{AttributeCombo, RangeDescriptor};
use crate::error::SourceError;

pub use graphql::GraphqlSource;
pub use memory::{Listing, MemorySource};

/// Opaque upstream key (caregiver id, freelancer id, ...).
pub type RecordId = String;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub payload: Value,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, payload: Value) -> Self {
        Self { id: id.into(), payload }
    }
}

/// One normalized response page.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryPage {
    pub total_hits: u64,
    pub records: Vec<Record>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Default,
    /// Secondary ordering used to surface a different slice of a capped result set.
    Alternate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest<'a> {
    pub range: RangeDescriptor,
    /// `None` and the all-empty combo both mean "no extra filter".
    pub combo: Option<&'a AttributeCombo>,
    pub page_size: u32,
    pub cursor: Option<&'a str>,
    pub sort: SortOrder,
}

pub trait Source: Send + Sync {
    fn query(&self, req: &QueryRequest<'_>) -> Result<QueryPage, SourceError>;
}

impl<S: Source + ?Sized> Source for &S {
    fn query(&self, req: &QueryRequest<'_>) -> Result<QueryPage, SourceError> {
        (**self).query(req)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn query(&self, req: &QueryRequest<'_>) -> Result<QueryPage, SourceError> {
        (**self).query(req)
    }
}

impl<S: Source + ?Sized> Source for Arc<S> {
    fn query(&self, req: &QueryRequest<'_>) -> Result<QueryPage, SourceError> {
        (**self).query(req)
    }
}
