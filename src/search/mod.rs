//! Catalog search
//!
//! Keyword filters ([`SearchFilters`]) are compiled by [`QueryCompiler`] into a
//! [`SearchPayload`] and executed page by page by [`SearchExecutor`].

pub mod compiler;
pub mod executor;
pub mod fields;
pub mod result;

pub use compiler::{
    CompiledQuery, IgnoreReason, IgnoredFilter, QueryCompiler, SearchFilters, SearchPayload,
    SortDirection, SortDirective,
};
pub use executor::{resolve_next_href, PageFetcher, SearchExecutor, SearchPage};
pub use fields::{FieldDescriptor, FieldKind, Operator};
pub use result::SearchResult;
