//! Query-time retrieval over a built index.

mod handle;
mod service;

pub use handle::IndexHandle;
pub use service::{RetrievalService, RetrievedContext, format_context};
