//! ksearch: local semantic knowledge-base search.
//!
//! Documents are chunked into overlapping passages, embedded by an
//! external embedding server, and indexed in an in-process vector index
//! (exact or IVF-PQ). Queries retrieve the best-matching passages and
//! optionally generate a grounded answer.

pub mod cli;
pub mod error;
pub mod index;
pub mod ingest;
pub mod models;
pub mod services;
pub mod utils;
