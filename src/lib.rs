//! `reportfetch` — pull emailed report downloads into durable storage.
//!
//! A batch run loads the report registry, walks every inbox message through
//! the ingestion pipeline (subject → download link → gzip download → CSV
//! artifact), writes receipt dates back to the registry, and finally sends one
//! alert listing every report that is overdue.

pub mod config;
pub mod error;
pub mod fetch;
pub mod freshness;
pub mod job;
pub mod mailbox;
pub mod model;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod store;
