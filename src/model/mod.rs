//! Core data model types: report definitions, inbound messages, and ingestion outcomes.

pub mod message;
pub mod outcome;
pub mod report;
