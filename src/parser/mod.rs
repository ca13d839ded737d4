//! Message parsing: `.eml` decoding, threading headers, and report link extraction.

pub mod eml;
pub mod extract;
pub mod header;
