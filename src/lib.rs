//! eArchive - document archive with OCR enrichment.
//!
//! Uploaded files are deduplicated by content hash and stored, then handed
//! to a separate OCR worker. The worker's text comes back through a
//! callback, is run through a rule-based metadata extractor and projected
//! onto the document.

pub mod analysis;
pub mod cli;
pub mod clock;
pub mod config;
pub mod models;
pub mod ocr;
pub mod permissions;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
pub mod storage;
pub mod worker;
