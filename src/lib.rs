//! Translated text lookup service.
//!
//! Texts are stored per `(key, language)` and can be fetched one key at a time
//! or as a whole group of keys. Only values stored for the exact requested
//! language are returned.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod seed;
