//! Shared foundation for booksearch: domain types, errors, configuration and
//! document retrieval.
//!
//! Configuration uses Figment to merge `config.toml` + `config.<env>.toml` +
//! `APP_*` env vars. Documents come from a [`traits::DocumentProvider`] and are
//! split into ordinal-numbered paragraphs by [`document::Document`].
#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod document;
pub mod error;
pub mod provider;
pub mod traits;
pub mod types;
