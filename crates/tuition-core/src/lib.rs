//! Core types and trait definitions for the tuition centre directory.
//!
//! This crate holds the reconciliation rules (names, levels, subjects,
//! quality) and the faceted-filter model. It has no HTTP or database
//! dependencies; storage backends implement [`store::DirectoryStore`].

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod centre;
pub mod directory;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod level;
pub mod memory;
pub mod name;
pub mod offering;
pub mod phone;
pub mod quality;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
