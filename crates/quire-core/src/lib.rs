//! Core types and trait definitions for quire.
//!
//! This crate is deliberately free of HTTP and database dependencies. Backend
//! crates implement the traits in [`store`], [`vector`], [`blob`] and [`llm`];
//! the pipeline crate composes them.

// Native `async fn` in traits; the traits spell out `Send` futures explicitly.
#![allow(async_fn_in_trait)]

pub mod blob;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod message;
pub mod quota;
pub mod store;
pub mod vector;

pub use error::{Error, Result};
