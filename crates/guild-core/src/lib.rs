//! Core types and trait definitions for the guild events client.
//!
//! This crate is free of HTTP and database dependencies. The store and sync
//! crates depend on it; the command-line front end only talks to
//! [`repository::Repository`].

// Trait methods spell out `impl Future + Send`; implementors use `async fn`.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod feed;
pub mod live;
pub mod model;
pub mod present;
pub mod repository;
pub mod store;
pub mod timestamp;

pub use error::{Error, Result};
