//! # PokeQuiz Common Library
//!
//! Shared code for the PokeQuiz services:
//! - Error type used across crates
//! - Bootstrap configuration (root folder, TOML config, logging)
//! - Signed user tokens

pub mod auth;
pub mod config;
pub mod error;

pub use error::{Error, Result};
