//! Tandem - coding-assistant agent with editor integration
//!
//! This library provides the core agent orchestration loop, persistable
//! conversation sessions, and the JSON-RPC protocol server that exposes
//! both to an external editor process over stdio.

pub mod acp;
pub mod agent;
pub mod config;
pub mod error;
pub mod session;
pub mod terminal;
pub mod tools;

pub use error::{Error, Result};
