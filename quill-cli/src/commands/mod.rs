//! Command implementations for the quill CLI

pub mod config;
pub mod sql;
