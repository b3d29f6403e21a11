//! services/api/src/lib.rs
//!
//! The LearnHub API service: adapters for the core ports, account handling
//! and the axum web layer. The binaries in `src/bin` wire these together.

pub mod accounts;
pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
