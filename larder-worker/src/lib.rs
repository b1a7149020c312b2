//! # Larder Worker Library
//!
//! Background maintenance for Larder: expired public share links are cleared
//! and soft-deleted records are purged once their retention window passes.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `sweeper`: The periodic sweep loop

pub mod config;
pub mod sweeper;
