//! # Larder API Server Library
//!
//! HTTP surface of Larder: recipes, meal plans, grocery lists, sharing, and
//! the public read-only grocery list links.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
