//! # Catalog admin configuration
//!
//! Annotates the schema of a Hydra-described data catalog with the
//! presentation rules its admin interface needs: date-range validated inputs,
//! rich-text inputs, range-driven render strategies, resource ordering and
//! list-view visibility.
//!
//! ## Modules
//!
//! - [`date_range`] - Grammar for historical date-range expressions
//! - [`schema`] - Resource and field descriptions plus their overrides
//! - [`rules`] - Rule tables loaded from `rules.json`
//! - [`annotate`] - Copy-and-annotate pipeline over discovered resources
//! - [`hydra`] - Hydra discovery, credentials, and HTTP transport
//! - [`display`] - Headless rendering of values per render strategy
//! - [`cli`] - Argument parsing for the `catadmin` binary

pub mod annotate;
pub mod cli;
pub mod date_range;
pub mod display;
pub mod hydra;
pub mod rules;
pub mod schema;
