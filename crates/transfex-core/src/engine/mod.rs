//! # Engine Module
//!
//! The source layout optimizer and the machinery around it.
//!
//! - **Configuration** ([`config`]) - Optimizer and planning settings with builders
//! - **Optimization** ([`optimizer`]) - Hash collection, the one-to-one shortcut, subcolumn
//!   extraction and source-column packing
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-level error type

pub mod config;
pub mod error;
pub mod optimizer;
pub mod progress;
