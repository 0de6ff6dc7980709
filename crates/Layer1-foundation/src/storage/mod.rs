//! Storage module for Tether
//!
//! - `json`: JSON - configuration file load/save

mod json;

pub use json::JsonStore;
