//! Bike-sharing dashboard
//!
//! Loads the daily and hourly rental tables once, then answers three views
//! (weather impact, temporal patterns, usage categorization) under a set of
//! filters. The binary writes each view as JSON and SVG charts.

pub mod app;
pub mod charts;
pub mod cli;
pub mod config;
pub mod data;
pub mod stats;
