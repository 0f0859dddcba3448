//! Adaptive analysis of schema-unknown tabular data.
//!
//! A run profiles the dataset and draws the charts its statistics justify:
//! the most correlated pair, the correlation heatmap and a k-means partition.
//! All charts go to a vision model in one request, and the reply is split
//! into per-chart stories that are written, with rule-based insights, to
//! `README.md`.

pub mod cluster;
pub mod color;
pub mod config;
pub mod correlation;
pub mod data;
pub mod error;
pub mod narrative;
pub mod pipeline;
pub mod profile;
pub mod render;
pub mod stats;
