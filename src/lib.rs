//! Intel Board - a personal information aggregation dashboard
//!
//! This crate collects articles from a simulated feed and from a web search
//! provider, labels them with a keyword classifier, stores them in SQLite
//! and serves a filterable table through a small web interface.

pub mod classifier;
pub mod collector;
pub mod commands;
pub mod config;
pub mod db;
pub mod routes;
