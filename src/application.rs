//! Application layer module
//!
//! Orchestrates the domain and infrastructure pieces into a running crawl:
//! the plan decides what to crawl, the controller drives it.

pub mod crawl_controller;
pub mod crawl_plan;

pub use crawl_controller::CrawlController;
pub use crawl_plan::{CrawlLimits, CrawlPlan, RUN_MODE_ENV, RunMode};
