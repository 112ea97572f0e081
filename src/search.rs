//! Ranking: strategies, requests, filtering and top-k selection.

pub mod collector;
pub mod engine;
pub mod filter;
pub mod report;
pub mod request;
pub mod results;
pub mod strategy;

pub use engine::RankingEngine;
pub use request::{Boosts, Filters, SearchRequest};
pub use results::{SearchHit, SearchResults};
pub use strategy::{Strategy, StrategyInfo};
