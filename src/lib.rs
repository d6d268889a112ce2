pub mod analyzer;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod storage;
pub mod utils;

pub use engine::MarketAnalysisEngine;
pub use error::{AnalysisError, ErrorKind};
