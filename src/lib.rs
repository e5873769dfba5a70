pub mod aggregate;
pub mod config;
pub mod data_models;
pub mod errors;
pub mod facets;
pub mod filter;
pub mod metrics;
pub mod normalizer;
pub mod parallel;
pub mod parsers;
pub mod query;
pub mod report;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod tests;
