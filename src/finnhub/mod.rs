pub mod rest;
pub mod types;

pub use rest::{normalize_symbol, FinnhubRestClient};
