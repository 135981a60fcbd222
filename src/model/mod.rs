pub mod batch;
pub mod quote;
