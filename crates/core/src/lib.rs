pub mod error;
pub mod generation;
pub mod inference;
pub mod types;
