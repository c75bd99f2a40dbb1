pub mod cache;
pub mod compare;
pub mod generate;
pub mod models;
pub mod rag;
pub mod stats;
