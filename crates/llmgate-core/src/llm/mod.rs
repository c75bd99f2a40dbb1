//! Inference backend interface
//!
//! Traits for the two capabilities the core consumes (text generation and
//! embedding generation), the request fingerprint used as the cache key,
//! and an Ollama HTTP client implementing both traits.

mod fingerprint;
mod ollama;
mod traits;

pub use fingerprint::fingerprint;
pub use ollama::{ModelInfo, OllamaClient};
pub use traits::{Embedder, Generation, GenerationRequest, TextGenerator};
