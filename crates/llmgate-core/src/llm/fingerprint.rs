//! Request fingerprinting for the response cache
//!
//! The fingerprint is a pure function of the request's defining fields:
//! the tuple is canonicalized (trimmed prompt, temperature rounded to two
//! decimals, keys in sorted order) before hashing, so equivalent requests
//! always map to the same key.

use crate::llm::GenerationRequest;
use sha2::{Digest, Sha256};

/// Derive the cache key for a generation request
pub fn fingerprint(request: &GenerationRequest) -> String {
    // serde_json maps are BTreeMap-backed, so keys serialize sorted
    let canonical = serde_json::json!({
        "max_tokens": request.max_tokens,
        "model": request.model,
        "prompt": request.prompt.trim(),
        "system": request.system,
        "temperature": round2(request.temperature),
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(model: &str, prompt: &str) -> GenerationRequest {
        GenerationRequest::new(model, prompt)
    }

    #[test]
    fn test_identical_inputs_identical_keys() {
        let a = request("m1", "Hello").with_temperature(0.7);
        let b = request("m1", "Hello").with_temperature(0.7);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_whitespace_and_rounding_equivalence() {
        let a = request("m1", "  Hello  ").with_temperature(0.70001);
        let b = request("m1", "Hello").with_temperature(0.7);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_each_field_contributes() {
        let base = request("m1", "Hello");
        assert_ne!(fingerprint(&base), fingerprint(&request("m2", "Hello")));
        assert_ne!(fingerprint(&base), fingerprint(&request("m1", "Goodbye")));
        assert_ne!(
            fingerprint(&base),
            fingerprint(&base.clone().with_system("be terse"))
        );
        assert_ne!(
            fingerprint(&base),
            fingerprint(&base.clone().with_temperature(0.9))
        );
        assert_ne!(
            fingerprint(&base),
            fingerprint(&base.clone().with_max_tokens(128))
        );
    }

    #[test]
    fn test_missing_system_differs_from_empty() {
        let none = request("m1", "Hello");
        let empty = request("m1", "Hello").with_system("");
        assert_ne!(fingerprint(&none), fingerprint(&empty));
    }

    proptest! {
        #[test]
        fn prop_fingerprint_deterministic(
            model in "[a-z0-9:._-]{1,24}",
            prompt in ".{0,200}",
            system in proptest::option::of(".{0,80}"),
            temperature in 0.0f64..2.0,
            max_tokens in proptest::option::of(1u32..8192),
        ) {
            let mut a = GenerationRequest::new(model, prompt);
            a.system = system;
            a.temperature = temperature;
            a.max_tokens = max_tokens;
            let b = a.clone();
            prop_assert_eq!(fingerprint(&a), fingerprint(&b));
        }
    }
}
