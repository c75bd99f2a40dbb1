//! Cost estimation for generation requests
//!
//! Rates are configuration, injected wherever an estimate is needed, so a
//! deployment can price its own model catalog without touching code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cost per 1K tokens for one model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ModelRate {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Per-model pricing table with a fallback rate for unknown models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTable {
    #[serde(default)]
    pub models: HashMap<String, ModelRate>,

    /// Rate applied when no model entry matches
    #[serde(default = "default_rate")]
    pub default_rate: ModelRate,
}

fn default_rate() -> ModelRate {
    ModelRate {
        input_per_1k: 0.0001,
        output_per_1k: 0.0002,
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        let mut models = HashMap::new();
        let mut add = |name: &str, input: f64, output: f64| {
            models.insert(
                name.to_string(),
                ModelRate {
                    input_per_1k: input,
                    output_per_1k: output,
                },
            );
        };
        add("llama2", 0.0001, 0.0002);
        add("llama2:7b", 0.0001, 0.0002);
        add("llama2:13b", 0.0002, 0.0004);
        add("llama2:70b", 0.0005, 0.001);
        add("llama3", 0.00015, 0.0003);
        add("llama3:8b", 0.00015, 0.0003);
        add("llama3:70b", 0.0006, 0.0012);
        add("mistral", 0.0001, 0.0002);
        add("codellama", 0.0001, 0.0002);

        Self {
            models,
            default_rate: default_rate(),
        }
    }
}

impl PricingTable {
    /// Resolve the rate for a model id.
    ///
    /// Falls back to the longest matching base-model prefix (so
    /// "mistral:7b-instruct" prices as "mistral"), then to the default rate.
    pub fn rate_for(&self, model: &str) -> ModelRate {
        let key = model.to_lowercase();
        if let Some(rate) = self.models.get(&key) {
            return *rate;
        }

        let mut best: Option<(&String, &ModelRate)> = None;
        for (name, rate) in &self.models {
            if key.starts_with(name.as_str()) {
                match best {
                    Some((existing, _)) if existing.len() >= name.len() => {}
                    _ => best = Some((name, rate)),
                }
            }
        }

        best.map(|(_, rate)| *rate).unwrap_or(self.default_rate)
    }

    /// Estimated cost in dollars for one request
    pub fn cost(&self, model: &str, prompt_tokens: u32, response_tokens: u32) -> f64 {
        let rate = self.rate_for(model);
        (prompt_tokens as f64 / 1000.0) * rate.input_per_1k
            + (response_tokens as f64 / 1000.0) * rate.output_per_1k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let pricing = PricingTable::default();
        let rate = pricing.rate_for("llama2:13b");
        assert_eq!(rate.input_per_1k, 0.0002);
    }

    #[test]
    fn test_prefix_match() {
        let pricing = PricingTable::default();
        // Variant tags fall back to the longest base-model prefix
        let rate = pricing.rate_for("llama3:70b-instruct-q4");
        assert_eq!(rate.input_per_1k, 0.0006);
        let rate = pricing.rate_for("mistral:7b-instruct");
        assert_eq!(rate.input_per_1k, 0.0001);
    }

    #[test]
    fn test_unknown_model_uses_default() {
        let pricing = PricingTable::default();
        let rate = pricing.rate_for("phi3");
        assert_eq!(rate, pricing.default_rate);
    }

    #[test]
    fn test_cost_arithmetic() {
        let pricing = PricingTable::default();
        // 1000 input + 2000 output tokens on llama2
        let cost = pricing.cost("llama2", 1000, 2000);
        assert!((cost - (0.0001 + 2.0 * 0.0002)).abs() < 1e-12);
    }
}
