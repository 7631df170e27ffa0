//! Rough per-turn cost estimation.

use automaton_core::inference::TokenUsage;

/// Markup applied on top of list prices by the compute provider.
const MARKUP: f64 = 1.3;

const FALLBACK_MODEL: &str = "gpt-4o";

/// (model, input cents per million tokens, output cents per million tokens)
const PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o", 250.0, 1000.0),
    ("gpt-4o-mini", 15.0, 60.0),
    ("gpt-4.1", 200.0, 800.0),
    ("gpt-4.1-mini", 40.0, 160.0),
    ("gpt-4.1-nano", 10.0, 40.0),
    ("gpt-5.2", 200.0, 800.0),
    ("o1", 1500.0, 6000.0),
    ("o3-mini", 110.0, 440.0),
    ("o4-mini", 110.0, 440.0),
    ("claude-sonnet-4-5", 300.0, 1500.0),
    ("claude-haiku-4-5", 100.0, 500.0),
];

fn price(model: &str) -> (f64, f64) {
    let lookup = |name: &str| PRICING.iter().find(|(m, _, _)| *m == name).map(|(_, i, o)| (*i, *o));
    lookup(model)
        .or_else(|| lookup(FALLBACK_MODEL))
        .unwrap_or((250.0, 1000.0))
}

/// Estimated cost of one reasoning call in cents, rounded up.
/// Unknown models are priced as gpt-4o.
pub fn estimate_cost_cents(usage: &TokenUsage, model: &str) -> u64 {
    let (input, output) = price(model);
    let cost = (f64::from(usage.prompt_tokens) / 1_000_000.0) * input
        + (f64::from(usage.completion_tokens) / 1_000_000.0) * output;
    (cost * MARKUP).ceil() as u64
}
