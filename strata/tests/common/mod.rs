//! Shared helpers for integration tests.

use anyhow::Result;
use strata::Node;
use strata::file::{Format, decode_str};
use test_helpers::text::dedent;

/// Decode an inline, indented YAML document.
pub fn yaml(source: &str, text: &str) -> Result<Node> {
    Ok(decode_str(source, Format::Yaml, &dedent(text))?)
}

/// JSON rendering of a node, for order-insensitive comparisons.
pub fn to_json(node: &Node) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(node)?)
}
