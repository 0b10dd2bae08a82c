// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Activation Patterns
// ─────────────────────────────────────────────────────────────────────
//! Convenience layer over [`Lattice::activate`]: built-in shortcuts and
//! user-defined weighted patterns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use lattice_types::{unix_time_s, LatticeResult, NamedPattern};

use crate::lattice::{Lattice, ROOT_NODES};

/// A stored, user-defined activation pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Node → base intensity. Only nodes known at registration time.
    pub node_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub created_at: f64,
}

/// What a pattern activation touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternActivation {
    pub pattern: String,
    /// Nodes that received energy, in activation order.
    pub activated: Vec<String>,
    /// Subset of `activated` that crossed its threshold.
    pub fired: Vec<String>,
    pub intensity: f64,
}

/// Result of registering a custom pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRegistration {
    pub pattern: CustomPattern,
    /// Names that were dropped: unknown nodes or non-finite weights.
    pub rejected: Vec<String>,
}

impl Lattice {
    /// Activate every node selected by a built-in shortcut at `intensity`.
    ///
    /// Tagged `pattern:<name>` in each node's source map.
    pub fn activate_pattern(&mut self, pattern: NamedPattern, intensity: f64) -> PatternActivation {
        let targets: Vec<String> = match pattern.kind() {
            Some(kind) => self
                .nodes
                .values()
                .filter(|n| n.kind == kind)
                .map(|n| n.name.clone())
                .collect(),
            None => ROOT_NODES
                .iter()
                .map(|(name, ..)| name.to_string())
                .filter(|name| self.nodes.contains_key(name))
                .collect(),
        };

        let tag = format!("pattern:{pattern}");
        let mut fired = Vec::new();
        for name in &targets {
            if self.activate(name, intensity, Some(&tag)) {
                fired.push(name.clone());
            }
        }

        self.record(
            format!(
                "Activated pattern '{pattern}' with {} nodes",
                targets.len()
            ),
            "activate_pattern",
            json!({
                "pattern": pattern.as_str(),
                "description": pattern.description(),
                "activated_nodes": targets,
                "intensity": intensity,
            }),
        );
        PatternActivation {
            pattern: pattern.as_str().to_string(),
            activated: targets,
            fired,
            intensity,
        }
    }

    /// [`Lattice::activate_pattern`] by shortcut name.
    pub fn activate_pattern_by_name(
        &mut self,
        name: &str,
        intensity: f64,
    ) -> LatticeResult<PatternActivation> {
        let pattern: NamedPattern = name.parse()?;
        Ok(self.activate_pattern(pattern, intensity))
    }

    /// Register (or replace) a weighted pattern.
    ///
    /// Unknown nodes and non-finite weights are dropped and reported.
    /// Returns `None`, storing nothing, when no weight survives.
    pub fn create_custom_pattern<K, I>(
        &mut self,
        name: &str,
        weights: I,
        description: Option<&str>,
    ) -> Option<PatternRegistration>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let mut node_weights = BTreeMap::new();
        let mut rejected = Vec::new();
        for (node, weight) in weights {
            let node = node.into();
            if self.nodes.contains_key(&node) && weight.is_finite() {
                node_weights.insert(node, weight);
            } else {
                rejected.push(node);
            }
        }
        if node_weights.is_empty() {
            log::debug!("custom pattern {name}: no valid nodes");
            return None;
        }

        let pattern = CustomPattern {
            name: name.to_string(),
            description: description
                .map(str::to_string)
                .unwrap_or_else(|| format!("Custom pattern: {name}")),
            node_weights,
            created_at: unix_time_s(),
        };
        self.record(
            format!(
                "Created custom pattern '{name}' with {} nodes",
                pattern.node_weights.len()
            ),
            "create_custom_pattern",
            json!({
                "pattern_name": name,
                "valid_nodes": pattern.node_weights.keys().collect::<Vec<_>>(),
                "invalid_nodes": rejected,
            }),
        );
        self.custom_patterns
            .insert(name.to_string(), pattern.clone());
        Some(PatternRegistration { pattern, rejected })
    }

    /// Activate a stored pattern at `weight × multiplier` per node.
    ///
    /// Nodes removed since registration are skipped. Unknown pattern → `None`.
    pub fn activate_custom_pattern(
        &mut self,
        name: &str,
        multiplier: f64,
    ) -> Option<PatternActivation> {
        let weights = self.custom_patterns.get(name)?.node_weights.clone();
        let tag = format!("custom_pattern:{name}");
        let mut activated = Vec::new();
        let mut fired = Vec::new();
        for (node, weight) in weights {
            if !self.nodes.contains_key(&node) {
                continue;
            }
            if self.activate(&node, weight * multiplier, Some(&tag)) {
                fired.push(node.clone());
            }
            activated.push(node);
        }

        self.record(
            format!(
                "Activated custom pattern '{name}' with {} nodes",
                activated.len()
            ),
            "activate_custom_pattern",
            json!({
                "pattern_name": name,
                "activated_nodes": activated,
                "intensity_multiplier": multiplier,
            }),
        );
        Some(PatternActivation {
            pattern: name.to_string(),
            activated,
            fired,
            intensity: multiplier,
        })
    }

    pub fn custom_patterns(&self) -> &BTreeMap<String, CustomPattern> {
        &self.custom_patterns
    }

    pub fn custom_pattern(&self, name: &str) -> Option<&CustomPattern> {
        self.custom_patterns.get(name)
    }
}
