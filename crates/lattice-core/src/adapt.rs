// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Structure Adaptation
// ─────────────────────────────────────────────────────────────────────
//! Hebbian-style topology changes driven by current activity.
//!
//! 1. Co-active pairs `(a, b)`, `a` before `b` by name: strengthen an
//!    existing `a → b` edge, or create one with probability
//!    `0.3 × adaptivity` and a weight drawn from [0.3, 0.5).
//! 2. Edges from active to inactive nodes weaken by
//!    `0.05 × adaptivity` and are removed once they reach zero.
//! 3. At `adaptivity ≥ 0.5`, the most recent stable configuration
//!    spawns one new emergent node wired to its members.

use rand::Rng;
use serde_json::json;

use lattice_types::{
    AdaptationReport, AdaptationStatus, EmergentPattern, NodeKind, StructuralChange,
};

use crate::lattice::Lattice;

const STRENGTHEN_RATE: f64 = 0.1;
const CREATE_PROBABILITY: f64 = 0.3;
const WEAKEN_RATE: f64 = 0.05;
const SPAWN_ADAPTIVITY: f64 = 0.5;
const NEW_EDGE_WEIGHT: std::ops::Range<f64> = 0.3..0.5;
const EMERGENT_LABEL: &str = "⇌";

impl Lattice {
    /// Adapt the topology to current activity. `adaptivity` is capped at 1.0.
    ///
    /// `adaptivity <= 0` (or NaN) changes nothing.
    pub fn adapt(&mut self, adaptivity: f64) -> AdaptationReport {
        if !(adaptivity > 0.0) {
            return AdaptationReport::empty(AdaptationStatus::NoAdaptation, 0.0);
        }
        let adaptivity = adaptivity.min(1.0);

        let active: Vec<String> = self
            .active_nodes()
            .into_iter()
            .map(str::to_string)
            .collect();
        if active.is_empty() {
            return AdaptationReport::empty(AdaptationStatus::NoActiveNodes, adaptivity);
        }

        let mut report = AdaptationReport::empty(AdaptationStatus::Adapted, adaptivity);
        self.reinforce_coactive(&active, adaptivity, &mut report);
        self.prune_to_inactive(&active, adaptivity, &mut report);
        if adaptivity >= SPAWN_ADAPTIVITY {
            self.spawn_emergent(&mut report);
        }

        log::debug!(
            "adapt({adaptivity:.2}): +{} ~{} -{} x{}",
            report.created,
            report.strengthened,
            report.weakened,
            report.removed
        );
        self.record(
            format!(
                "Adapted lattice structure with adaptivity {adaptivity:.2}: {} changes",
                report.total()
            ),
            "adapt",
            json!({
                "strengthened": report.strengthened,
                "weakened": report.weakened,
                "created": report.created,
                "removed": report.removed,
                "emergent_node": report.emergent_node,
            }),
        );
        report
    }

    fn reinforce_coactive(
        &mut self,
        active: &[String],
        adaptivity: f64,
        report: &mut AdaptationReport,
    ) {
        for (i, from) in active.iter().enumerate() {
            for to in &active[i + 1..] {
                let existing = self.nodes.get(from).and_then(|n| n.weight_to(to));
                match existing {
                    Some(old) => {
                        let new = (old + adaptivity * STRENGTHEN_RATE).min(1.0);
                        if new > old {
                            if let Some(node) = self.nodes.get_mut(from) {
                                node.connect(to.as_str(), new);
                            }
                            report.strengthened += 1;
                            report.changes.push(StructuralChange::Strengthen {
                                from: from.clone(),
                                to: to.clone(),
                                old_weight: old,
                                new_weight: new,
                            });
                        }
                    }
                    None => {
                        if self.rng.gen::<f64>() >= adaptivity * CREATE_PROBABILITY {
                            continue;
                        }
                        let weight = self.rng.gen_range(NEW_EDGE_WEIGHT);
                        if let Some(node) = self.nodes.get_mut(from) {
                            node.connect(to.as_str(), weight);
                        }
                        report.created += 1;
                        report.changes.push(StructuralChange::Create {
                            from: from.clone(),
                            to: to.clone(),
                            weight,
                        });
                    }
                }
            }
        }
    }

    fn prune_to_inactive(
        &mut self,
        active: &[String],
        adaptivity: f64,
        report: &mut AdaptationReport,
    ) {
        for from in active {
            let Some(node) = self.nodes.get(from) else {
                continue;
            };
            let targets: Vec<(String, f64)> = node
                .connections
                .iter()
                .filter(|(t, _)| self.nodes.get(*t).is_some_and(|n| !n.is_active()))
                .map(|(t, &w)| (t.clone(), w))
                .collect();

            for (to, old) in targets {
                let new = (old - adaptivity * WEAKEN_RATE).max(0.0);
                let Some(node) = self.nodes.get_mut(from) else {
                    continue;
                };
                if new > 0.0 {
                    if new < old {
                        node.connect(to.as_str(), new);
                        report.weakened += 1;
                        report.changes.push(StructuralChange::Weaken {
                            from: from.clone(),
                            to,
                            old_weight: old,
                            new_weight: new,
                        });
                    }
                } else {
                    node.disconnect(&to);
                    report.removed += 1;
                    report.changes.push(StructuralChange::Remove {
                        from: from.clone(),
                        to,
                    });
                }
            }
        }
    }

    fn spawn_emergent(&mut self, report: &mut AdaptationReport) {
        let Some(members) = self.emergent_patterns.iter().rev().find_map(|p| match p {
            EmergentPattern::StablePattern { configuration, .. } => Some(configuration.clone()),
            _ => None,
        }) else {
            return;
        };

        let name = self.free_emergent_name();
        let threshold = self.config.activation_threshold * self.config.emergent_threshold_factor;
        self.add(&name, NodeKind::Emergent, Some(EMERGENT_LABEL), Some(threshold));

        let inbound = self.config.emergent_inbound_weight;
        let outbound = self.config.emergent_outbound_weight;
        let present: Vec<String> = members
            .iter()
            .filter(|m| self.nodes.contains_key(m.as_str()))
            .cloned()
            .collect();
        for member in &present {
            self.connect(member, &name, inbound);
            self.connect(&name, member, outbound);
        }

        log::info!("spawned emergent node {name} from {} members", members.len());
        self.record(
            format!("Created new emergent node {name} from stable pattern"),
            "adapt",
            json!({ "pattern_nodes": members, "emergent_node": name }),
        );
        report.emergent_node = Some(name.clone());
        report.changes.push(StructuralChange::SpawnNode {
            name,
            pattern: members,
        });
    }

    /// `emergent_<n>` with the first free `n` at or above the node count.
    fn free_emergent_name(&self) -> String {
        (self.nodes.len()..)
            .map(|n| format!("emergent_{n}"))
            .find(|name| !self.nodes.contains_key(name))
            .unwrap_or_else(|| format!("emergent_{}", self.nodes.len()))
    }
}
