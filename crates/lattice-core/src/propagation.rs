// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Propagation Engine
// ─────────────────────────────────────────────────────────────────────
//! Epoch-synchronous activation spreading.
//!
//! Each epoch snapshots the active set, plans every delivery against
//! that snapshot, and only then applies the accumulated amounts. The
//! order in which sources are visited never changes the outcome.
//!
//! | Mode | Edges used | Gain |
//! |------|------------|------|
//! | Diffusion | all | 1 |
//! | Directed | `directed_fanout` strongest | `directed_gain` |
//! | Resonance | all | `resonance_gain` when kinds match |
//! | Wave | all | excitatory/inhibitory by phase |
//! | Focused | all | `focus_gain` into the focus set |
//!
//! Inhibitory wave deliveries are applied as accelerated decay, so
//! activation never goes negative.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde_json::json;

use lattice_types::{unix_time_s, NodeKind, PropagationMode, PropagationOutcome, PropagationRecord};

use crate::detect::PatternDetector;
use crate::lattice::Lattice;

/// One planned transfer of energy along an edge.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Delivery {
    pub source: String,
    pub target: String,
    pub amount: f64,
}

/// Everything one epoch will do, computed before any node changes.
#[derive(Debug, Clone)]
pub(crate) struct EpochPlan {
    pub deliveries: Vec<Delivery>,
    /// Wave mode in its inhibitory phase: deliveries become decay.
    pub inhibitory: bool,
}

impl EpochPlan {
    /// Deliveries summed per target, in target-name order.
    pub fn pending(&self) -> BTreeMap<&str, f64> {
        let mut pending = BTreeMap::new();
        for d in &self.deliveries {
            *pending.entry(d.target.as_str()).or_insert(0.0) += d.amount;
        }
        pending
    }

    /// Distinct nodes that sent energy this epoch.
    pub fn source_count(&self) -> usize {
        self.deliveries
            .iter()
            .map(|d| d.source.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

impl Lattice {
    /// Run `steps` epochs in `mode`, then one trailing decay.
    ///
    /// Returns [`PropagationOutcome::AlreadyPropagating`] without
    /// touching any node if a propagation is already running.
    pub fn propagate(&mut self, steps: usize, mode: PropagationMode) -> PropagationOutcome {
        if self.propagating {
            log::warn!("propagate({steps}, {mode}) rejected: already propagating");
            self.record(
                "Attempted to propagate while already propagating",
                "propagate",
                json!({ "prevented_recursion": true }),
            );
            return PropagationOutcome::AlreadyPropagating;
        }

        self.propagating = true;
        let record = self.run_epochs(steps, mode);
        self.propagating = false;
        PropagationOutcome::Completed(record)
    }

    /// [`Lattice::propagate`] in the lattice's default mode.
    pub fn propagate_default(&mut self, steps: usize) -> PropagationOutcome {
        self.propagate(steps, self.default_mode)
    }

    fn run_epochs(&mut self, steps: usize, mode: PropagationMode) -> PropagationRecord {
        let max_steps = self.config.max_propagation_steps;
        let steps = if steps > max_steps {
            log::warn!("propagate: {steps} steps clamped to {max_steps}");
            max_steps
        } else {
            steps
        };

        let start_time_s = unix_time_s();
        let started = Instant::now();
        self.record(
            format!("Starting propagation for {steps} steps in {mode} mode"),
            "propagate",
            json!({
                "steps": steps,
                "mode": mode.as_str(),
                "active_nodes": self.active_count(),
            }),
        );

        let detector = PatternDetector::from_config(&self.config);
        let mut node_activations = Vec::with_capacity(steps);
        let mut found = Vec::new();

        for _ in 0..steps {
            let plan = self.plan_epoch(mode);
            log::trace!(
                "epoch ({mode}): {} deliveries from {} sources",
                plan.deliveries.len(),
                plan.source_count()
            );
            self.apply_epoch(&plan, mode);

            node_activations.push(
                self.nodes
                    .iter()
                    .map(|(name, n)| (name.clone(), n.activation))
                    .collect::<BTreeMap<_, _>>(),
            );

            let patterns = detector.detect(&self.nodes, unix_time_s());
            for pattern in &patterns {
                self.record(
                    format!(
                        "Detected {} over {} nodes",
                        pattern.type_name(),
                        pattern.nodes().len()
                    ),
                    "detect",
                    json!({ "type": pattern.type_name(), "nodes": pattern.nodes() }),
                );
            }
            self.emergent_patterns.extend(patterns.iter().cloned());
            found.extend(patterns);
        }

        let decay = self.config.activation_decay;
        for node in self.nodes.values_mut() {
            node.decay(decay);
        }

        let record = PropagationRecord {
            steps,
            mode,
            start_time_s,
            duration_s: started.elapsed().as_secs_f64(),
            active_nodes: self.active_count(),
            node_activations,
            emergent_patterns: found,
        };

        log::debug!(
            "propagate: {} steps ({mode}) → {} active, {} patterns",
            record.steps,
            record.active_nodes,
            record.emergent_patterns.len()
        );
        self.record(
            format!("Completed propagation: {} active nodes", record.active_nodes),
            "propagate",
            json!({
                "duration": record.duration_s,
                "active_nodes": record.active_nodes,
                "emergent_patterns": record.emergent_patterns.len(),
            }),
        );

        self.propagation_history.push_back(record.clone());
        while self.propagation_history.len() > self.config.propagation_history_capacity {
            self.propagation_history.pop_front();
        }
        record
    }

    /// Plan one epoch against the current snapshot. Reads only.
    pub(crate) fn plan_epoch(&self, mode: PropagationMode) -> EpochPlan {
        let cfg = &self.config;
        let retain = 1.0 - cfg.propagation_loss;
        let inhibitory = mode == PropagationMode::Wave && self.activation_count % 4 >= 2;
        let focus = match mode {
            PropagationMode::Focused => self.focus_set(),
            _ => BTreeSet::new(),
        };

        let mut deliveries = Vec::new();
        for source in self.nodes.values().filter(|n| n.is_active()) {
            let outgoing = source.activation * retain;
            let live = source
                .connections
                .iter()
                .filter_map(|(target, &w)| self.nodes.get(target).map(|t| (t, w)));

            match mode {
                PropagationMode::Directed => {
                    // Dangling edges take part in the ranking and are
                    // skipped after the cut.
                    let mut ranked: Vec<(&String, f64)> =
                        source.connections.iter().map(|(t, &w)| (t, w)).collect();
                    // Stable sort keeps name order among equal weights.
                    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                    let strongest = ranked
                        .into_iter()
                        .take(cfg.directed_fanout)
                        .filter_map(|(target, w)| self.nodes.get(target).map(|t| (t, w)));
                    for (target, w) in strongest {
                        deliveries.push(Delivery {
                            source: source.name.clone(),
                            target: target.name.clone(),
                            amount: outgoing * w * cfg.directed_gain,
                        });
                    }
                }
                _ => {
                    for (target, w) in live {
                        let gain = match mode {
                            PropagationMode::Diffusion | PropagationMode::Directed => 1.0,
                            PropagationMode::Resonance if target.kind == source.kind => {
                                cfg.resonance_gain
                            }
                            PropagationMode::Resonance => 1.0,
                            PropagationMode::Wave if inhibitory => cfg.wave_inhibitory_gain,
                            PropagationMode::Wave => cfg.wave_excitatory_gain,
                            PropagationMode::Focused if focus.contains(target.name.as_str()) => {
                                cfg.focus_gain
                            }
                            PropagationMode::Focused => 1.0,
                        };
                        deliveries.push(Delivery {
                            source: source.name.clone(),
                            target: target.name.clone(),
                            amount: outgoing * w * gain,
                        });
                    }
                }
            }
        }
        EpochPlan {
            deliveries,
            inhibitory,
        }
    }

    fn apply_epoch(&mut self, plan: &EpochPlan, mode: PropagationMode) {
        let tag = match mode {
            PropagationMode::Wave => "wave_excitatory",
            other => other.as_str(),
        };
        let scale = self.config.wave_inhibition_scale;
        let mut fired = Vec::new();
        for (target, amount) in plan.pending() {
            let Some(node) = self.nodes.get_mut(target) else {
                continue;
            };
            if plan.inhibitory {
                node.decay(amount.abs() * scale);
            } else if node.activate(amount, Some(tag)) {
                if let Some(label) = &node.label {
                    fired.push((label.clone(), target.to_string()));
                }
            }
        }
        for (label, name) in fired {
            self.notify_fired(&label, &name);
        }
    }

    /// Meta nodes plus the `focus_top_k` nodes with the most outgoing
    /// edges (ties in name order).
    pub(crate) fn focus_set(&self) -> BTreeSet<&str> {
        let mut focus: BTreeSet<&str> = self
            .nodes
            .values()
            .filter(|n| n.kind == NodeKind::Meta)
            .map(|n| n.name.as_str())
            .collect();

        let mut by_degree: Vec<(&str, usize)> = self
            .nodes
            .values()
            .map(|n| (n.name.as_str(), n.out_degree()))
            .collect();
        by_degree.sort_by(|a, b| b.1.cmp(&a.1));
        focus.extend(
            by_degree
                .into_iter()
                .take(self.config.focus_top_k)
                .map(|(name, _)| name),
        );
        focus
    }
}
