// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Record Types
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::kind::PropagationMode;

/// Wall-clock seconds since the Unix epoch (0.0 if the clock is before it).
#[inline]
pub fn unix_time_s() -> f64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// A structural regularity detected after a propagation epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmergentPattern {
    /// A directed cycle through currently active nodes, in canonical rotation.
    ActivationLoop {
        nodes: Vec<String>,
        #[serde(default)]
        timestamp: f64,
    },
    /// Nodes whose recent activation histories move together.
    Synchronization {
        nodes: Vec<String>,
        #[serde(default)]
        timestamp: f64,
    },
    /// A stable active node together with its stable active neighbours.
    StablePattern {
        configuration: Vec<String>,
        stability: f64,
        center_node: String,
        #[serde(default)]
        timestamp: f64,
    },
}

impl EmergentPattern {
    /// Short type tag, as written to persisted state.
    pub fn type_name(&self) -> &'static str {
        match self {
            EmergentPattern::ActivationLoop { .. } => "activation_loop",
            EmergentPattern::Synchronization { .. } => "synchronization",
            EmergentPattern::StablePattern { .. } => "stable_pattern",
        }
    }

    /// Member node names.
    pub fn nodes(&self) -> &[String] {
        match self {
            EmergentPattern::ActivationLoop { nodes, .. }
            | EmergentPattern::Synchronization { nodes, .. } => nodes,
            EmergentPattern::StablePattern { configuration, .. } => configuration,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            EmergentPattern::ActivationLoop { timestamp, .. }
            | EmergentPattern::Synchronization { timestamp, .. }
            | EmergentPattern::StablePattern { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, EmergentPattern::StablePattern { .. })
    }
}

/// Summary of one completed `propagate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationRecord {
    /// Epochs actually executed (after clamping).
    pub steps: usize,
    pub mode: PropagationMode,
    #[serde(default)]
    pub start_time_s: f64,
    #[serde(default)]
    pub duration_s: f64,
    /// Nodes at or above threshold after the trailing decay.
    pub active_nodes: usize,
    /// Activation of every node after each epoch.
    #[serde(default)]
    pub node_activations: Vec<BTreeMap<String, f64>>,
    /// Patterns detected during this call.
    #[serde(default)]
    pub emergent_patterns: Vec<EmergentPattern>,
}

/// Result of a `propagate` request.
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationOutcome {
    Completed(PropagationRecord),
    /// Rejected: another propagation was in progress on the same lattice.
    AlreadyPropagating,
}

impl PropagationOutcome {
    pub fn record(&self) -> Option<&PropagationRecord> {
        match self {
            PropagationOutcome::Completed(record) => Some(record),
            PropagationOutcome::AlreadyPropagating => None,
        }
    }

    pub fn into_record(self) -> Option<PropagationRecord> {
        match self {
            PropagationOutcome::Completed(record) => Some(record),
            PropagationOutcome::AlreadyPropagating => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, PropagationOutcome::AlreadyPropagating)
    }
}

/// One edge or node mutation made by structural adaptation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuralChange {
    Strengthen {
        from: String,
        to: String,
        old_weight: f64,
        new_weight: f64,
    },
    Create {
        from: String,
        to: String,
        weight: f64,
    },
    Weaken {
        from: String,
        to: String,
        old_weight: f64,
        new_weight: f64,
    },
    Remove {
        from: String,
        to: String,
    },
    SpawnNode {
        name: String,
        pattern: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationStatus {
    /// `adaptivity <= 0`: nothing examined.
    NoAdaptation,
    /// No node was at or above threshold.
    NoActiveNodes,
    Adapted,
}

/// Summary of one `adapt` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationReport {
    pub status: AdaptationStatus,
    /// Adaptivity after capping to [0, 1].
    pub adaptivity: f64,
    pub strengthened: usize,
    pub weakened: usize,
    pub created: usize,
    pub removed: usize,
    pub emergent_node: Option<String>,
    pub changes: Vec<StructuralChange>,
}

impl AdaptationReport {
    pub fn empty(status: AdaptationStatus, adaptivity: f64) -> Self {
        Self {
            status,
            adaptivity,
            strengthened: 0,
            weakened: 0,
            created: 0,
            removed: 0,
            emergent_node: None,
            changes: Vec::new(),
        }
    }

    /// Edge changes (node spawns not included).
    pub fn total(&self) -> usize {
        self.strengthened + self.weakened + self.created + self.removed
    }

    /// True when the graph was left exactly as it was.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}
