// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{LatticeError, LatticeResult};

/// Upper bound for any node's activation.
pub const MAX_ACTIVATION: f64 = 10.0;
/// Default firing threshold for new nodes.
pub const ACTIVATION_THRESHOLD: f64 = 3.0;
/// Decay applied to every node after each `propagate` call.
pub const ACTIVATION_DECAY: f64 = 0.1;
/// Fraction of a source's activation lost on the way out.
pub const PROPAGATION_LOSS: f64 = 0.2;
/// Upper bound on epochs per `propagate` call.
pub const MAX_PROPAGATION_STEPS: usize = 10;

/// Runtime configuration for a trigger lattice.
///
/// Every constant the engine uses lives here so that experiments can
/// tune the dynamics without touching the algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Activation ceiling. Default: 10.0.
    pub max_activation: f64,

    /// Threshold given to nodes that do not specify one. Default: 3.0.
    pub activation_threshold: f64,

    /// Trailing decay applied once per `propagate` call. Default: 0.1.
    pub activation_decay: f64,

    /// Signal loss on every outgoing delivery. Default: 0.2.
    pub propagation_loss: f64,

    /// `propagate(steps)` is clamped to this. Default: 10.
    pub max_propagation_steps: usize,

    /// In-memory bound on each node's activation history. Default: 100.
    pub history_capacity: usize,

    /// History samples written per node on serialization. Default: 10.
    pub persisted_history: usize,

    /// Rolling bound on the in-memory propagation log. Default: 100.
    pub propagation_history_capacity: usize,

    /// Propagation records written on serialization. Default: 20.
    pub persisted_propagations: usize,

    /// Strongest edges followed per source in directed mode. Default: 2.
    pub directed_fanout: usize,

    /// Gain along directed edges. Default: 1.5.
    pub directed_gain: f64,

    /// Gain between nodes of the same kind in resonance mode. Default: 2.0.
    pub resonance_gain: f64,

    /// Outgoing gain during excitatory wave epochs. Default: 1.5.
    pub wave_excitatory_gain: f64,

    /// Outgoing gain during inhibitory wave epochs. Default: 0.5.
    pub wave_inhibitory_gain: f64,

    /// Inhibitory delivery → decay scale. Default: 0.5.
    pub wave_inhibition_scale: f64,

    /// Gain on deliveries into the focus set. Default: 2.5.
    pub focus_gain: f64,

    /// Highest out-degree nodes added to the focus set. Default: 3.
    pub focus_top_k: usize,

    /// Cycles reported per detection pass; enumeration stops here. Default: 256.
    pub max_cycles: usize,

    /// Search steps per cycle-detection pass; enumeration stops here.
    /// Default: 100_000.
    pub max_cycle_steps: usize,

    /// Minimum history samples before a node can synchronize. Default: 3.
    pub sync_min_history: usize,

    /// Pearson correlation required to join a cluster. Default: 0.8.
    pub sync_correlation: f64,

    /// Samples used for the stability score. Default: 5.
    pub stability_window: usize,

    /// Stability score required for a stable configuration. Default: 0.7.
    pub stability_threshold: f64,

    /// Member → emergent node edge weight. Default: 0.8.
    pub emergent_inbound_weight: f64,

    /// Emergent node → member edge weight. Default: 0.4.
    pub emergent_outbound_weight: f64,

    /// Spawned node threshold = factor × `activation_threshold`. Default: 1.2.
    pub emergent_threshold_factor: f64,

    /// RNG seed for structural mutation. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            max_activation: MAX_ACTIVATION,
            activation_threshold: ACTIVATION_THRESHOLD,
            activation_decay: ACTIVATION_DECAY,
            propagation_loss: PROPAGATION_LOSS,
            max_propagation_steps: MAX_PROPAGATION_STEPS,
            history_capacity: 100,
            persisted_history: 10,
            propagation_history_capacity: 100,
            persisted_propagations: 20,
            directed_fanout: 2,
            directed_gain: 1.5,
            resonance_gain: 2.0,
            wave_excitatory_gain: 1.5,
            wave_inhibitory_gain: 0.5,
            wave_inhibition_scale: 0.5,
            focus_gain: 2.5,
            focus_top_k: 3,
            max_cycles: 256,
            max_cycle_steps: 100_000,
            sync_min_history: 3,
            sync_correlation: 0.8,
            stability_window: 5,
            stability_threshold: 0.7,
            emergent_inbound_weight: 0.8,
            emergent_outbound_weight: 0.4,
            emergent_threshold_factor: 1.2,
            seed: None,
        }
    }
}

impl LatticeConfig {
    /// Default configuration with a fixed RNG seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> LatticeResult<()> {
        if !(self.max_activation > 0.0) {
            return Err(LatticeError::Config(format!(
                "max_activation must be > 0, got {}",
                self.max_activation
            )));
        }
        if !(self.activation_threshold > 0.0) || self.activation_threshold > self.max_activation
        {
            return Err(LatticeError::Config(format!(
                "activation_threshold must be in (0, {}], got {}",
                self.max_activation, self.activation_threshold
            )));
        }
        if self.activation_decay < 0.0 {
            return Err(LatticeError::Config(format!(
                "activation_decay must be >= 0, got {}",
                self.activation_decay
            )));
        }
        if !(0.0..1.0).contains(&self.propagation_loss) {
            return Err(LatticeError::Config(format!(
                "propagation_loss must be in [0, 1), got {}",
                self.propagation_loss
            )));
        }
        if self.max_propagation_steps == 0 {
            return Err(LatticeError::Config(
                "max_propagation_steps must be >= 1".to_string(),
            ));
        }
        if self.history_capacity < self.stability_window.max(self.sync_min_history) {
            return Err(LatticeError::Config(format!(
                "history_capacity must be >= {}, got {}",
                self.stability_window.max(self.sync_min_history),
                self.history_capacity
            )));
        }
        if self.persisted_history == 0 || self.propagation_history_capacity == 0 {
            return Err(LatticeError::Config(
                "history bounds must be >= 1".to_string(),
            ));
        }
        if self.directed_fanout == 0 {
            return Err(LatticeError::Config(
                "directed_fanout must be >= 1".to_string(),
            ));
        }
        if self.sync_min_history < 2 {
            return Err(LatticeError::Config(format!(
                "sync_min_history must be >= 2, got {}",
                self.sync_min_history
            )));
        }
        if !(-1.0..=1.0).contains(&self.sync_correlation) {
            return Err(LatticeError::Config(format!(
                "sync_correlation must be in [-1, 1], got {}",
                self.sync_correlation
            )));
        }
        if !(0.0..=1.0).contains(&self.stability_threshold) || self.stability_window < 2 {
            return Err(LatticeError::Config(format!(
                "stability_threshold must be in [0, 1] with window >= 2, got {} / {}",
                self.stability_threshold, self.stability_window
            )));
        }
        if self.emergent_threshold_factor <= 0.0 {
            return Err(LatticeError::Config(format!(
                "emergent_threshold_factor must be > 0, got {}",
                self.emergent_threshold_factor
            )));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> LatticeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LatticeError::Config(format!("JSON parse error: {e}")))
    }
}
