// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! A directed, weighted graph of stateful trigger nodes that spread
//! bounded activation under five propagation policies, detect emergent
//! structure (cycles, synchrony, stability) and rewire themselves from
//! observed co-activation.
//!
//! ```
//! use lattice_core::Lattice;
//! use lattice_types::PropagationMode;
//!
//! let mut lattice = Lattice::with_roots();
//! lattice.activate("symbolic_root", 6.0, Some("external"));
//! let record = lattice
//!     .propagate(5, PropagationMode::Resonance)
//!     .into_record()
//!     .expect("not already propagating");
//! assert!(record.active_nodes >= 1);
//! ```
//!
//! # Invariants
//!
//! 1. **Activation is bounded**: every node's activation stays within
//!    `[0, max_activation]`. Non-finite amounts count as zero and
//!    inhibitory wave deliveries are applied as decay.
//!
//! 2. **Firing is edge-triggered**: `activate` reports `true` only on
//!    the call that moves a node from below to at-or-above threshold.
//!
//! 3. **Epochs are synchronous**: the source set is frozen before any
//!    delivery of an epoch is applied, so visiting order never matters.
//!
//! 4. **Propagation is not re-entrant**: a call made while one is in
//!    progress returns `AlreadyPropagating` and changes nothing.
//!
//! 5. **Names, not handles**: unknown names yield `false`/`None`, and
//!    edges to removed nodes are skipped by every traversal.

pub mod adapt;
pub mod analysis;
pub mod detect;
pub mod hooks;
pub mod lattice;
pub mod node;
pub mod patterns;
pub mod persist;
pub mod propagation;
pub mod shared;
pub mod stats;

pub use analysis::{GraphView, LatticeAnalysis};
pub use detect::PatternDetector;
pub use hooks::{
    ExternalGlyphs, ExternalTrace, GlyphEvent, GlyphSink, LogTrace, MemoryTrace, NullGlyphs,
    NullTrace, TraceRecord, TraceSink,
};
pub use lattice::Lattice;
pub use node::{Disconnection, TriggerNode};
pub use patterns::{CustomPattern, PatternActivation, PatternRegistration};
pub use persist::{LatticeState, NodeState};
pub use shared::SharedLattice;
