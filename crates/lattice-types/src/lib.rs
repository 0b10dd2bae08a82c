// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! trigger lattice engine.

pub mod config;
pub mod error;
pub mod kind;
pub mod record;

pub use config::LatticeConfig;
pub use error::{LatticeError, LatticeResult};
pub use kind::{NamedPattern, NodeKind, PropagationMode};
pub use record::{
    unix_time_s, AdaptationReport, AdaptationStatus, EmergentPattern, PropagationOutcome,
    PropagationRecord, StructuralChange,
};
