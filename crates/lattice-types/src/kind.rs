// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Enumerations
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LatticeError;

/// Category of a trigger node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Symbolic,
    Semantic,
    Structural,
    Emergent,
    Meta,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Symbolic,
        NodeKind::Semantic,
        NodeKind::Structural,
        NodeKind::Emergent,
        NodeKind::Meta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Symbolic => "symbolic",
            NodeKind::Semantic => "semantic",
            NodeKind::Structural => "structural",
            NodeKind::Emergent => "emergent",
            NodeKind::Meta => "meta",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| LatticeError::InvalidKind(s.to_string()))
    }
}

/// Policy governing how an active node's energy is distributed in one epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Every edge receives `outgoing × weight`.
    #[default]
    Diffusion,
    /// Only the strongest edges, boosted.
    Directed,
    /// Boosted between nodes of the same kind.
    Resonance,
    /// Alternating excitatory and inhibitory epochs.
    Wave,
    /// Boosted into meta nodes and out-degree leaders.
    Focused,
}

impl PropagationMode {
    pub const ALL: [PropagationMode; 5] = [
        PropagationMode::Diffusion,
        PropagationMode::Directed,
        PropagationMode::Resonance,
        PropagationMode::Wave,
        PropagationMode::Focused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationMode::Diffusion => "diffusion",
            PropagationMode::Directed => "directed",
            PropagationMode::Resonance => "resonance",
            PropagationMode::Wave => "wave",
            PropagationMode::Focused => "focused",
        }
    }
}

impl fmt::Display for PropagationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropagationMode {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropagationMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| LatticeError::InvalidMode(s.to_string()))
    }
}

/// Built-in activation shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedPattern {
    /// Every symbolic node.
    SymbolicCascade,
    /// Every emergent node.
    EmergenceCycle,
    /// Every meta node.
    MetaReflection,
    /// Every structural node.
    StructuralEcho,
    /// The five root nodes.
    FullResonance,
}

impl NamedPattern {
    pub const ALL: [NamedPattern; 5] = [
        NamedPattern::SymbolicCascade,
        NamedPattern::EmergenceCycle,
        NamedPattern::MetaReflection,
        NamedPattern::StructuralEcho,
        NamedPattern::FullResonance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NamedPattern::SymbolicCascade => "symbolic_cascade",
            NamedPattern::EmergenceCycle => "emergence_cycle",
            NamedPattern::MetaReflection => "meta_reflection",
            NamedPattern::StructuralEcho => "structural_echo",
            NamedPattern::FullResonance => "full_resonance",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NamedPattern::SymbolicCascade => "Cascade of symbolic trigger activations",
            NamedPattern::EmergenceCycle => "Cyclic activation of emergent nodes",
            NamedPattern::MetaReflection => "Reflection across meta-level nodes",
            NamedPattern::StructuralEcho => "Echo pattern through structural nodes",
            NamedPattern::FullResonance => "Resonance across all root nodes",
        }
    }

    /// Kind selected by this shortcut; `None` for the root-set pattern.
    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            NamedPattern::SymbolicCascade => Some(NodeKind::Symbolic),
            NamedPattern::EmergenceCycle => Some(NodeKind::Emergent),
            NamedPattern::MetaReflection => Some(NodeKind::Meta),
            NamedPattern::StructuralEcho => Some(NodeKind::Structural),
            NamedPattern::FullResonance => None,
        }
    }
}

impl fmt::Display for NamedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamedPattern {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NamedPattern::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| LatticeError::UnknownPattern(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_all() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_parse_invalid() {
        let err = "quantum".parse::<NodeKind>().unwrap_err();
        assert!(matches!(err, LatticeError::InvalidKind(ref s) if s == "quantum"));
    }

    #[test]
    fn test_mode_parse_invalid() {
        assert!(matches!(
            "Diffusion".parse::<PropagationMode>(),
            Err(LatticeError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_mode_default_diffusion() {
        assert_eq!(PropagationMode::default(), PropagationMode::Diffusion);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        let json = serde_json::to_string(&PropagationMode::Focused).unwrap();
        assert_eq!(json, "\"focused\"");
        let kind: NodeKind = serde_json::from_str("\"meta\"").unwrap();
        assert_eq!(kind, NodeKind::Meta);
        assert!(serde_json::from_str::<NodeKind>("\"bogus\"").is_err());
    }

    #[test]
    fn test_named_pattern_kinds() {
        assert_eq!(NamedPattern::SymbolicCascade.kind(), Some(NodeKind::Symbolic));
        assert_eq!(NamedPattern::FullResonance.kind(), None);
        assert_eq!(
            "structural_echo".parse::<NamedPattern>().unwrap(),
            NamedPattern::StructuralEcho
        );
        assert!("echo".parse::<NamedPattern>().is_err());
    }
}
