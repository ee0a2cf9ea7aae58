use bevy::prelude::*;
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ViolationKind {
    #[display("gradient")]
    Gradient,
    #[display("clearance-low")]
    ClearanceLow,
    #[display("clearance-high")]
    ClearanceHigh,
    #[display("bridge-clearance")]
    BridgeClearance,
}

/// A limit that elevation adjustment could not satisfy. The segment is still built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub segment_id: Option<usize>,
    pub position: Vec3,
    pub kind: ViolationKind,
    pub measured: f32,
    pub limit: f32,
}

impl ConstraintViolation {
    pub fn new(kind: ViolationKind, position: Vec3, measured: f32, limit: f32) -> Self {
        Self {
            segment_id: None,
            position,
            kind,
            measured,
            limit,
        }
    }

    pub fn for_segment(mut self, segment_id: usize) -> Self {
        self.segment_id = Some(segment_id);
        self
    }

    /// How far past the limit the measurement is
    pub fn excess(&self) -> f32 {
        match self.kind {
            ViolationKind::ClearanceLow | ViolationKind::BridgeClearance => {
                self.limit - self.measured
            }
            ViolationKind::Gradient | ViolationKind::ClearanceHigh => self.measured - self.limit,
        }
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} violation at ({:.1}, {:.1}, {:.1}): measured {:.3}, limit {:.3}",
            self.kind, self.position.x, self.position.y, self.position.z, self.measured, self.limit
        )?;
        if let Some(segment) = self.segment_id {
            write!(f, " (segment {segment})")?;
        }
        Ok(())
    }
}

/// Count violations per kind, in a stable order
pub fn summarize(violations: &[ConstraintViolation]) -> Vec<(ViolationKind, usize)> {
    [
        ViolationKind::Gradient,
        ViolationKind::ClearanceLow,
        ViolationKind::ClearanceHigh,
        ViolationKind::BridgeClearance,
    ]
    .into_iter()
    .map(|kind| (kind, violations.iter().filter(|v| v.kind == kind).count()))
    .filter(|(_, count)| *count > 0)
    .collect()
}
