use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// A rise-over-run gradient limit constrained to [0.01, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, From, Serialize, Deserialize)]
pub struct GradientLimit(f32);

impl GradientLimit {
    const MIN: f32 = 0.01;
    const MAX: f32 = 1.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for GradientLimit {
    fn default() -> Self {
        Self::new(0.15)
    }
}

/// A vertical clearance in meters constrained to [0.0, 100.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, From, Serialize, Deserialize)]
pub struct ClearanceMeters(f32);

impl ClearanceMeters {
    const MIN: f32 = 0.0;
    const MAX: f32 = 100.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for ClearanceMeters {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// A node snap tolerance in meters constrained to [0.1, 100.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, From, Serialize, Deserialize)]
pub struct SnapTolerance(f32);

impl SnapTolerance {
    const MIN: f32 = 0.1;
    const MAX: f32 = 100.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for SnapTolerance {
    fn default() -> Self {
        Self::new(5.0)
    }
}

/// A search grid resolution in meters constrained to [1.0, 500.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, From, Serialize, Deserialize)]
pub struct CellResolution(f32);

impl CellResolution {
    const MIN: f32 = 1.0;
    const MAX: f32 = 500.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for CellResolution {
    fn default() -> Self {
        Self::new(12.0)
    }
}

/// A search iteration budget constrained to [16, 10_000_000]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, From, Serialize, Deserialize)]
pub struct IterationCap(usize);

impl IterationCap {
    const MIN: usize = 16;
    const MAX: usize = 10_000_000;

    pub fn new(value: usize) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for IterationCap {
    fn default() -> Self {
        Self::new(14_000)
    }
}

/// A recursion depth for adaptive subdivision constrained to [0, 12]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, From, Serialize, Deserialize)]
pub struct SubdivisionDepth(u32);

impl SubdivisionDepth {
    const MIN: u32 = 0;
    const MAX: u32 = 12;

    pub fn new(value: u32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for SubdivisionDepth {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_limit_clamping() {
        assert_eq!(GradientLimit::new(-1.0).get(), 0.01);
        assert_eq!(GradientLimit::new(0.15).get(), 0.15);
        assert_eq!(GradientLimit::new(3.0).get(), 1.0);
    }

    #[test]
    fn test_iteration_cap_clamping() {
        assert_eq!(IterationCap::new(0).get(), 16);
        assert_eq!(IterationCap::new(14_000).get(), 14_000);
        assert_eq!(IterationCap::new(usize::MAX).get(), 10_000_000);
    }

    #[test]
    fn test_display() {
        let tolerance = SnapTolerance::new(5.5);
        assert_eq!(format!("{tolerance}"), "5.5");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(GradientLimit::default().get(), 0.15);
        assert_eq!(SnapTolerance::default().get(), 5.0);
        assert_eq!(CellResolution::default().get(), 12.0);
        assert_eq!(IterationCap::default().get(), 14_000);
        assert_eq!(SubdivisionDepth::default().get(), 5);
    }
}
