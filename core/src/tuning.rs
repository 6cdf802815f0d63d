//! Physical constants that shape jump discovery and edge weights.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::TraversableSet;

/// Selects how jump edges are weighted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMode {
    /// Short and long jumps carry their configured constant cost.
    #[default]
    Flat,
    /// Jumps cost the length of their arc.
    ArcLength,
}

/// Jump physics and search bounds used by the level compiler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpTuning {
    /// Maximum upward displacement of a jump, in tiles (`J`).
    pub apex_height: u32,
    /// Horizontal span of a flat short jump, in tiles (`M`).
    pub flat_span: u32,
    /// Weight of a single walking step.
    pub walk_cost: f64,
    /// Weight of a jump found by the centre rectangle scan.
    pub short_jump_cost: f64,
    /// Weight of a jump found by the side-zone scan.
    pub long_jump_cost: f64,
    /// Whether jumps use constant weights or arc lengths.
    pub weight_mode: WeightMode,
    /// Rows scanned below a node when searching the centre rectangle.
    pub drop_slack: u32,
    /// Chords used to approximate an arc during clearance checks.
    pub arc_samples: u32,
    /// Symbols an agent may pass through.
    pub traversable: TraversableSet,
}

impl Default for JumpTuning {
    fn default() -> Self {
        Self {
            apex_height: 2,
            flat_span: 3,
            walk_cost: 1.0,
            short_jump_cost: 2.0,
            long_jump_cost: 3.0,
            weight_mode: WeightMode::Flat,
            drop_slack: 2,
            arc_samples: 10,
            traversable: TraversableSet::default(),
        }
    }
}

impl JumpTuning {
    /// Half-width of the centre rectangle scan, `⌊M/2⌋`.
    #[must_use]
    pub const fn centre_reach(&self) -> i32 {
        clamp_to_i32(self.flat_span / 2)
    }

    /// Outer limit of the side-zone scan, `⌊1.5·M⌋`.
    #[must_use]
    pub const fn side_reach(&self) -> i32 {
        clamp_to_i32(self.flat_span.saturating_mul(3) / 2)
    }

    /// Apex height as a signed row count.
    #[must_use]
    pub const fn apex_rows(&self) -> i32 {
        clamp_to_i32(self.apex_height)
    }

    /// Validates the constants, rejecting values that make the search degenerate.
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.apex_height == 0 {
            return Err(TuningError::ZeroApexHeight);
        }
        if self.flat_span == 0 {
            return Err(TuningError::ZeroFlatSpan);
        }
        if self.arc_samples == 0 {
            return Err(TuningError::ZeroArcSamples);
        }
        let costs = [
            ("walk_cost", self.walk_cost),
            ("short_jump_cost", self.short_jump_cost),
            ("long_jump_cost", self.long_jump_cost),
        ];
        for (name, value) in costs {
            if !value.is_finite() || value < 0.0 {
                return Err(TuningError::InvalidCost { name, value });
            }
        }
        Ok(())
    }
}

const fn clamp_to_i32(value: u32) -> i32 {
    if value > i32::MAX as u32 {
        i32::MAX
    } else {
        value as i32
    }
}

/// Problems detected while validating [`JumpTuning`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TuningError {
    /// `apex_height` must be at least one tile.
    #[error("apex height must be at least one tile")]
    ZeroApexHeight,
    /// `flat_span` must be at least one tile.
    #[error("flat jump span must be at least one tile")]
    ZeroFlatSpan,
    /// `arc_samples` must be positive.
    #[error("arcs need at least one clearance sample")]
    ZeroArcSamples,
    /// A weight was negative or not finite.
    #[error("{name} must be a finite non-negative number, got {value}")]
    InvalidCost {
        /// Name of the offending field.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_follow_flat_span() {
        let tuning = JumpTuning::default();
        assert_eq!(tuning.centre_reach(), 1);
        assert_eq!(tuning.side_reach(), 4);

        let wide = JumpTuning {
            flat_span: 5,
            ..JumpTuning::default()
        };
        assert_eq!(wide.centre_reach(), 2);
        assert_eq!(wide.side_reach(), 7);
    }

    #[test]
    fn validation_rejects_degenerate_constants() {
        assert!(JumpTuning::default().validate().is_ok());

        let flat = JumpTuning {
            apex_height: 0,
            ..JumpTuning::default()
        };
        assert_eq!(flat.validate(), Err(TuningError::ZeroApexHeight));

        let negative = JumpTuning {
            long_jump_cost: -1.0,
            ..JumpTuning::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(TuningError::InvalidCost {
                name: "long_jump_cost",
                ..
            })
        ));
    }

    #[test]
    fn tuning_survives_bincode_round_trip() {
        let tuning = JumpTuning {
            weight_mode: WeightMode::ArcLength,
            traversable: TraversableSet::new([' ', 'F']),
            ..JumpTuning::default()
        };
        let bytes = bincode::serialize(&tuning).expect("serialize tuning");
        let decoded: JumpTuning = bincode::deserialize(&bytes).expect("deserialize tuning");
        assert_eq!(decoded, tuning);
    }
}
