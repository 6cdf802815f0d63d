//! Jump parabola geometry in tile space.
//!
//! Rows grow downward, so an arc that rises by the apex height `J` reaches a
//! vertex `J` rows *above* its start, which is a smaller `y` value. Curves are
//! expressed relative to the start column: `y(x') = A·x'² + B·x' + y1`.

use serde::{Deserialize, Serialize};

use crate::NavError;

/// Discriminants this far below zero are treated as "no solution".
const DISCRIMINANT_TOLERANCE: f64 = 1e-9;

/// Which half of the parabola a trajectory is currently travelling along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcBranch {
    /// Between the take-off point and the vertex.
    Ascending,
    /// Between the vertex and the landing point.
    Descending,
}

impl ArcBranch {
    /// Selects the branch implied by a vertical velocity in tile space.
    ///
    /// Negative velocities move toward row zero, which is upward.
    #[must_use]
    pub fn from_vertical_velocity(velocity: f64) -> Self {
        if velocity < 0.0 {
            Self::Ascending
        } else {
            Self::Descending
        }
    }
}

/// Downward-opening parabola linking two standing positions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JumpArc {
    from: (f64, f64),
    to: (f64, f64),
    apex_height: f64,
    a: f64,
    b: f64,
}

impl JumpArc {
    /// Derives the parabola that peaks `apex_height` rows above `from` and
    /// passes through `to`.
    ///
    /// Fails with [`NavError::UndefinedArc`] when the landing point lies more
    /// than one apex height above the start, when both points share a column,
    /// or when any input is not finite.
    pub fn new(from: (f64, f64), to: (f64, f64), apex_height: f64) -> Result<Self, NavError> {
        let run = to.0 - from.0;
        let rise = to.1 - from.1;
        let undefined = NavError::UndefinedArc { rise, apex_height };

        let finite = [from.0, from.1, to.0, to.1, apex_height]
            .iter()
            .all(|value| value.is_finite());
        if !finite || apex_height <= 0.0 || run == 0.0 || rise < -apex_height {
            return Err(undefined);
        }

        let root = (1.0 + rise / apex_height).sqrt();
        let vertex_offset = run / (1.0 + root);
        let b = -2.0 * apex_height / vertex_offset;
        let a = b * b / (4.0 * apex_height);

        Ok(Self {
            from,
            to,
            apex_height,
            a,
            b,
        })
    }

    /// Take-off point.
    #[must_use]
    pub const fn from(&self) -> (f64, f64) {
        self.from
    }

    /// Landing point.
    #[must_use]
    pub const fn to(&self) -> (f64, f64) {
        self.to
    }

    /// Configured apex height in tiles.
    #[must_use]
    pub const fn apex_height(&self) -> f64 {
        self.apex_height
    }

    /// Quadratic coefficient `A`.
    #[must_use]
    pub const fn a(&self) -> f64 {
        self.a
    }

    /// Linear coefficient `B`.
    #[must_use]
    pub const fn b(&self) -> f64 {
        self.b
    }

    /// Constant term `C`, equal to the take-off row.
    #[must_use]
    pub const fn c(&self) -> f64 {
        self.from.1
    }

    /// Signed horizontal distance from take-off to landing.
    #[must_use]
    pub fn run(&self) -> f64 {
        self.to.0 - self.from.0
    }

    /// Horizontal offset of the vertex relative to the take-off column.
    #[must_use]
    pub fn vertex_offset(&self) -> f64 {
        -self.b / (2.0 * self.a)
    }

    /// Absolute tile-space coordinate of the vertex.
    #[must_use]
    pub fn vertex(&self) -> (f64, f64) {
        (
            self.from.0 + self.vertex_offset(),
            self.from.1 - self.apex_height,
        )
    }

    /// Row occupied by the curve at horizontal offset `offset` from take-off.
    #[must_use]
    pub fn height_at(&self, offset: f64) -> f64 {
        self.a * offset * offset + self.b * offset + self.from.1
    }

    /// Horizontal offset at which the curve reaches `height` on `branch`.
    ///
    /// Returns `NaN` when the curve never reaches that row, which callers treat
    /// as the end of arc following.
    #[must_use]
    pub fn offset_at(&self, height: f64, branch: ArcBranch) -> f64 {
        let spread = self.root_spread(height);
        let direction = self.run().signum();
        match branch {
            ArcBranch::Ascending => self.vertex_offset() - direction * spread,
            ArcBranch::Descending => self.vertex_offset() + direction * spread,
        }
    }

    /// Both offsets at which the curve reaches `height`, ascending first.
    #[must_use]
    pub fn offsets_at(&self, height: f64) -> (f64, f64) {
        (
            self.offset_at(height, ArcBranch::Ascending),
            self.offset_at(height, ArcBranch::Descending),
        )
    }

    fn root_spread(&self, height: f64) -> f64 {
        let discriminant = self.b * self.b - 4.0 * self.a * (self.from.1 - height);
        if discriminant.is_nan() || discriminant < -DISCRIMINANT_TOLERANCE {
            return f64::NAN;
        }
        discriminant.max(0.0).sqrt() / (2.0 * self.a)
    }

    /// Length of the curve between take-off and landing.
    #[must_use]
    pub fn length(&self) -> f64 {
        let start_slope = self.b;
        let end_slope = 2.0 * self.a * self.run() + self.b;
        ((slope_integral(end_slope) - slope_integral(start_slope)) / (2.0 * self.a)).abs()
    }
}

/// Antiderivative of `sqrt(1 + u²)`.
fn slope_integral(u: f64) -> f64 {
    (u * (1.0 + u * u).sqrt() + u.asinh()) / 2.0
}

/// Closed-form length of the jump arc between two points.
pub fn arc_length(from: (f64, f64), to: (f64, f64), apex_height: f64) -> Result<f64, NavError> {
    JumpArc::new(from, to, apex_height).map(|arc| arc.length())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn endpoints_lie_on_the_curve() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x00a2_c0de);
        for _ in 0..500 {
            let apex: f64 = rng.gen_range(0.5..6.0);
            let from: (f64, f64) = (rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0));
            let mut run: f64 = rng.gen_range(-12.0..12.0);
            if run.abs() < 0.05 {
                run = 1.0;
            }
            let rise = rng.gen_range(-0.99 * apex..10.0);
            let to = (from.0 + run, from.1 + rise);

            let arc = JumpArc::new(from, to, apex).expect("rise within apex height");
            assert_relative_eq!(arc.height_at(0.0), from.1, epsilon = 1e-9);
            assert_relative_eq!(arc.height_at(run), to.1, epsilon = 1e-6);
        }
    }

    #[test]
    fn vertex_sits_one_apex_above_take_off() {
        let arc = JumpArc::new((0.0, 1.0), (2.0, 1.0), 2.0).expect("level jump");
        assert_relative_eq!(arc.vertex().0, 1.0);
        assert_relative_eq!(arc.vertex().1, -1.0);
        assert_relative_eq!(arc.height_at(arc.vertex_offset()), -1.0);
    }

    #[test]
    fn undefined_when_landing_exceeds_apex() {
        let error = JumpArc::new((0.0, 5.0), (2.0, 2.0), 2.0).expect_err("rise of three");
        assert_eq!(
            error,
            NavError::UndefinedArc {
                rise: -3.0,
                apex_height: 2.0
            }
        );
        assert!(JumpArc::new((0.0, 0.0), (0.0, 1.0), 2.0).is_err());
        assert!(JumpArc::new((0.0, 0.0), (1.0, 0.0), 0.0).is_err());
    }

    #[test]
    fn landing_exactly_one_apex_higher_peaks_at_the_landing() {
        let arc = JumpArc::new((0.0, 3.0), (2.0, 1.0), 2.0).expect("rise equals apex");
        assert_relative_eq!(arc.vertex().0, 2.0);
        assert_relative_eq!(arc.height_at(2.0), 1.0);
    }

    #[test]
    fn inverse_selects_branch_by_direction_of_travel() {
        let rightward = JumpArc::new((0.0, 0.0), (4.0, 0.0), 2.0).expect("level jump");
        let (up, down) = rightward.offsets_at(-1.5);
        assert!(up < rightward.vertex_offset());
        assert!(down > rightward.vertex_offset());
        assert_relative_eq!(rightward.height_at(up), -1.5, epsilon = 1e-9);
        assert_relative_eq!(rightward.height_at(down), -1.5, epsilon = 1e-9);

        let leftward = JumpArc::new((0.0, 0.0), (-4.0, 0.0), 2.0).expect("level jump");
        let up = leftward.offset_at(-1.5, ArcBranch::Ascending);
        assert!(up > leftward.vertex_offset(), "ascending leftward stays right of the vertex");
    }

    #[test]
    fn inverse_above_the_vertex_is_nan() {
        let arc = JumpArc::new((0.0, 0.0), (4.0, 0.0), 2.0).expect("level jump");
        assert!(arc.offset_at(-2.5, ArcBranch::Descending).is_nan());
        assert_relative_eq!(
            arc.offset_at(-2.0, ArcBranch::Ascending),
            arc.vertex_offset(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn length_exceeds_chord_and_matches_numeric_integral() {
        let arc = JumpArc::new((0.0, 0.0), (3.0, 1.0), 2.0).expect("downward jump");
        let mut numeric = 0.0;
        let steps = 20_000;
        let run = arc.run();
        let mut previous = (0.0, arc.height_at(0.0));
        for step in 1..=steps {
            let x = run * f64::from(step) / f64::from(steps);
            let point = (x, arc.height_at(x));
            numeric += ((point.0 - previous.0).powi(2) + (point.1 - previous.1).powi(2)).sqrt();
            previous = point;
        }

        assert_relative_eq!(arc.length(), numeric, epsilon = 1e-4);
        assert!(arc.length() > (run * run + 1.0_f64).sqrt());
        assert_relative_eq!(
            arc_length((0.0, 0.0), (3.0, 1.0), 2.0).expect("defined"),
            arc.length()
        );
    }
}
