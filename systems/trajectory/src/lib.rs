#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Arc-following trajectory controller.
//!
//! The controller never integrates motion itself. Each tick it inspects the
//! agent's body state and tells the external physics engine what to do: push
//! horizontally for walking segments, or chase the horizontal offset the jump
//! parabola prescribes for the agent's current row during jumps.

mod follower;

use std::time::Duration;

use arcpath_core::{ArcBranch, JumpArc, PathSegment, SegmentMotion};
use glam::Vec2;
use log::debug;
use serde::{Deserialize, Serialize};

pub use follower::PathFollower;

/// Constants governing arrival, cooldown and stall detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerTuning {
    /// Horizontal distance, in tiles, within which the target counts as reached.
    pub arrival_tolerance_x: f32,
    /// Vertical distance, in tiles, within which the target counts as reached.
    pub arrival_tolerance_y: f32,
    /// Magnitude of the horizontal impulse issued on walking segments.
    pub walk_impulse: f32,
    /// Vertical speed below which the agent is considered to be at the apex.
    pub apex_speed: f32,
    /// Delay after landing before the next jump may be launched, in milliseconds.
    pub jump_cooldown_ms: u64,
    /// Time without movement after which the agent is reported stalled, in milliseconds.
    pub stall_timeout_ms: u64,
    /// Displacement, in tiles, below which the agent counts as stationary.
    pub stall_distance: f32,
    /// Horizontal direction reversals tolerated on one segment before the
    /// agent is reported oscillating.
    pub oscillation_limit: u32,
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self {
            arrival_tolerance_x: 0.15,
            arrival_tolerance_y: 0.6,
            walk_impulse: 1.0,
            apex_speed: 0.05,
            jump_cooldown_ms: 500,
            stall_timeout_ms: 2_000,
            stall_distance: 0.01,
            oscillation_limit: 10,
        }
    }
}

impl ControllerTuning {
    /// Cooldown applied after a jump segment completes.
    #[must_use]
    pub const fn jump_cooldown(&self) -> Duration {
        Duration::from_millis(self.jump_cooldown_ms)
    }

    /// Stationary time after which the agent is reported stalled.
    #[must_use]
    pub const fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }
}

/// Body state reported by the physics engine, in tile space with rows growing downward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AgentState {
    /// Standing position of the agent.
    pub position: Vec2,
    /// Velocity in tiles per second; negative `y` moves upward.
    pub velocity: Vec2,
    /// Whether the body currently rests on ground.
    pub grounded: bool,
}

/// Horizontal instruction for the physics body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HorizontalControl {
    /// Leave horizontal motion to the physics engine.
    Hold,
    /// Apply a signed horizontal impulse.
    Impulse(f32),
    /// Move the body to the provided column.
    Target(f32),
}

/// Instruction produced by one controller tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectoryCommand {
    /// Horizontal instruction for this tick.
    pub horizontal: HorizontalControl,
    /// Whether the body should receive its jump impulse this tick.
    pub vertical_impulse_requested: bool,
    /// Whether the agent reached the end of the segment.
    pub segment_complete: bool,
    /// Whether the agent has not moved for longer than the stall timeout.
    pub stalled: bool,
    /// Whether the agent keeps reversing direction without making progress.
    pub oscillating: bool,
}

/// Stateful controller driving one agent along path segments.
#[derive(Clone, Debug)]
pub struct TrajectoryController {
    apex_height: f64,
    tuning: ControllerTuning,
    segment: Option<PathSegment>,
    launched: bool,
    following_arc: bool,
    last_offset: Option<f64>,
    cooldown: Duration,
    stall_anchor: Option<Vec2>,
    stationary_for: Duration,
    last_x: Option<f32>,
    heading: Option<f32>,
    reversals: u32,
}

impl TrajectoryController {
    /// Creates a controller for jumps peaking `apex_height` tiles above take-off.
    #[must_use]
    pub fn new(apex_height: f64, tuning: ControllerTuning) -> Self {
        Self {
            apex_height,
            tuning,
            segment: None,
            launched: false,
            following_arc: true,
            last_offset: None,
            cooldown: Duration::ZERO,
            stall_anchor: None,
            stationary_for: Duration::ZERO,
            last_x: None,
            heading: None,
            reversals: 0,
        }
    }

    /// Constants the controller was created with.
    #[must_use]
    pub fn tuning(&self) -> &ControllerTuning {
        &self.tuning
    }

    /// Remaining jump cooldown.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> Duration {
        self.cooldown
    }

    /// Advances the controller by `dt` and produces this tick's instruction.
    pub fn step(
        &mut self,
        agent: &AgentState,
        segment: &PathSegment,
        dt: Duration,
    ) -> TrajectoryCommand {
        if self.segment.as_ref() != Some(segment) {
            self.begin(*segment);
        }
        self.cooldown = self.cooldown.saturating_sub(dt);
        let stalled = self.track_stall(agent.position, dt);
        let oscillating = self.track_heading(agent.position.x);

        let target = Vec2::new(segment.to.x() as f32, segment.to.y() as f32);
        let offset = target - agent.position;
        let at_target = offset.x.abs() <= self.tuning.arrival_tolerance_x
            && offset.y.abs() <= self.tuning.arrival_tolerance_y;

        let mut command = TrajectoryCommand {
            horizontal: HorizontalControl::Hold,
            vertical_impulse_requested: false,
            segment_complete: false,
            stalled,
            oscillating,
        };

        match segment.motion {
            SegmentMotion::Walk => {
                if at_target {
                    command.segment_complete = true;
                } else if offset.x != 0.0 {
                    command.horizontal =
                        HorizontalControl::Impulse(offset.x.signum() * self.tuning.walk_impulse);
                }
            }
            SegmentMotion::Jump => {
                if at_target && agent.velocity.y >= 0.0 {
                    command.segment_complete = true;
                    command.horizontal = HorizontalControl::Target(target.x);
                    self.cooldown = self.tuning.jump_cooldown();
                } else if !self.launched {
                    if agent.grounded && self.cooldown.is_zero() {
                        self.launched = true;
                        command.vertical_impulse_requested = true;
                        command.horizontal = HorizontalControl::Target(segment.from.x() as f32);
                    }
                } else {
                    command.horizontal = self.follow_arc(agent, segment, target.x);
                }
            }
        }

        command
    }

    fn begin(&mut self, segment: PathSegment) {
        self.segment = Some(segment);
        self.launched = false;
        self.following_arc = true;
        self.last_offset = None;
        self.stall_anchor = None;
        self.stationary_for = Duration::ZERO;
        self.last_x = None;
        self.heading = None;
        self.reversals = 0;
    }

    fn track_stall(&mut self, position: Vec2, dt: Duration) -> bool {
        match self.stall_anchor {
            Some(anchor) if anchor.distance(position) < self.tuning.stall_distance => {
                self.stationary_for = self.stationary_for.saturating_add(dt);
            }
            _ => {
                self.stall_anchor = Some(position);
                self.stationary_for = Duration::ZERO;
            }
        }
        self.stationary_for >= self.tuning.stall_timeout()
    }

    /// Counts reversals of horizontal movement larger than the stall distance.
    fn track_heading(&mut self, x: f32) -> bool {
        if let Some(previous) = self.last_x.replace(x) {
            let moved = x - previous;
            if moved.abs() >= self.tuning.stall_distance {
                let heading = moved.signum();
                if self.heading.is_some_and(|last| last != heading) {
                    self.reversals = self.reversals.saturating_add(1);
                }
                self.heading = Some(heading);
            }
        }
        self.reversals > self.tuning.oscillation_limit
    }

    fn follow_arc(
        &mut self,
        agent: &AgentState,
        segment: &PathSegment,
        landing_x: f32,
    ) -> HorizontalControl {
        if !self.following_arc {
            return HorizontalControl::Target(landing_x);
        }

        let arc = match JumpArc::new(
            segment.from.to_point(),
            segment.to.to_point(),
            self.apex_height,
        ) {
            Ok(arc) => arc,
            Err(error) => {
                debug!("not following segment {} -> {}: {error}", segment.from, segment.to);
                self.following_arc = false;
                return HorizontalControl::Target(landing_x);
            }
        };

        let height = f64::from(agent.position.y);
        let vertical = f64::from(agent.velocity.y);
        let offset = if vertical.abs() < f64::from(self.tuning.apex_speed) {
            self.closest_root(&arc, height)
        } else {
            arc.offset_at(height, ArcBranch::from_vertical_velocity(vertical))
        };

        // Past the landing column the curve no longer describes this jump.
        if offset.is_nan() || offset / arc.run() > 1.0 {
            self.following_arc = false;
            return HorizontalControl::Target(landing_x);
        }
        self.last_offset = Some(offset);
        HorizontalControl::Target((arc.from().0 + offset) as f32)
    }

    /// Near the apex both roots are close; keep whichever continues the
    /// trajectory from the previous tick.
    fn closest_root(&self, arc: &JumpArc, height: f64) -> f64 {
        let (ascending, descending) = arc.offsets_at(height);
        let Some(previous) = self.last_offset else {
            return ascending;
        };
        if (descending - previous).abs() < (ascending - previous).abs() {
            descending
        } else {
            ascending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcpath_core::NodeKey;

    fn grounded_at(x: f32, y: f32) -> AgentState {
        AgentState {
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
            grounded: true,
        }
    }

    #[test]
    fn closest_root_prefers_continuity() {
        let mut controller = TrajectoryController::new(2.0, ControllerTuning::default());
        let arc = JumpArc::new((0.0, 0.0), (4.0, 0.0), 2.0).expect("level jump");

        assert_eq!(controller.closest_root(&arc, -1.5), 1.0, "defaults to ascending");
        controller.last_offset = Some(2.6);
        assert_eq!(controller.closest_root(&arc, -1.5), 3.0);
    }

    #[test]
    fn aligned_walker_is_not_pushed_sideways() {
        let mut controller = TrajectoryController::new(2.0, ControllerTuning::default());
        let segment = PathSegment::new(NodeKey::new(0, 0), NodeKey::new(1, 0), 1.0);
        let above = AgentState {
            position: Vec2::new(1.0, -1.0),
            velocity: Vec2::ZERO,
            grounded: false,
        };

        let command = controller.step(&above, &segment, Duration::from_millis(16));
        assert_eq!(command.horizontal, HorizontalControl::Hold);
        assert!(!command.segment_complete);
    }

    #[test]
    fn descending_past_the_landing_column_targets_the_landing() {
        let mut controller = TrajectoryController::new(2.0, ControllerTuning::default());
        let segment = PathSegment::new(NodeKey::new(0, 2), NodeKey::new(3, 0), 3.0);
        controller.begin(segment);
        controller.launched = true;
        let falling = AgentState {
            position: Vec2::new(2.4, 0.075),
            velocity: Vec2::new(0.0, 0.4),
            grounded: false,
        };

        let command = controller.step(&falling, &segment, Duration::from_millis(16));
        assert_eq!(command.horizontal, HorizontalControl::Target(3.0));
        assert!(!controller.following_arc);
    }

    #[test]
    fn zero_dt_repeats_do_not_advance_timers() {
        let mut controller = TrajectoryController::new(2.0, ControllerTuning::default());
        let segment = PathSegment::new(NodeKey::new(0, 0), NodeKey::new(1, 0), 1.0);
        let agent = grounded_at(0.0, 0.0);

        let first = controller.step(&agent, &segment, Duration::ZERO);
        let second = controller.step(&agent, &segment, Duration::ZERO);
        assert_eq!(first, second);
        assert!(!second.stalled);
    }
}
