use std::time::Duration;

use arcpath_core::{NavPath, PathSegment};
use arcpath_system_trajectory::{
    AgentState, ControllerTuning, HorizontalControl, PathFollower, TrajectoryCommand,
    TrajectoryController,
};
use glam::Vec2;
use log::{debug, warn};

/// Downward acceleration of the simulated body, in tiles per second squared.
const GRAVITY: f32 = 20.0;
/// Horizontal speed reached under a unit walk impulse, in tiles per second.
const WALK_SPEED: f32 = 4.0;
/// Horizontal distance from a node within which its row acts as ground.
const FOOTING: f32 = 0.5;

/// Simulation step length.
pub(crate) const TICK: Duration = Duration::from_nanos(16_666_667);

/// What happened to one path segment during a simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum SegmentOutcome {
    /// The segment completed on the given tick.
    Completed { segment: PathSegment, tick: u32 },
    /// The agent stalled or oscillated and the segment was skipped on the given tick.
    Skipped { segment: PathSegment, tick: u32 },
}

/// Minimal kinematic body that obeys controller output exactly.
#[derive(Clone, Copy, Debug)]
struct Body {
    state: AgentState,
    jump_speed: f32,
}

impl Body {
    fn standing_at(x: f32, y: f32, apex_height: f32) -> Self {
        Self {
            state: AgentState {
                position: Vec2::new(x, y),
                velocity: Vec2::ZERO,
                grounded: true,
            },
            jump_speed: (2.0 * GRAVITY * apex_height).sqrt(),
        }
    }

    /// Ground row beneath the body while it traverses `segment`, if any.
    fn footing(&self, segment: &PathSegment) -> Option<f32> {
        let x = self.state.position.x;
        [segment.to, segment.from]
            .into_iter()
            .find(|node| (node.x() as f32 - x).abs() <= FOOTING)
            .map(|node| node.y() as f32)
    }

    fn integrate(&mut self, command: &TrajectoryCommand, segment: &PathSegment, dt: f32) {
        let state = &mut self.state;
        if command.vertical_impulse_requested && state.grounded {
            state.velocity.y = -self.jump_speed;
            state.grounded = false;
        }
        match command.horizontal {
            HorizontalControl::Hold => state.velocity.x = 0.0,
            HorizontalControl::Impulse(push) => state.velocity.x = push * WALK_SPEED,
            HorizontalControl::Target(x) => {
                state.position.x = x;
                state.velocity.x = 0.0;
            }
        }

        if !state.grounded {
            state.velocity.y += GRAVITY * dt;
        }
        state.position += state.velocity * dt;

        let footing = self.footing(segment);
        let state = &mut self.state;
        match footing {
            Some(ground) if state.position.y >= ground && state.velocity.y >= 0.0 => {
                state.position.y = ground;
                state.velocity.y = 0.0;
                state.grounded = true;
            }
            Some(_) => {}
            None => state.grounded = false,
        }
    }
}

/// Drives a path follower against the kinematic body for at most `max_ticks`.
pub(crate) fn run(
    path: &NavPath,
    apex_height: u32,
    tuning: &ControllerTuning,
    max_ticks: u32,
) -> Vec<SegmentOutcome> {
    let start = path.start();
    let mut body = Body::standing_at(start.x() as f32, start.y() as f32, apex_height as f32);
    let controller = TrajectoryController::new(f64::from(apex_height), tuning.clone());
    let mut follower = PathFollower::new(path.clone(), controller);
    let mut outcomes = Vec::new();
    let dt = TICK.as_secs_f32();

    for tick in 1..=max_ticks {
        let Some(segment) = follower.current_segment() else {
            break;
        };
        let Some(command) = follower.step(&body.state, TICK) else {
            break;
        };
        body.integrate(&command, &segment, dt);

        if command.segment_complete {
            debug!("segment {} -> {} done at tick {tick}", segment.from, segment.to);
            outcomes.push(SegmentOutcome::Completed { segment, tick });
        } else if command.stalled || command.oscillating {
            warn!(
                "agent {} on {} -> {}",
                if command.stalled { "stalled" } else { "oscillated" },
                segment.from,
                segment.to
            );
            follower.skip_segment();
            outcomes.push(SegmentOutcome::Skipped { segment, tick });
        }
    }
    outcomes
}
