use std::time::Duration;

use arcpath_core::{NavPath, PathSegment};

use crate::{AgentState, TrajectoryCommand, TrajectoryController};

/// Walks an agent along a solved path one segment at a time.
#[derive(Clone, Debug)]
pub struct PathFollower {
    path: NavPath,
    index: usize,
    controller: TrajectoryController,
}

impl PathFollower {
    /// Starts following `path` from its first segment.
    #[must_use]
    pub fn new(path: NavPath, controller: TrajectoryController) -> Self {
        Self {
            path,
            index: 0,
            controller,
        }
    }

    /// Path being followed.
    #[must_use]
    pub fn path(&self) -> &NavPath {
        &self.path
    }

    /// Index of the segment currently being traversed.
    #[must_use]
    pub const fn segment_index(&self) -> usize {
        self.index
    }

    /// Segment currently being traversed.
    #[must_use]
    pub fn current_segment(&self) -> Option<PathSegment> {
        self.path.segment(self.index)
    }

    /// Reports whether every segment has been completed.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.index >= self.path.segment_count()
    }

    /// Drives the controller for one tick, advancing past completed segments.
    ///
    /// Returns `None` once the path is finished.
    pub fn step(&mut self, agent: &AgentState, dt: Duration) -> Option<TrajectoryCommand> {
        let segment = self.current_segment()?;
        let command = self.controller.step(agent, &segment, dt);
        if command.segment_complete {
            self.index += 1;
        }
        Some(command)
    }

    /// Abandons the current segment, typically after a stall.
    pub fn skip_segment(&mut self) {
        if !self.finished() {
            self.index += 1;
        }
    }
}
