//! Keyboard-style navigation between timers

use std::sync::Arc;
use timegraph_common::{TimerInfo, TimerType};

use super::TimeGraph;
use crate::domain::Tid;
use crate::tracks::{Track, TrackKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpDirection {
    Previous,
    Next,
    /// Enclosing timer one depth up
    Top,
    /// First enclosed timer one depth down
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpScope {
    /// Neighbor on the same row of the same track
    SameDepth,
    /// Closest call of the same function on any thread
    SameFunction,
    SameThreadSameFunction,
}

impl TimeGraph {
    /// Track a timer was routed to
    #[must_use]
    pub fn track_of(&self, timer: &TimerInfo) -> Option<Arc<Track>> {
        if timer.timer_type == TimerType::GpuActivity {
            self.registry.gpu_track(timer.timeline_hash)
        } else {
            self.registry.thread_track(Tid(timer.thread_id))
        }
    }

    fn thread_tracks(&self) -> impl Iterator<Item = Arc<Track>> {
        self.registry
            .tracks()
            .into_iter()
            .map(|(_, track)| track)
            .filter(|track| track.kind() == TrackKind::Thread)
    }

    /// Call of `function_address` whose end is closest before `current_time`,
    /// optionally restricted to one thread
    #[must_use]
    pub fn find_previous_function_call(
        &self,
        function_address: u64,
        current_time: u64,
        tid: Option<Tid>,
    ) -> Option<TimerInfo> {
        let matches = |timer: &TimerInfo| {
            timer.function_address == function_address
                && tid.is_none_or(|tid| timer.thread_id == tid.0)
        };
        let mut best: Option<TimerInfo> = None;
        for track in self.thread_tracks() {
            for chain in track.timer_chains() {
                let snapshot = chain.snapshot();
                if let Some(candidate) = snapshot.nearest_before(current_time, &matches) {
                    if best.is_none_or(|best| candidate.end > best.end) {
                        best = Some(*candidate);
                    }
                }
            }
        }
        best
    }

    /// Call of `function_address` whose end is closest after `current_time`,
    /// optionally restricted to one thread
    #[must_use]
    pub fn find_next_function_call(
        &self,
        function_address: u64,
        current_time: u64,
        tid: Option<Tid>,
    ) -> Option<TimerInfo> {
        let matches = |timer: &TimerInfo| {
            timer.function_address == function_address
                && tid.is_none_or(|tid| timer.thread_id == tid.0)
        };
        let mut best: Option<TimerInfo> = None;
        for track in self.thread_tracks() {
            for chain in track.timer_chains() {
                let snapshot = chain.snapshot();
                if let Some(candidate) = snapshot.nearest_after(current_time, &matches) {
                    if best.is_none_or(|best| candidate.end < best.end) {
                        best = Some(*candidate);
                    }
                }
            }
        }
        best
    }

    /// Find the neighbor of `from` and, if there is one, select it and zoom
    /// onto it. `scope` is ignored for [`JumpDirection::Top`] and
    /// [`JumpDirection::Down`], which stay within the track.
    pub fn jump_to_neighbor_box(
        &mut self,
        from: &TimerInfo,
        direction: JumpDirection,
        scope: JumpScope,
    ) -> Option<TimerInfo> {
        let function_address = from.function_address;
        let current_time = from.end;
        let tid = Tid(from.thread_id);

        let goal = match (direction, scope) {
            (JumpDirection::Previous, JumpScope::SameDepth) => {
                self.track_of(from).and_then(|track| track.left(from))
            }
            (JumpDirection::Previous, JumpScope::SameFunction) => {
                self.find_previous_function_call(function_address, current_time, None)
            }
            (JumpDirection::Previous, JumpScope::SameThreadSameFunction) => {
                self.find_previous_function_call(function_address, current_time, Some(tid))
            }
            (JumpDirection::Next, JumpScope::SameDepth) => {
                self.track_of(from).and_then(|track| track.right(from))
            }
            (JumpDirection::Next, JumpScope::SameFunction) => {
                self.find_next_function_call(function_address, current_time, None)
            }
            (JumpDirection::Next, JumpScope::SameThreadSameFunction) => {
                self.find_next_function_call(function_address, current_time, Some(tid))
            }
            (JumpDirection::Top, _) => self.track_of(from).and_then(|track| track.up(from)),
            (JumpDirection::Down, _) => self.track_of(from).and_then(|track| track.down(from)),
        };

        if let Some(goal) = goal {
            self.select_and_zoom(&goal);
        }
        goal
    }
}
