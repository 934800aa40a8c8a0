//! Fixed-timestep accumulator
//!
//! How it works: <https://gafferongames.com/post/fix_your_timestep/>

use std::time::Duration;

use tokio::time::Instant;

/// Accumulates elapsed real time and decides how many fixed steps to run.
///
/// After a stall (suspended process, long pause) the number of catch-up
/// steps in one pass is capped; accumulated time beyond the cap is dropped
/// so the simulation rejoins real time instead of replaying the gap.
#[derive(Debug)]
pub struct TickClock {
    timestep: Duration,
    catchup_limit: u32,
    accumulator: Duration,
    last_frame: Option<Instant>,
}

impl TickClock {
    pub fn new(timestep: Duration, catchup_limit: u32) -> Self {
        Self {
            timestep,
            catchup_limit,
            accumulator: Duration::ZERO,
            last_frame: None,
        }
    }

    /// Forget accumulated time; the next `advance` call re-establishes the
    /// baseline. Called on session (re)establishment.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
        self.last_frame = None;
    }

    /// Record the current frame time and return how many fixed steps to run.
    pub fn advance(&mut self, now: Instant) -> u32 {
        let elapsed = match self.last_frame {
            Some(prev) => now.saturating_duration_since(prev),
            None => Duration::ZERO,
        };
        self.last_frame = Some(now);
        self.accumulator += elapsed;

        let mut steps = 0;
        while self.accumulator >= self.timestep {
            self.accumulator -= self.timestep;
            steps += 1;
            if steps >= self.catchup_limit {
                // drop the backlog rather than defer it
                self.accumulator = Duration::ZERO;
                break;
            }
        }
        steps
    }
}
