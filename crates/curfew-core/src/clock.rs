//! Clock driven by the tokio timer

use chrono::{DateTime, Local};
use curfew_util::Clock;
use tokio::time::Instant;

/// Wall clock that advances with tokio's notion of time.
///
/// Under a paused runtime (`#[tokio::test(start_paused = true)]`) sleeping
/// advances this clock too, so week-long trigger schedules run instantly
/// in tests.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin_wall: DateTime<Local>,
    origin: Instant,
}

impl TokioClock {
    pub fn starting_at(wall: DateTime<Local>) -> Self {
        Self {
            origin_wall: wall,
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Local> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_wall + elapsed
    }
}
