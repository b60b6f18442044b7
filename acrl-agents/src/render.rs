use std::{
    thread,
    time::{Duration, Instant},
};

const TARGET_FRAME: Duration = Duration::from_millis(30);
const MIN_FRAME: Duration = Duration::from_millis(10);

/// How long a rendered frame stays on screen after a step that took `step_time`.
pub fn frame_delay(step_time: Duration) -> Duration {
    TARGET_FRAME.saturating_sub(step_time).max(MIN_FRAME)
}

/// Sleeps out the rest of the frame that started at `step_started`.
pub fn pace_frame(step_started: Instant) {
    thread::sleep(frame_delay(step_started.elapsed()));
}
