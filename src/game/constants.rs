/// Board defaults
pub mod board {
    /// Board width in pixels
    pub const WIDTH: i32 = 700;
    /// Board height in pixels
    pub const HEIGHT: i32 = 700;
    /// Sprite footprint, also the repulsion and overlap threshold
    pub const OBJECT_SIZE: i32 = 20;
    /// Entities created per kind at session start
    pub const OBJECTS_PER_KIND: usize = 10;
}

/// Interaction constants
pub mod interaction {
    /// IoU above which a predator eats an overlapping prey
    pub const IOU_EAT_THRESHOLD: f32 = 0.3;
}

/// Frame pacing and observed-rate reporting
pub mod frame {
    use std::time::Duration;

    /// Lowest selectable target rate
    pub const MIN_FPS: u32 = 1;
    /// Highest selectable target rate
    pub const MAX_FPS: u32 = 60;
    /// Default target rate
    pub const DEFAULT_FPS: u32 = 30;
    /// Rolling window used for the smoothed observed FPS
    pub const FPS_WINDOW: Duration = Duration::from_secs(10);
    /// Samples kept for tick work-duration statistics (~4 seconds at 30 Hz)
    pub const BUDGET_SAMPLES: usize = 120;
    /// Sleep-based pacing stops sleeping this far ahead of the deadline and spins the rest
    pub const SPIN_MARGIN: Duration = Duration::from_millis(1);
    /// How long a stopped scheduler idles before polling controls again
    pub const IDLE_POLL: Duration = Duration::from_millis(10);
    /// Interval between periodic stats log lines
    pub const STATS_LOG_INTERVAL: Duration = Duration::from_secs(5);
}

/// Session defaults
pub mod session {
    /// Upper bound on ticks for a headless run
    pub const MAX_TICKS: u64 = 20_000;
    /// Xor mask separating the movement RNG stream from the placement stream
    pub const MOVEMENT_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;
}
