//! Timing knobs for a [`Player`](crate::Player).
//!
//! The module answers queries after a firmware dependent pause. The defaults
//! were measured on a DY-SV5W at 9600 baud; slower firmware or a different baud
//! rate may need longer latencies.

/// UART speed the module ships with (8N1).
pub const BAUD_RATE: u32 = 9600;

/// How long to wait after sending a query before the first poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLatency {
    pub play_state_ms: u32,
    /// Current song, song counts and folder queries
    pub song_ms: u32,
    /// Online drive and play drive queries
    pub drive_ms: u32,
}

impl Default for QueryLatency {
    fn default() -> Self {
        Self {
            play_state_ms: 100,
            song_ms: 500,
            drive_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Upper bound on the time spent polling for a response
    pub response_timeout_ms: u64,
    /// Sleep between empty polls
    pub poll_interval_ms: u32,
    pub latency: QueryLatency,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 1000,
            poll_interval_ms: 10,
            latency: QueryLatency::default(),
        }
    }
}

impl PlayerConfig {
    pub fn with_response_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.response_timeout_ms = timeout_ms;
        self
    }

    pub fn with_poll_interval_ms(mut self, interval_ms: u32) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    pub fn with_latency(mut self, latency: QueryLatency) -> Self {
        self.latency = latency;
        self
    }

    /// Skip the post-send pauses entirely. Useful against simulators.
    pub fn without_latency(self) -> Self {
        self.with_latency(QueryLatency {
            play_state_ms: 0,
            song_ms: 0,
            drive_ms: 0,
        })
    }
}
