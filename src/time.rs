/// Monotonic clock used to bound response polling. Implement this for your
/// platform, or enable the `std` feature for [`StdClock`].
pub trait TimeSource {
    type Instant: Copy;

    fn now(&self) -> Self::Instant;

    /// Milliseconds since `since`. Must never go backwards.
    fn elapsed_ms(&self, since: Self::Instant) -> u64;
}

#[cfg(feature = "std")]
pub use host::{StdClock, StdDelay};

#[cfg(feature = "std")]
mod host {
    use std::time::{Duration, Instant};

    use embedded_hal::delay::DelayNs;

    use super::TimeSource;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct StdClock;

    impl TimeSource for StdClock {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        fn elapsed_ms(&self, since: Instant) -> u64 {
            since.elapsed().as_millis() as u64
        }
    }

    /// Blocking delay backed by `std::thread::sleep`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct StdDelay;

    impl DelayNs for StdDelay {
        fn delay_ns(&mut self, ns: u32) {
            std::thread::sleep(Duration::from_nanos(ns as u64));
        }

        fn delay_ms(&mut self, ms: u32) {
            std::thread::sleep(Duration::from_millis(ms as u64));
        }
    }

}
