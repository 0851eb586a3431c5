//! Elapsed-time measurement that works in the browser.
//!
//! `std::time::Instant::now` panics on `wasm32-unknown-unknown`, so wasm builds read the JS wall clock instead.

use std::time::Duration;

#[cfg(not(all(target_arch = "wasm32", feature = "wasm")))]
mod source {
    use std::time::Duration;

    pub type Stamp = std::time::Instant;

    pub fn now() -> Stamp {
        std::time::Instant::now()
    }

    pub fn between(earlier: Stamp, later: Stamp) -> Duration {
        later.saturating_duration_since(earlier)
    }
}

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
mod source {
    use std::time::Duration;

    /// Milliseconds since the Unix epoch.
    pub type Stamp = f64;

    pub fn now() -> Stamp {
        js_sys::Date::now()
    }

    /// The JS clock may step backwards; such intervals count as zero.
    pub fn between(earlier: Stamp, later: Stamp) -> Duration {
        Duration::from_secs_f64((later - earlier).max(0.0) / 1000.0)
    }
}

/// A point in time, comparable only with other points from this module.
#[derive(Copy, Clone, Debug)]
pub struct Instant(source::Stamp);

impl Instant {
    /// The current time.
    pub fn now() -> Self {
        Self(source::now())
    }

    /// Time since `self`; zero if the clock went backwards.
    pub fn elapsed(&self) -> Duration {
        source::between(self.0, source::now())
    }

    /// Time from `earlier` to `self`; zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        source::between(earlier.0, self.0)
    }
}
