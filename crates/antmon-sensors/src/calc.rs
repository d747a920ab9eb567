//! Rate calculators over rolling ANT+ counters.
//!
//! Event times are in 1/1024 s and, like revolution counts, roll over at
//! 16 bits; power event counts roll over at 8 bits. A page whose event time
//! (or event count) did not advance produces no new sample; after
//! [`STALL_PAGES`] such pages in a row the rate reads zero.

/// Consecutive unchanged pages after which a rate drops to zero.
pub const STALL_PAGES: u32 = 12;

const TICKS_PER_SECOND: f64 = 1024.0;

/// Converts a revolution rate into road speed.
#[must_use]
pub fn speed_kmh(rpm: f64, circumference_m: f64) -> f64 {
    rpm / 60.0 * circumference_m * 3.6
}

/// Rate and distance from an `(event time, cumulative revolutions)` counter pair.
#[derive(Debug, Clone, Default)]
pub struct RevolutionCalculator {
    last: Option<(u16, u16)>,
    total_revolutions: u64,
    stalled_pages: u32,
}

impl RevolutionCalculator {
    /// Empty calculator; the first page only establishes a baseline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one page; returns the revolution rate in rpm when it changed.
    pub fn update(&mut self, event_time: u16, revolutions: u16) -> Option<f64> {
        let (last_time, last_revs) = self.last.replace((event_time, revolutions))?;
        let delta_revs = revolutions.wrapping_sub(last_revs);
        self.total_revolutions += u64::from(delta_revs);

        let delta_time = event_time.wrapping_sub(last_time);
        if delta_time == 0 {
            self.stalled_pages = self.stalled_pages.saturating_add(1);
            return (self.stalled_pages >= STALL_PAGES).then_some(0.0);
        }
        self.stalled_pages = 0;
        Some(f64::from(delta_revs) * 60.0 * TICKS_PER_SECOND / f64::from(delta_time))
    }

    /// Revolutions counted since the first page.
    #[must_use]
    pub const fn total_revolutions(&self) -> u64 {
        self.total_revolutions
    }

    /// Distance covered since the first page.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distance_m(&self, circumference_m: f64) -> f64 {
        self.total_revolutions as f64 * circumference_m
    }
}

/// Average power from the power-only page's accumulated power and event count.
#[derive(Debug, Clone, Default)]
pub struct PowerCalculator {
    last: Option<(u8, u16)>,
    stalled_pages: u32,
}

impl PowerCalculator {
    /// Empty calculator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one page; returns average power in watts when it changed.
    ///
    /// The first page has no baseline and reports its instantaneous power.
    pub fn update(
        &mut self,
        event_count: u8,
        accumulated_power: u16,
        instantaneous_power: u16,
    ) -> Option<f64> {
        let Some((last_count, last_power)) =
            self.last.replace((event_count, accumulated_power))
        else {
            return Some(f64::from(instantaneous_power));
        };
        let delta_count = event_count.wrapping_sub(last_count);
        if delta_count == 0 {
            self.stalled_pages = self.stalled_pages.saturating_add(1);
            return (self.stalled_pages >= STALL_PAGES).then_some(0.0);
        }
        self.stalled_pages = 0;
        let delta_power = accumulated_power.wrapping_sub(last_power);
        Some(f64::from(delta_power) / f64::from(delta_count))
    }
}
