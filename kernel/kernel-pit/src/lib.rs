//! # Programmable Interval Timer Arithmetic
//!
//! Divisor and tick arithmetic for the 8253/8254 PIT, kept separate from
//! the port I/O so the math is testable on the host.
//!
//! The PIT counts down from a 16-bit divisor at a fixed input clock of
//! ~1.193182 MHz and raises IRQ0 each time the counter hits zero, so the
//! interrupt rate is `PIT_BASE_HZ / divisor`. The kernel's notion of time
//! is nothing more than the number of IRQ0 firings, held in a
//! [`TickCounter`].

#![cfg_attr(not(any(test, doctest)), no_std)]

use core::sync::atomic::{AtomicU32, Ordering};

/// Input clock of the PIT in Hz.
pub const PIT_BASE_HZ: u32 = 1_193_182;

/// Channel 0 square-wave setup byte for the mode/command register:
/// channel 0, lobyte/hibyte access, mode 3, binary counting.
pub const PIT_COMMAND_CHANNEL0: u8 = 0x36;

/// Compute the channel-0 reload divisor for a desired interrupt rate.
///
/// Returns `None` for `hz == 0`, which the hardware cannot express. Rates
/// outside what a 16-bit divisor can reach are clamped: higher than the
/// input clock gives the fastest divisor (1), lower than ~19 Hz the
/// slowest (0xFFFF).
#[must_use]
pub const fn divisor_for(hz: u32) -> Option<u16> {
    if hz == 0 {
        return None;
    }
    let divisor = PIT_BASE_HZ / hz;
    if divisor == 0 {
        Some(1)
    } else if divisor > 0xFFFF {
        Some(0xFFFF)
    } else {
        #[allow(clippy::cast_possible_truncation)]
        Some(divisor as u16)
    }
}

/// The interrupt rate actually produced by a reload divisor.
#[must_use]
pub const fn actual_hz(divisor: u16) -> u32 {
    PIT_BASE_HZ / divisor as u32
}

/// Monotonic IRQ0 tick count.
///
/// The timer interrupt handler is the only writer; everyone else reads.
/// At 100 Hz the counter wraps after roughly 497 days.
#[derive(Debug, Default)]
pub struct TickCounter(AtomicU32);

impl TickCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Record one timer interrupt.
    #[inline]
    pub fn record_tick(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Ticks since boot.
    #[inline]
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Milliseconds since boot, given the configured tick rate.
    ///
    /// Returns 0 for `hz == 0` rather than dividing by it.
    #[must_use]
    pub fn milliseconds(&self, hz: u32) -> u64 {
        if hz == 0 {
            return 0;
        }
        u64::from(self.ticks()) * 1000 / u64::from(hz)
    }

    /// Whole seconds since boot, given the configured tick rate.
    #[must_use]
    pub fn seconds(&self, hz: u32) -> u64 {
        self.milliseconds(hz) / 1000
    }
}
