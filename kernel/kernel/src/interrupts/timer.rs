//! PIT channel 0 as the system tick source.
//!
//! [`init`] programs the PIT for a periodic square wave and remembers the
//! requested rate so tick counts can be turned back into wall time. The
//! naked ISR stub saves the GPRs, bumps the counter and acknowledges the
//! PIC via [`EoiGuard`].

use core::sync::atomic::{AtomicU32, Ordering};

use kernel_pit::TickCounter;
#[cfg(target_arch = "x86")]
use kernel_pit::{PIT_COMMAND_CHANNEL0, actual_hz, divisor_for};

use crate::interrupts::IRQ_TIMER;
use crate::interrupts::pic::EoiGuard;

#[cfg(target_arch = "x86")]
const PIT_COMMAND_PORT: u16 = 0x43;
#[cfg(target_arch = "x86")]
const PIT_CHANNEL0_PORT: u16 = 0x40;

static TICKS: TickCounter = TickCounter::new();
static CONFIGURED_HZ: AtomicU32 = AtomicU32::new(0);

/// Program the PIT for `hz` interrupts per second.
///
/// A rate of zero is rejected and leaves the PIT untouched. Rates outside
/// the achievable range are clamped by the divisor computation; the rate
/// actually programmed is what [`uptime_ms`] uses.
#[cfg(target_arch = "x86")]
pub fn init(hz: u32) {
    let Some(divisor) = divisor_for(hz) else {
        log::warn!("timer: rejecting 0 Hz, PIT left unprogrammed");
        return;
    };

    let programmed = actual_hz(divisor);
    CONFIGURED_HZ.store(programmed, Ordering::Relaxed);

    // SAFETY: mode/command then lo/hi reload on channel 0, the documented
    // programming sequence; runs before IRQ 0 is unmasked.
    unsafe {
        crate::ports::outb(PIT_COMMAND_PORT, PIT_COMMAND_CHANNEL0);
        crate::ports::outb(PIT_CHANNEL0_PORT, (divisor & 0xFF) as u8);
        crate::ports::outb(PIT_CHANNEL0_PORT, (divisor >> 8) as u8);
    }

    log::info!("timer: PIT programmed for {programmed} Hz (divisor {divisor})");
}

/// Entry stub installed in the IDT for [`VECTOR_TIMER`](super::VECTOR_TIMER).
#[cfg(target_arch = "x86")]
#[unsafe(naked)]
pub extern "C" fn timer_isr() {
    core::arch::naked_asm!(
        "pushad",
        "cld",
        "call {handler}",
        "popad",
        "iretd",
        handler = sym timer_tick,
    );
}

/// Rust half of the timer interrupt.
#[cfg_attr(not(target_arch = "x86"), allow(dead_code))]
extern "C" fn timer_tick() {
    let _eoi = EoiGuard::new(IRQ_TIMER);
    TICKS.record_tick();
}

/// Ticks observed since [`init`].
#[must_use]
pub fn ticks() -> u32 {
    TICKS.ticks()
}

/// Milliseconds since [`init`], derived from the programmed rate.
///
/// Zero until the PIT has been programmed.
#[must_use]
pub fn uptime_ms() -> u64 {
    TICKS.milliseconds(CONFIGURED_HZ.load(Ordering::Relaxed))
}

/// The rate handed to the PIT, 0 if [`init`] has not run.
#[must_use]
pub fn configured_hz() -> u32 {
    CONFIGURED_HZ.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_accumulate_through_the_handler() {
        let before = ticks();
        CONFIGURED_HZ.store(100, Ordering::Relaxed);

        for _ in 0..250 {
            timer_tick();
        }

        assert_eq!(ticks() - before, 250);
        // 250 ticks at 100 Hz is 2.5 seconds.
        assert!(uptime_ms() >= 2500);
    }
}
