//! PS/2 keyboard input path.
//!
//! The ISR reads the scancode from port 0x60, runs it through the shared
//! [`ScancodeDecoder`] and pushes any resulting ASCII byte into a
//! fixed-size SPSC ring. Consumers drain the ring from thread context with
//! [`poll`] or [`read_blocking`]; when the ring is full the newest byte is
//! dropped rather than the backlog.

use kernel_ps2::ScancodeDecoder;
use kernel_sync::{SpinLock, SpscRing};

#[cfg(target_arch = "x86")]
use crate::interrupts::IRQ_KEYBOARD;
#[cfg(target_arch = "x86")]
use crate::interrupts::pic::EoiGuard;

#[cfg(target_arch = "x86")]
const PS2_DATA_PORT: u16 = 0x60;

/// Decoded bytes waiting for the shell. Capacity is one less than the
/// slot count.
static KEY_BUFFER: SpscRing<u8, 128> = SpscRing::new();

/// Modifier state. Only the ISR locks this, so the lock never spins.
static DECODER: SpinLock<ScancodeDecoder> = SpinLock::new(ScancodeDecoder::new());

/// Entry stub installed in the IDT for
/// [`VECTOR_KEYBOARD`](super::VECTOR_KEYBOARD).
#[cfg(target_arch = "x86")]
#[unsafe(naked)]
pub extern "C" fn keyboard_isr() {
    core::arch::naked_asm!(
        "pushad",
        "cld",
        "call {handler}",
        "popad",
        "iretd",
        handler = sym keyboard_interrupt,
    );
}

/// Rust half of the keyboard interrupt: one scancode per IRQ.
#[cfg(target_arch = "x86")]
extern "C" fn keyboard_interrupt() {
    let _eoi = EoiGuard::new(IRQ_KEYBOARD);
    // SAFETY: IRQ 1 fires only when the controller's output buffer is
    // full, so the read cannot block or pop stale data.
    let scancode = unsafe { crate::ports::inb(PS2_DATA_PORT) };
    handle_scancode(scancode);
}

#[cfg_attr(not(target_arch = "x86"), allow(dead_code))]
fn handle_scancode(scancode: u8) {
    if let Some(byte) = DECODER.lock().decode(scancode) {
        // A full ring drops this byte; typed input is lossy by nature.
        let _ = KEY_BUFFER.push(byte);
    }
}

/// Take the oldest pending byte, if any. Never blocks.
#[must_use]
pub fn poll() -> Option<u8> {
    KEY_BUFFER.pop()
}

/// Number of bytes waiting in the ring.
#[must_use]
pub fn pending() -> usize {
    KEY_BUFFER.len()
}

/// Drop everything typed so far.
pub fn clear() {
    while KEY_BUFFER.pop().is_some() {}
}

/// Wait for the next byte, halting the CPU between interrupts.
#[must_use]
pub fn read_blocking() -> u8 {
    loop {
        if let Some(byte) = KEY_BUFFER.pop() {
            return byte;
        }
        wait_for_interrupt();
    }
}

#[cfg(target_arch = "x86")]
#[inline]
fn wait_for_interrupt() {
    // SAFETY: `hlt` resumes on the next interrupt; IF is set during the
    // shell loop.
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
    }
}

#[cfg(not(target_arch = "x86"))]
#[inline]
fn wait_for_interrupt() {
    core::hint::spin_loop();
}

#[cfg(test)]
mod tests {
    use super::*;

    const SC_H: u8 = 0x23;
    const SC_I: u8 = 0x17;
    const SC_LEFT_SHIFT: u8 = 0x2A;

    // All tests share the global ring, so keep them in one body.
    #[test]
    fn scancodes_flow_through_to_poll() {
        clear();
        assert_eq!(poll(), None);

        handle_scancode(SC_H);
        handle_scancode(SC_H | 0x80);
        handle_scancode(SC_I);
        handle_scancode(SC_I | 0x80);
        assert_eq!(pending(), 2);
        assert_eq!(poll(), Some(b'h'));
        assert_eq!(poll(), Some(b'i'));
        assert_eq!(poll(), None);

        // Shift held across a press uppercases it; the release alone
        // produces nothing.
        handle_scancode(SC_LEFT_SHIFT);
        handle_scancode(SC_H);
        handle_scancode(SC_LEFT_SHIFT | 0x80);
        handle_scancode(SC_H);
        handle_scancode(SC_H | 0x80);
        assert_eq!(poll(), Some(b'H'));
        assert_eq!(poll(), Some(b'h'));

        handle_scancode(SC_H);
        assert_eq!(pending(), 1);
        clear();
        assert_eq!(pending(), 0);
    }
}
