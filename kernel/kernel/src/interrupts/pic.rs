//! 8259A programmable interrupt controller pair.
//!
//! At reset the PICs deliver IRQs 0–7 on vectors 8–15, colliding with CPU
//! exceptions. [`remap`] walks both chips through the ICW1–ICW4 init
//! sequence and moves them to vectors 0x20–0x2F, leaving only the timer
//! and keyboard lines unmasked.

#[cfg(target_arch = "x86")]
use crate::ports::{inb, outb};

#[cfg(target_arch = "x86")]
const PIC1_CMD: u16 = 0x20;
#[cfg(target_arch = "x86")]
const PIC1_DATA: u16 = 0x21;
#[cfg(target_arch = "x86")]
const PIC2_CMD: u16 = 0xA0;
#[cfg(target_arch = "x86")]
const PIC2_DATA: u16 = 0xA1;

/// ICW1: start init, expect ICW4.
#[cfg(target_arch = "x86")]
const ICW1_INIT: u8 = 0x11;

/// ICW4: 8086/88 mode.
#[cfg(target_arch = "x86")]
const ICW4_8086: u8 = 0x01;

/// End-of-interrupt command byte.
#[cfg(target_arch = "x86")]
const PIC_EOI: u8 = 0x20;

/// Vector base of the primary PIC after [`remap`].
pub const OFFSET_PRIMARY: u8 = 0x20;

/// Vector base of the secondary PIC after [`remap`].
pub const OFFSET_SECONDARY: u8 = 0x28;

/// The IDT vector `irq` (0–15) raises once the PICs are remapped.
#[must_use]
pub const fn vector_for_irq(irq: u8) -> u8 {
    if irq < 8 {
        OFFSET_PRIMARY + irq
    } else {
        OFFSET_SECONDARY + (irq - 8)
    }
}

/// Re-initialize both PICs onto vectors 0x20/0x28 and mask all lines
/// except the cascade (IRQ 2).
///
/// # Safety
/// Rewrites live interrupt-controller state. Call once, with interrupts
/// disabled, before the IDT is armed.
#[cfg(target_arch = "x86")]
pub unsafe fn remap() {
    // SAFETY: fixed ICW sequence on the documented command/data ports.
    unsafe {
        outb(PIC1_CMD, ICW1_INIT);
        outb(PIC2_CMD, ICW1_INIT);

        // ICW2: vector offsets.
        outb(PIC1_DATA, OFFSET_PRIMARY);
        outb(PIC2_DATA, OFFSET_SECONDARY);

        // ICW3: secondary hangs off IRQ 2 of the primary.
        outb(PIC1_DATA, 0x04);
        outb(PIC2_DATA, 0x02);

        outb(PIC1_DATA, ICW4_8086);
        outb(PIC2_DATA, ICW4_8086);

        // Initial masks: only IRQ 0 (timer) and IRQ 1 (keyboard) open.
        outb(PIC1_DATA, 0xFC);
        outb(PIC2_DATA, 0xFF);
    }
}

/// Acknowledge `irq` so the PIC will deliver the next one.
///
/// For IRQs on the secondary chip the secondary must be acknowledged
/// first, then the primary (which sees the cascade line).
///
/// # Safety
/// Only meaningful from the tail of the handler servicing `irq`.
#[cfg(target_arch = "x86")]
pub unsafe fn send_eoi(irq: u8) {
    // SAFETY: single command-byte writes.
    unsafe {
        if irq >= 8 {
            outb(PIC2_CMD, PIC_EOI);
        }
        outb(PIC1_CMD, PIC_EOI);
    }
}

/// Mask (disable) `irq`.
///
/// # Safety
/// Read-modify-write of the interrupt mask register; callers serialize
/// against other mask updates.
#[cfg(target_arch = "x86")]
pub unsafe fn set_mask(irq: u8) {
    let (port, line) = mask_port(irq);
    // SAFETY: RMW on the chip's own IMR port.
    unsafe {
        let value = inb(port) | (1 << line);
        outb(port, value);
    }
}

/// Unmask (enable) `irq`.
///
/// # Safety
/// See [`set_mask`].
#[cfg(target_arch = "x86")]
pub unsafe fn clear_mask(irq: u8) {
    let (port, line) = mask_port(irq);
    // SAFETY: RMW on the chip's own IMR port.
    unsafe {
        let value = inb(port) & !(1 << line);
        outb(port, value);
    }
}

#[cfg(target_arch = "x86")]
const fn mask_port(irq: u8) -> (u16, u8) {
    if irq < 8 {
        (PIC1_DATA, irq)
    } else {
        (PIC2_DATA, irq - 8)
    }
}

/// Sends the EOI for one IRQ when dropped.
///
/// Constructed at the top of a handler so every exit path, including an
/// early return, acknowledges the controller exactly once.
pub struct EoiGuard {
    #[cfg_attr(not(target_arch = "x86"), allow(dead_code))]
    irq: u8,
}

impl EoiGuard {
    /// Arm the guard for `irq`.
    #[must_use]
    pub const fn new(irq: u8) -> Self {
        Self { irq }
    }
}

impl Drop for EoiGuard {
    fn drop(&mut self) {
        #[cfg(target_arch = "x86")]
        // SAFETY: dropped at handler exit for the IRQ it was armed with.
        unsafe {
            send_eoi(self.irq);
        }
    }
}
