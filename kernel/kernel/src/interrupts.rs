//! Hardware interrupt plumbing: PIC remap, PIT ticks, PS/2 input.

pub mod keyboard;
pub mod pic;
pub mod timer;

/// IRQ line of the PIT channel 0 output.
pub const IRQ_TIMER: u8 = 0;

/// IRQ line of the PS/2 keyboard controller.
pub const IRQ_KEYBOARD: u8 = 1;

/// IDT vector the timer IRQ arrives on after the remap.
pub const VECTOR_TIMER: u8 = pic::vector_for_irq(IRQ_TIMER);

/// IDT vector the keyboard IRQ arrives on after the remap.
pub const VECTOR_KEYBOARD: u8 = pic::vector_for_irq(IRQ_KEYBOARD);
