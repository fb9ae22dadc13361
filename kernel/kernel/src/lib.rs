//! Protected-mode kernel core.
//!
//! Subsystems, in dependency order:
//!
//! * [`ports`] — raw port I/O.
//! * [`memory`] — physical frame pool and the identity address space.
//! * [`idt`] — gate descriptors and the interrupt table.
//! * [`interrupts`] — PIC remap, PIT ticks, PS/2 input.
//! * [`console`] — VGA text writer.
//! * [`shell`] — interactive command loop.
//!
//! The binary target wires these together at boot; everything here is also
//! compiled for the host so the hardware-independent logic stays testable.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod console;
pub mod idt;
pub mod interrupts;
pub mod memory;
pub mod ports;
pub mod shell;
