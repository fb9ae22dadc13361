//! # QEMU Debug Output
//!
//! Logging and tracing over QEMU's debug console for kernel development.
//!
//! QEMU captures every byte written to I/O port `0x402` when started with
//! `-debugcon` (e.g. `-debugcon stdio`), which gives the kernel a host-side
//! output channel long before the VGA console is up. On real hardware the
//! port is typically unused and the writes are harmless.
//!
//! Two surfaces are provided:
//!
//! * [`qemu_trace!`] — direct, allocation-free `format!`-style output.
//! * [`QemuLogger`] — a [`log::Log`] implementation routing the standard
//!   `log` macros (`info!`, `warn!`, …) to the same port.
//!
//! The whole crate compiles to no-ops when the `enabled` feature is off, so
//! release builds carry no debug I/O. Output is byte-by-byte and unbuffered;
//! interleaving between contexts is possible but each write is immediate.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::QemuLogger;

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    /// The port number for QEMU's debug port.
    const QEMU_DEBUG_PORT: u16 = 0x402;

    /// Write a single character to QEMU's debug port.
    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn dbg_putc(c: u8) {
        #[cfg(target_arch = "x86")]
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") QEMU_DEBUG_PORT,
                in("al") c,
                options(nomem, preserves_flags)
            );
        }
        #[cfg(not(target_arch = "x86"))]
        let _ = (QEMU_DEBUG_PORT, c);
    }

    /// `fmt::Write` sink over the debug port.
    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for b in s.bytes() {
                dbg_putc(b);
            }
            Ok(())
        }

        #[inline]
        fn write_char(&mut self, c: char) -> fmt::Result {
            // UTF-8 encode without allocation.
            let mut buf = [0u8; 4];
            let s = c.encode_utf8(&mut buf);
            self.write_str(s)
        }
    }

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn qemu_write(args: fmt::Arguments) {
        // Ignore errors; this is best-effort debug output.
        let _ = fmt::write(&mut QemuSink, args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;
    #[doc(hidden)]
    #[inline(always)]
    pub fn qemu_write(_: fmt::Arguments) {
        // no-op when feature disabled
    }
}

/// Print directly to QEMU's debug console, bypassing the `log` facade.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        // No allocation: `format_args!` builds a lightweight `Arguments`.
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
