//! Raw x86 port I/O.
//!
//! Everything here is a thin wrapper around `in`/`out`. Callers own the
//! question of whether poking a given port is sane; these functions only
//! guarantee the instruction encoding.

/// Read a byte from `port`.
///
/// # Safety
/// Port reads can have device side effects (e.g. popping the PS/2 output
/// buffer). The caller must know what lives at `port`.
#[cfg(target_arch = "x86")]
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    // SAFETY: `in` itself is always encodable; semantics are the caller's.
    unsafe {
        core::arch::asm!(
            "in al, dx",
            in("dx") port,
            out("al") value,
            options(nomem, nostack, preserves_flags)
        );
    }
    value
}

/// Write `value` to `port`.
///
/// # Safety
/// Writing device registers can reconfigure hardware. The caller must know
/// what lives at `port`.
#[cfg(target_arch = "x86")]
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    // SAFETY: see above.
    unsafe {
        core::arch::asm!(
            "out dx, al",
            in("dx") port,
            in("al") value,
            options(nomem, nostack, preserves_flags)
        );
    }
}
