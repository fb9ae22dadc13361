//! Interrupt masking for critical sections shared with interrupt handlers.
//!
//! A spin lock alone is not enough when an interrupt handler takes the same
//! lock: the handler would spin forever against the interrupted holder on a
//! single CPU. Wrapping the critical section in an [`IrqGuard`] closes that
//! window.
//!
//! The flag save/restore targets 32-bit x86 (`pushfd`/`cli`/`sti`); on other
//! architectures the guard compiles to a no-op so that shared code and
//! hosted tests still build.

/// Disables hardware interrupts (`cli`).
///
/// Must only be called in contexts where `cli` is permitted (CPL0).
#[cfg(target_arch = "x86")]
#[inline]
pub fn cli_stop_interrupts() {
    unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
}

/// Enables hardware interrupts (`sti`).
///
/// Must only be called in contexts where `sti` is permitted (CPL0).
#[cfg(target_arch = "x86")]
#[inline]
pub fn sti_enable_interrupts() {
    unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
}

/// Returns the current `EFLAGS` value (via `pushfd`/`pop`).
///
/// Bit 9 (`IF`) indicates whether interrupts are enabled.
#[cfg(target_arch = "x86")]
#[inline]
#[must_use]
pub fn eflags() -> u32 {
    let r: u32;
    unsafe { core::arch::asm!("pushfd; pop {}", out(reg) r, options(nostack, preserves_flags)) }
    r
}

/// RAII guard that disables interrupts on creation and restores them on
/// drop.
///
/// `IrqGuard::new()` snapshots the `IF` bit (bit 9 of `EFLAGS`). If
/// interrupts were enabled, it executes `cli`. On drop, it executes `sti`
/// **only** if they were previously enabled, so nested guards preserve the
/// outer state.
///
/// # Examples
///
/// ```no_run
/// use kernel_sync::IrqGuard;
///
/// {
///     let _g = IrqGuard::new();
///     // critical section guarded from interrupt handlers
/// }
/// // IF restored to its prior state here
/// ```
pub struct IrqGuard {
    /// Whether interrupts were enabled (IF=1) when the guard was created.
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    /// Disables interrupts if they are currently enabled and remembers the
    /// state.
    #[cfg(target_arch = "x86")]
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let enabled = (eflags() & (1 << 9)) != 0;
        if enabled {
            cli_stop_interrupts();
        }
        Self {
            were_enabled: enabled,
        }
    }

    /// Hosted stand-in: nothing to mask.
    #[cfg(not(target_arch = "x86"))]
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            were_enabled: false,
        }
    }
}

impl Drop for IrqGuard {
    /// Restores interrupts (`sti`) only if they were previously enabled.
    fn drop(&mut self) {
        #[cfg(target_arch = "x86")]
        if self.were_enabled {
            sti_enable_interrupts();
        }
        #[cfg(not(target_arch = "x86"))]
        let _ = self.were_enabled;
    }
}
