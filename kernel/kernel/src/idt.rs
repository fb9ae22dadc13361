//! Interrupt Descriptor Table for 32-bit protected mode.
//!
//! Each of the 256 vectors is an 8-byte gate descriptor:
//!
//! ```text
//! Bits  0..16   handler offset, low half
//! Bits 16..32   code segment selector
//! Bits 32..40   reserved, must be zero
//! Bits 40..48   attributes (type, S, DPL, P)
//! Bits 48..64   handler offset, high half
//! ```
//!
//! The table is built entry by entry with [`Idt::entry_mut`] and handed to
//! the CPU once with [`Idt::load`].

use bitfield_struct::bitfield;

/// Code segment selector installed by the boot loader (flat 4 GiB, ring 0).
pub const KERNEL_CS: u16 = 0x08;

/// 32-bit interrupt gate (interrupts disabled on entry).
pub const GATE_INTERRUPT: u8 = 0xE;

/// 32-bit trap gate (interrupts left as-is on entry).
pub const GATE_TRAP: u8 = 0xF;

/// Attribute byte of a gate descriptor.
#[bitfield(u8)]
pub struct IdtGateAttr {
    /// Gate type, [`GATE_INTERRUPT`] or [`GATE_TRAP`].
    #[bits(4)]
    pub typ: u8,

    /// Descriptor class; always `false` (system descriptor) for gates.
    pub s: bool,

    /// Privilege level allowed to invoke the gate via `int`.
    #[bits(2)]
    pub dpl: u8,

    /// Present flag; a cleared bit faults with a segment-not-present.
    pub present: bool,
}

/// One IDT slot.
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(C)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    zero: u8,
    attr: u8,
    offset_hi: u16,
}

const _: () = assert!(core::mem::size_of::<IdtEntry>() == 8);

impl IdtEntry {
    /// A non-present slot. Vectors left at this value fault when raised.
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        zero: 0,
        attr: 0,
        offset_hi: 0,
    };

    /// Point this slot at the handler at linear address `addr`.
    ///
    /// Returns a builder; the slot is not usable until `selector`,
    /// `present` and a gate type have been applied.
    pub fn set_handler_addr(&mut self, addr: u32) -> IdtEntryBuilder<'_> {
        self.offset_lo = (addr & 0xFFFF) as u16;
        self.offset_hi = (addr >> 16) as u16;
        self.zero = 0;
        IdtEntryBuilder { entry: self }
    }

    /// Point this slot at `handler`.
    #[cfg(target_arch = "x86")]
    pub fn set_handler(&mut self, handler: extern "C" fn()) -> IdtEntryBuilder<'_> {
        self.set_handler_addr(handler as usize as u32)
    }

    /// The handler address split across the two offset halves.
    #[must_use]
    pub const fn handler_addr(&self) -> u32 {
        ((self.offset_hi as u32) << 16) | self.offset_lo as u32
    }

    /// The attribute byte, decoded.
    #[must_use]
    pub const fn attributes(&self) -> IdtGateAttr {
        IdtGateAttr::from_bits(self.attr)
    }

    /// The code segment selector the CPU loads on dispatch.
    #[must_use]
    pub const fn selector(&self) -> u16 {
        self.selector
    }
}

impl core::fmt::Debug for IdtEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdtEntry")
            .field("handler", &format_args!("{:#010X}", self.handler_addr()))
            .field("selector", &format_args!("{:#06X}", self.selector))
            .field("attr", &self.attributes())
            .finish()
    }
}

/// Fluent configuration of a freshly pointed [`IdtEntry`].
pub struct IdtEntryBuilder<'a> {
    entry: &'a mut IdtEntry,
}

impl IdtEntryBuilder<'_> {
    /// Select the code segment for the handler.
    pub fn selector(self, selector: u16) -> Self {
        self.entry.selector = selector;
        self
    }

    /// Set or clear the present bit.
    pub fn present(self, present: bool) -> Self {
        let attr = IdtGateAttr::from_bits(self.entry.attr).with_present(present);
        self.entry.attr = attr.into_bits();
        self
    }

    /// Mark the slot as an interrupt gate (IF cleared on entry).
    pub fn gate_interrupt(self) -> Self {
        self.gate(GATE_INTERRUPT)
    }

    /// Mark the slot as a trap gate (IF untouched on entry).
    pub fn gate_trap(self) -> Self {
        self.gate(GATE_TRAP)
    }

    /// Allow `dpl` and below to raise this vector with `int`.
    pub fn dpl(self, dpl: u8) -> Self {
        let attr = IdtGateAttr::from_bits(self.entry.attr).with_dpl(dpl);
        self.entry.attr = attr.into_bits();
        self
    }

    fn gate(self, typ: u8) -> Self {
        let attr = IdtGateAttr::from_bits(self.entry.attr)
            .with_typ(typ)
            .with_s(false);
        self.entry.attr = attr.into_bits();
        self
    }
}

/// The full 256-entry table.
#[repr(C, align(8))]
pub struct Idt {
    entries: [IdtEntry; 256],
}

const _: () = assert!(core::mem::size_of::<Idt>() == 2048);

/// Operand for `lidt`.
#[repr(C, packed)]
struct Idtr {
    limit: u16,
    base: u32,
}

impl Idt {
    /// A table of 256 [`IdtEntry::MISSING`] slots.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; 256],
        }
    }

    /// Borrow the slot for `vector`.
    pub fn entry_mut(&mut self, vector: u8) -> &mut IdtEntry {
        &mut self.entries[vector as usize]
    }

    /// Read back the slot for `vector`.
    #[must_use]
    pub fn entry(&self, vector: u8) -> IdtEntry {
        self.entries[vector as usize]
    }

    /// Hand the table to the CPU with `lidt`.
    ///
    /// # Safety
    /// Every present slot must point at a real handler that ends in `iretd`,
    /// and the table must stay at this address for the rest of the run
    /// (hence `&'static`).
    #[cfg(target_arch = "x86")]
    pub unsafe fn load(&'static self) {
        let idtr = Idtr {
            limit: (core::mem::size_of::<Self>() - 1) as u16,
            base: core::ptr::from_ref(self) as usize as u32,
        };
        // SAFETY: the descriptor is well-formed; validity of the slots is
        // the caller's contract.
        unsafe {
            core::arch::asm!("lidt [{0}]", in(reg) &idtr, options(readonly, nostack, preserves_flags));
        }
    }
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}
