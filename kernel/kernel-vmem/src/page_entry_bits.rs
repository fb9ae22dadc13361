use bitfield_struct::bitfield;
use kernel_addresses::PhysicalAddress;

/// A single 32-bit x86 paging entry in its raw bitfield form.
///
/// This models the **common superset** of the fields found in both paging
/// levels (PDE and PTE). Each bit corresponds to a hardware-defined flag or
/// address field as specified by the Intel manuals for 32-bit (non-PAE)
/// paging.
///
/// The type allows read/write access to individual bits without manual
/// masking or shifting, using the
/// [`bitfield_struct`](https://docs.rs/bitfield-struct/) derive.
///
/// ### Overview
/// An entry may either:
/// - point to a **page table** (PDE with PS clear), or
/// - directly map a **physical page (leaf)**: always for a PTE, or for a PDE
///   with the `large_page` (PS) bit set (a 4 MiB leaf).
///
/// ### Bit layout
///
/// | Bits  | Name / Mnemonic | Meaning |
/// |-------|-----------------|---------|
/// | 0     | `P` (present)   | Valid entry if set |
/// | 1     | `RW`            | Writable if set |
/// | 2     | `US`            | User-mode accessible if set |
/// | 3     | `PWT`           | Write-through caching |
/// | 4     | `PCD`           | Disable caching |
/// | 5     | `A`             | Accessed |
/// | 6     | `D`             | Dirty (leaf only) |
/// | 7     | `PS`            | 4 MiB page flag (PDE only) |
/// | 8     | `G`             | Global (leaf only, needs CR4.PGE) |
/// | 9–11  | OS avail        | Reserved for OS use |
/// | 12–31 | `addr`          | Physical frame bits [31:12] |
///
/// ### Notes
/// - Non-leaf entries ignore `D` and `G`.
/// - `PS` must be 0 in a PTE; the architectural bit position is repurposed
///   as PAT there, which this kernel leaves clear.
/// - The physical address field omits the lower 12 bits, which are
///   implicitly zero due to alignment. A 4 MiB leaf additionally requires
///   bits 21:12 to be zero (the base is 4 MiB aligned).
///
/// ### Example
/// ```rust
/// # use kernel_addresses::PhysicalAddress;
/// # use kernel_vmem::PageEntryBits;
/// let mut e = PageEntryBits::new();
/// e.set_present(true);
/// e.set_writable(true);
/// e.set_physical_address(PhysicalAddress::new(0x0010_2000));
/// assert!(e.present());
/// assert_eq!(e.physical_address().as_u32(), 0x0010_2000);
/// ```
#[bitfield(u32)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    ///
    /// Set if the entry points to a valid page table or a valid leaf
    /// mapping. Clear implies a not-present entry; any access faults.
    pub present: bool,

    /// Writable (RW, bit 1).
    ///
    /// Set to allow writes; clear for read-only. Subject to CR0.WP behavior
    /// in supervisor mode.
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    ///
    /// Set to allow user-mode access; clear restricts to supervisor only.
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    ///
    /// Set to use write-through caching; clear for write-back, when caching
    /// is enabled.
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    ///
    /// Set to disable caching for this mapping, typically for MMIO ranges.
    pub cache_disabled: bool,

    /// Accessed (A, bit 5).
    ///
    /// Set by the CPU on first access through this entry. Software may
    /// clear it to track usage. Not a permission bit.
    pub accessed: bool,

    /// Dirty (D, bit 6) — leaf only.
    ///
    /// Set by the CPU on first write to a leaf mapping. Ignored for
    /// entries that point at a page table.
    pub dirty: bool,

    /// Page Size (PS, bit 7).
    ///
    /// For a PDE: when **set**, the entry is a **leaf** mapping a 4 MiB
    /// page (requires CR4.PSE). When **clear**, it points to a page table.
    /// Must be clear in a PTE.
    pub large_page: bool,

    /// Global (G, bit 8) — leaf only.
    ///
    /// Keeps the TLB entry across CR3 reloads when CR4.PGE is set.
    pub global_translation: bool,

    /// Bits 9–11 are ignored by the MMU and free for OS bookkeeping.
    #[bits(3)]
    pub os_available: u8,

    /// Physical frame bits [31:12].
    #[bits(20)]
    frame: u32,
}

impl PageEntryBits {
    /// Physical base address stored in this entry.
    #[inline]
    #[must_use]
    pub const fn physical_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame() << 12)
    }

    /// Store a physical base address. The low 12 bits of `pa` are discarded.
    #[inline]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        self.set_frame(pa.as_u32() >> 12);
    }

    /// Builder-style variant of [`set_physical_address`](Self::set_physical_address).
    #[inline]
    #[must_use]
    pub const fn with_physical_address(self, pa: PhysicalAddress) -> Self {
        self.with_frame(pa.as_u32() >> 12)
    }
}
