//! Protected-mode kernel entry point.
//!
//! Boot contract: GRUB loads the image via Multiboot2 and enters `_start`
//! in 32-bit protected mode with paging off and interrupts disabled.
//! `_start` installs the boot stack and calls `kernel_main`, which brings
//! the machine up in dependency order, then parks in the shell loop.

#![cfg_attr(target_arch = "x86", no_std, no_main)]
#![allow(unsafe_code)]

#[cfg(target_arch = "x86")]
mod boot {
    use log::LevelFilter;

    use kernel::idt::{Idt, KERNEL_CS};
    use kernel::interrupts::{IRQ_KEYBOARD, IRQ_TIMER, VECTOR_KEYBOARD, VECTOR_TIMER};
    use kernel::interrupts::{keyboard, pic, timer};
    use kernel::{console, kprintln, memory, shell};

    const MULTIBOOT2_MAGIC: u32 = 0xE852_50D6;

    /// Multiboot2 header: magic, architecture (i386), header length,
    /// checksum, end tag. Must live in the first 32 KiB of the image.
    #[unsafe(link_section = ".multiboot")]
    #[unsafe(no_mangle)]
    #[used]
    pub static MULTIBOOT2_HEADER: [u32; 6] = [
        MULTIBOOT2_MAGIC,
        0,
        16,
        0_u32.wrapping_sub(MULTIBOOT2_MAGIC.wrapping_add(16)),
        0,
        12,
    ];

    const BOOT_STACK_SIZE: usize = 64 * 1024;

    #[repr(C, align(16))]
    struct BootStack([u8; BOOT_STACK_SIZE]);

    static mut BOOT_STACK: BootStack = BootStack([0; BOOT_STACK_SIZE]);

    /// Vectors are installed here at boot; the table must never move.
    static mut IDT: Idt = Idt::new();

    /// Raw entry point named by the linker script.
    #[unsafe(no_mangle)]
    #[unsafe(naked)]
    pub extern "C" fn _start() -> ! {
        core::arch::naked_asm!(
            "cli",
            "lea esp, [{stack} + {size}]",
            "xor ebp, ebp",
            "call {main}",
            // kernel_main never returns; catch it anyway.
            "2:",
            "hlt",
            "jmp 2b",
            stack = sym BOOT_STACK,
            size = const BOOT_STACK_SIZE,
            main = sym kernel_main,
        )
    }

    extern "C" fn kernel_main() -> ! {
        let _ = kernel_qemu::QemuLogger::new(LevelFilter::Trace).init();
        log::info!("kernel_main entered");

        console::with_console(console::Console::clear);
        kprintln!("pm-kernel booting...");

        // SAFETY: single-threaded boot path; the managed region is free RAM.
        unsafe { memory::init_frame_pool() };

        // SAFETY: frame pool is seeded and we run on the boot stack.
        if let Err(err) = unsafe { memory::init_paging() } {
            log::error!("paging bring-up failed: {err}");
            kprintln!("FATAL: paging bring-up failed");
            halt_forever();
        }

        // SAFETY: interrupts are still disabled; the IDT is not yet armed.
        unsafe { pic::remap() };

        // SAFETY: boot path is the only writer and the table is static.
        let idt = unsafe { &mut *(&raw mut IDT) };
        idt.entry_mut(VECTOR_TIMER)
            .set_handler(timer::timer_isr)
            .selector(KERNEL_CS)
            .gate_interrupt()
            .present(true);
        idt.entry_mut(VECTOR_KEYBOARD)
            .set_handler(keyboard::keyboard_isr)
            .selector(KERNEL_CS)
            .gate_interrupt()
            .present(true);

        // SAFETY: both present slots point at ISR stubs ending in iretd.
        unsafe { (*(&raw const IDT)).load() };

        timer::init(100);

        // SAFETY: handlers are armed, so opening the lines is sound.
        unsafe {
            pic::clear_mask(IRQ_TIMER);
            pic::clear_mask(IRQ_KEYBOARD);
        }

        kernel_sync::irq::sti_enable_interrupts();
        log::info!("interrupts enabled, entering shell");

        shell::run()
    }

    fn halt_forever() -> ! {
        loop {
            // SAFETY: hlt with interrupts in any state just idles the CPU.
            unsafe {
                core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
            }
        }
    }

    #[panic_handler]
    fn panic(info: &core::panic::PanicInfo) -> ! {
        log::error!("kernel panic: {info}");
        kernel_qemu::qemu_trace!("kernel panic: {}", info);
        halt_forever()
    }
}

#[cfg(not(target_arch = "x86"))]
fn main() {}
