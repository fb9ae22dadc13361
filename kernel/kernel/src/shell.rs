//! Interactive command console.
//!
//! Reads lines from the keyboard with echo and backspace editing, splits
//! them on whitespace and dispatches over a static command table. Every
//! command recovers locally; the loop never exits.

#[cfg(target_arch = "x86")]
use kernel_addresses::VirtualAddress;
#[cfg(target_arch = "x86")]
use kernel_vmem::{PdEntryKind, PdIndex, PtIndex};

#[cfg(target_arch = "x86")]
use crate::interrupts::{keyboard, timer};
#[cfg(target_arch = "x86")]
use crate::{console, kprint, kprintln, memory};

/// Longest accepted input line, terminator included.
pub const MAX_INPUT: usize = 128;

/// Tokens considered per line; extras are ignored.
pub const MAX_ARGS: usize = 8;

/// Parse a hexadecimal argument, with or without a `0x` prefix.
///
/// The whole token must be valid; trailing junk or overflow yields `None`.
#[must_use]
pub fn parse_hex(token: &str) -> Option<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Split `line` on spaces and tabs into `argv`, returning the token count.
pub fn tokenize<'a>(line: &'a str, argv: &mut [&'a str; MAX_ARGS]) -> usize {
    let mut argc = 0;
    for token in line.split([' ', '\t']) {
        if token.is_empty() {
            continue;
        }
        if argc == MAX_ARGS {
            break;
        }
        argv[argc] = token;
        argc += 1;
    }
    argc
}

#[cfg(target_arch = "x86")]
struct Command {
    name: &'static str,
    help: &'static str,
    run: fn(&[&str]),
}

#[cfg(target_arch = "x86")]
static COMMANDS: [Command; 9] = [
    Command {
        name: "help",
        help: "list available commands",
        run: cmd_help,
    },
    Command {
        name: "cls",
        help: "clear the screen",
        run: cmd_cls,
    },
    Command {
        name: "echo",
        help: "print the arguments",
        run: cmd_echo,
    },
    Command {
        name: "meminfo",
        help: "frame allocator statistics",
        run: cmd_meminfo,
    },
    Command {
        name: "frames",
        help: "list free frame addresses",
        run: cmd_frames,
    },
    Command {
        name: "v2p",
        help: "v2p <hex> - translate a virtual address",
        run: cmd_v2p,
    },
    Command {
        name: "ptdump",
        help: "dump present page-directory entries",
        run: cmd_ptdump,
    },
    Command {
        name: "read32",
        help: "read32 <hex> - read a mapped 32-bit word",
        run: cmd_read32,
    },
    Command {
        name: "uptime",
        help: "ticks and milliseconds since boot",
        run: cmd_uptime,
    },
];

/// Prompt, read, dispatch. Never returns.
#[cfg(target_arch = "x86")]
pub fn run() -> ! {
    kprintln!("Type 'help' for a list of commands.");
    let mut line = [0_u8; MAX_INPUT];
    loop {
        kprint!("> ");
        let len = read_line(&mut line);
        if let Ok(text) = core::str::from_utf8(&line[..len]) {
            dispatch(text);
        }
    }
}

#[cfg(target_arch = "x86")]
fn dispatch(line: &str) {
    let mut argv = [""; MAX_ARGS];
    let argc = tokenize(line, &mut argv);
    if argc == 0 {
        return;
    }
    match COMMANDS.iter().find(|cmd| cmd.name == argv[0]) {
        Some(cmd) => (cmd.run)(&argv[1..argc]),
        None => kprintln!("Unknown command. Type 'help'."),
    }
}

/// Line editor: echoes input, handles backspace, caps at [`MAX_INPUT`].
#[cfg(target_arch = "x86")]
fn read_line(buf: &mut [u8; MAX_INPUT]) -> usize {
    let mut len = 0;
    loop {
        let byte = keyboard::read_blocking();
        match byte {
            b'\n' => {
                console::with_console(|c| c.put_char(b'\n'));
                return len;
            }
            0x08 => {
                if len > 0 {
                    len -= 1;
                    console::with_console(|c| c.put_char(0x08));
                }
            }
            b'\t' | 0x20..=0x7E => {
                if len < MAX_INPUT - 1 {
                    buf[len] = byte;
                    len += 1;
                    console::with_console(|c| c.put_char(byte));
                }
            }
            _ => {}
        }
    }
}

#[cfg(target_arch = "x86")]
fn cmd_help(_args: &[&str]) {
    for cmd in &COMMANDS {
        kprintln!("{:<8} {}", cmd.name, cmd.help);
    }
}

#[cfg(target_arch = "x86")]
fn cmd_cls(_args: &[&str]) {
    console::with_console(console::Console::clear);
}

#[cfg(target_arch = "x86")]
fn cmd_echo(args: &[&str]) {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            kprint!(" ");
        }
        kprint!("{arg}");
    }
    kprintln!();
}

#[cfg(target_arch = "x86")]
fn cmd_meminfo(_args: &[&str]) {
    let _irq = kernel_sync::IrqGuard::new();
    let pool = memory::FRAME_POOL.lock();
    kprintln!(
        "frames: {} free / {} total ({} KiB free)",
        pool.free_frames(),
        pool.total_frames(),
        pool.free_frames() * 4
    );
}

#[cfg(target_arch = "x86")]
fn cmd_frames(_args: &[&str]) {
    const SHOW: usize = 16;
    // The free-list walk must not race an interrupt-context allocation.
    let _irq = kernel_sync::IrqGuard::new();
    let pool = memory::FRAME_POOL.lock();
    for (i, addr) in pool.free_addresses().enumerate() {
        if i == SHOW {
            kprintln!("  ... {} more", pool.free_frames() - SHOW);
            break;
        }
        kprintln!("  {addr:#010X}");
    }
}

#[cfg(target_arch = "x86")]
fn cmd_v2p(args: &[&str]) {
    let Some(va) = args.first().copied().and_then(parse_hex) else {
        kprintln!("usage: v2p <hex-address>");
        return;
    };
    match memory::translate(VirtualAddress::new(va)) {
        Some(pa) => kprintln!("{:#010X} -> {:#010X}", va, pa.as_u32()),
        None => kprintln!("Not mapped or not present"),
    }
}

#[cfg(target_arch = "x86")]
fn cmd_ptdump(_args: &[&str]) {
    let Some(space) = memory::active_space() else {
        kprintln!("paging is not enabled");
        return;
    };
    for i in 0..1024 {
        let entry = space.pd_entry(PdIndex::new(i));
        let Some(kind) = entry.kind() else { continue };
        match kind {
            PdEntryKind::Leaf4MiB(page, _) => {
                kprintln!(
                    "PDE[{i:4}] {:#010X} 4M {:#010X}",
                    entry.raw(),
                    page.base().as_u32()
                );
            }
            PdEntryKind::NextPageTable(table, _) => {
                kprintln!(
                    "PDE[{i:4}] {:#010X} PT {:#010X}",
                    entry.raw(),
                    table.base().as_u32()
                );
                // Sample the first present leaf under this table.
                for j in 0..1024 {
                    let pte = space.pt_entry(table, PtIndex::new(j));
                    if pte.is_present() {
                        kprintln!(
                            "  PTE[{j:4}] {:#010X} -> {:#010X}",
                            pte.raw(),
                            pte.flags().physical_address().as_u32()
                        );
                        break;
                    }
                }
            }
        }
    }
}

/// Reads through the live mapping only; unmapped addresses are refused
/// instead of faulting.
#[cfg(target_arch = "x86")]
fn cmd_read32(args: &[&str]) {
    let Some(va) = args.first().copied().and_then(parse_hex) else {
        kprintln!("usage: read32 <hex-address>");
        return;
    };
    // Both ends of the word must be mapped; it may straddle a page.
    let first = memory::translate(VirtualAddress::new(va));
    let last = va
        .checked_add(3)
        .and_then(|end| memory::translate(VirtualAddress::new(end)));
    if first.is_none() || last.is_none() {
        kprintln!("read32: address is not mapped");
        return;
    }
    // SAFETY: the translation above proved the word resident.
    let value = unsafe { core::ptr::read_volatile(va as usize as *const u32) };
    kprintln!("{va:#010X}: {value:#010X}");
}

#[cfg(target_arch = "x86")]
fn cmd_uptime(_args: &[&str]) {
    kprintln!("uptime: {} ticks ({} ms)", timer::ticks(), timer::uptime_ms());
}
