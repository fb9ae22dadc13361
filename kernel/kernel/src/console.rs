//! 80×25 VGA text-mode console.
//!
//! Writes character/attribute cell pairs straight into the buffer at
//! `0xB8000` (identity-mapped at boot). One cursor, light grey on black,
//! scroll-on-overflow. The global console lives behind a [`SpinLock`];
//! interrupt handlers never print, so the lock is uncontended in practice.

use core::fmt;

#[cfg(target_arch = "x86")]
use kernel_sync::SpinLock;

/// Visible columns.
pub const WIDTH: usize = 80;

/// Visible rows.
pub const HEIGHT: usize = 25;

/// Light grey on black.
pub const DEFAULT_ATTR: u8 = 0x07;

#[cfg(target_arch = "x86")]
const VGA_BASE: usize = 0xB8000;

/// One VGA cell: glyph plus attribute byte.
#[derive(Copy, Clone, Eq, PartialEq)]
#[repr(C)]
pub struct VgaCell {
    pub ascii: u8,
    pub attr: u8,
}

const BLANK: VgaCell = VgaCell {
    ascii: b' ',
    attr: DEFAULT_ATTR,
};

/// Cursor state over a cell buffer.
pub struct Console {
    base: *mut VgaCell,
    row: usize,
    col: usize,
}

// The buffer pointer is either the fixed VGA region or a test-owned
// array; exclusive access comes from the surrounding lock.
unsafe impl Send for Console {}

impl Console {
    /// Drive the `WIDTH * HEIGHT` cell buffer starting at `base`.
    ///
    /// # Safety
    /// `base` must point at `WIDTH * HEIGHT` writable cells that outlive
    /// the console.
    #[must_use]
    pub const unsafe fn with_base(base: *mut VgaCell) -> Self {
        Self {
            base,
            row: 0,
            col: 0,
        }
    }

    /// Blank the screen and home the cursor.
    pub fn clear(&mut self) {
        for i in 0..WIDTH * HEIGHT {
            // SAFETY: i < WIDTH * HEIGHT, in bounds per `with_base`.
            unsafe { self.base.add(i).write_volatile(BLANK) };
        }
        self.row = 0;
        self.col = 0;
    }

    /// Write one byte, interpreting `\n` and backspace.
    pub fn put_char(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.col = 0;
                self.row += 1;
            }
            0x08 => self.backspace(),
            _ => {
                self.set_cell(self.row, self.col, byte);
                self.col += 1;
                if self.col == WIDTH {
                    self.col = 0;
                    self.row += 1;
                }
            }
        }
        if self.row == HEIGHT {
            self.scroll();
        }
    }

    /// Write every byte of `s`; non-ASCII code points degrade to `?`.
    pub fn put_str(&mut self, s: &str) {
        for ch in s.chars() {
            let byte = if ch.is_ascii() { ch as u8 } else { b'?' };
            self.put_char(byte);
        }
    }

    /// Current cursor position as `(row, col)`.
    #[must_use]
    pub const fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = WIDTH - 1;
        } else {
            return;
        }
        self.set_cell(self.row, self.col, b' ');
    }

    fn scroll(&mut self) {
        for row in 1..HEIGHT {
            for col in 0..WIDTH {
                let cell = self.cell(row, col);
                self.write_cell(row - 1, col, cell);
            }
        }
        for col in 0..WIDTH {
            self.write_cell(HEIGHT - 1, col, BLANK);
        }
        self.row = HEIGHT - 1;
    }

    fn set_cell(&mut self, row: usize, col: usize, ascii: u8) {
        self.write_cell(
            row,
            col,
            VgaCell {
                ascii,
                attr: DEFAULT_ATTR,
            },
        );
    }

    fn write_cell(&mut self, row: usize, col: usize, cell: VgaCell) {
        debug_assert!(row < HEIGHT && col < WIDTH);
        // SAFETY: row/col are in bounds, buffer validity per `with_base`.
        unsafe { self.base.add(row * WIDTH + col).write_volatile(cell) };
    }

    fn cell(&self, row: usize, col: usize) -> VgaCell {
        debug_assert!(row < HEIGHT && col < WIDTH);
        // SAFETY: as above.
        unsafe { self.base.add(row * WIDTH + col).read_volatile() }
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put_str(s);
        Ok(())
    }
}

/// The screen the shell talks to.
#[cfg(target_arch = "x86")]
pub static CONSOLE: SpinLock<Console> =
    // SAFETY: the VGA text buffer is exactly WIDTH * HEIGHT cells and is
    // identity-mapped before the console is first used.
    SpinLock::new(unsafe { Console::with_base(VGA_BASE as *mut VgaCell) });

/// Run `f` with the global console locked.
#[cfg(target_arch = "x86")]
pub fn with_console<R>(f: impl FnOnce(&mut Console) -> R) -> R {
    f(&mut *CONSOLE.lock())
}

/// Print to the VGA console.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        use ::core::fmt::Write as _;
        $crate::console::with_console(|console| {
            let _ = ::core::write!(console, $($arg)*);
        });
    }};
}

/// Print to the VGA console, with a trailing newline.
#[macro_export]
macro_rules! kprintln {
    () => { $crate::kprint!("\n") };
    ($($arg:tt)*) => {{
        use ::core::fmt::Write as _;
        $crate::console::with_console(|console| {
            let _ = ::core::writeln!(console, $($arg)*);
        });
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;

    struct Screen {
        cells: Vec<VgaCell>,
    }

    impl Screen {
        fn new() -> Self {
            Self {
                cells: vec![BLANK; WIDTH * HEIGHT],
            }
        }

        fn console(&mut self) -> Console {
            unsafe { Console::with_base(self.cells.as_mut_ptr()) }
        }

        fn row_text(&self, row: usize) -> String {
            self.cells[row * WIDTH..(row + 1) * WIDTH]
                .iter()
                .map(|c| c.ascii as char)
                .collect()
        }
    }

    #[test]
    fn plain_text_lands_at_the_cursor() {
        let mut screen = Screen::new();
        let mut console = screen.console();
        console.put_str("hello");
        assert_eq!(console.cursor(), (0, 5));
        drop(console);
        assert!(screen.row_text(0).starts_with("hello "));
    }

    #[test]
    fn newline_moves_to_the_next_row() {
        let mut screen = Screen::new();
        let mut console = screen.console();
        console.put_str("a\nb");
        assert_eq!(console.cursor(), (1, 1));
        drop(console);
        assert!(screen.row_text(0).starts_with('a'));
        assert!(screen.row_text(1).starts_with('b'));
    }

    #[test]
    fn line_wrap_at_column_eighty() {
        let mut screen = Screen::new();
        let mut console = screen.console();
        for _ in 0..WIDTH {
            console.put_char(b'x');
        }
        console.put_char(b'y');
        assert_eq!(console.cursor(), (1, 1));
    }

    #[test]
    fn backspace_erases_and_crosses_rows() {
        let mut screen = Screen::new();
        let mut console = screen.console();
        console.put_str("ab");
        console.put_char(0x08);
        assert_eq!(console.cursor(), (0, 1));

        // Across a line boundary: cursor climbs back to column 79.
        console.put_char(0x08);
        console.put_char(b'\n');
        console.put_char(0x08);
        assert_eq!(console.cursor(), (0, WIDTH - 1));

        // At the origin it is a no-op.
        let mut fresh_screen = Screen::new();
        let mut fresh = fresh_screen.console();
        fresh.put_char(0x08);
        assert_eq!(fresh.cursor(), (0, 0));
    }

    #[test]
    fn overflow_scrolls_one_row() {
        let mut screen = Screen::new();
        let mut console = screen.console();
        for i in 0..HEIGHT {
            let _ = writeln!(console, "line {i}");
        }
        // 25 newlines push row 0 off the top.
        assert_eq!(console.cursor(), (HEIGHT - 1, 0));
        drop(console);
        assert!(screen.row_text(0).starts_with("line 1"));
        assert!(screen.row_text(HEIGHT - 2).starts_with("line 24"));
        assert_eq!(screen.row_text(HEIGHT - 1).trim_end(), "");
    }

    #[test]
    fn clear_blanks_everything() {
        let mut screen = Screen::new();
        let mut console = screen.console();
        console.put_str("residue");
        console.clear();
        assert_eq!(console.cursor(), (0, 0));
        drop(console);
        for row in 0..HEIGHT {
            assert_eq!(screen.row_text(row).trim_end(), "");
        }
    }

    #[test]
    fn non_ascii_degrades_to_question_mark() {
        let mut screen = Screen::new();
        let mut console = screen.console();
        console.put_str("café");
        drop(console);
        assert!(screen.row_text(0).starts_with("caf?"));
    }
}
