//! # PS/2 Keyboard Scancode Decoding
//!
//! Turns the raw scancode stream of a PS/2 keyboard (scancode set 1) into
//! ASCII characters for a US layout.
//!
//! The decoder is a small state machine tracking three modifiers: shift,
//! ctrl and caps lock. It is deliberately free of any hardware access: the
//! interrupt handler reads the scancode byte from the controller and feeds
//! it in, which keeps the whole translation testable on the host.
//!
//! ## Decode chain
//!
//! For a press of a character key the steps are, in order:
//!
//! 1. pick the base or shifted table depending on shift,
//! 2. if caps lock is on, **invert** the case of letters (so caps+shift
//!    yields lowercase again),
//! 3. if ctrl is held, fold letters of either case into control codes
//!    (ctrl+A = 0x01 … ctrl+Z = 0x1A).
//!
//! Releases (bit 7 set) only update modifier state and never produce a
//! character.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod keymap;

/// Bit 7 of a scancode: set on key release.
pub const RELEASE_BIT: u8 = 0x80;

/// Left shift press scancode.
pub const SC_LEFT_SHIFT: u8 = 0x2A;
/// Right shift press scancode.
pub const SC_RIGHT_SHIFT: u8 = 0x36;
/// Left control press scancode.
pub const SC_CTRL: u8 = 0x1D;
/// Caps lock press scancode.
pub const SC_CAPS_LOCK: u8 = 0x3A;

/// Modifier-tracking scancode decoder.
///
/// One instance per keyboard; fed strictly in arrival order.
#[derive(Debug, Default)]
pub struct ScancodeDecoder {
    shift: bool,
    ctrl: bool,
    caps_lock: bool,
}

impl ScancodeDecoder {
    /// Fresh decoder: no modifiers held, caps lock off.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            shift: false,
            ctrl: false,
            caps_lock: false,
        }
    }

    /// Whether a shift key is currently held.
    #[must_use]
    pub const fn shift_held(&self) -> bool {
        self.shift
    }

    /// Whether the control key is currently held.
    #[must_use]
    pub const fn ctrl_held(&self) -> bool {
        self.ctrl
    }

    /// Whether caps lock is latched on.
    #[must_use]
    pub const fn caps_lock_on(&self) -> bool {
        self.caps_lock
    }

    /// Feed one scancode; returns the ASCII character it completes, if any.
    ///
    /// Modifier keys, releases and keys without a translation yield `None`.
    pub fn decode(&mut self, scancode: u8) -> Option<u8> {
        if scancode & RELEASE_BIT != 0 {
            match scancode & !RELEASE_BIT {
                SC_LEFT_SHIFT | SC_RIGHT_SHIFT => self.shift = false,
                SC_CTRL => self.ctrl = false,
                _ => {}
            }
            return None;
        }

        match scancode {
            SC_LEFT_SHIFT | SC_RIGHT_SHIFT => {
                self.shift = true;
                return None;
            }
            SC_CTRL => {
                self.ctrl = true;
                return None;
            }
            SC_CAPS_LOCK => {
                self.caps_lock = !self.caps_lock;
                return None;
            }
            _ => {}
        }

        let map = if self.shift {
            &keymap::SHIFTED
        } else {
            &keymap::BASE
        };
        let mut c = map[scancode as usize];

        if self.caps_lock {
            if c.is_ascii_lowercase() {
                c = c - b'a' + b'A';
            } else if c.is_ascii_uppercase() {
                c = c - b'A' + b'a';
            }
        }

        if self.ctrl {
            if c.is_ascii_lowercase() {
                c = c - b'a' + 1;
            } else if c.is_ascii_uppercase() {
                c = c - b'A' + 1;
            }
        }

        if c == 0 { None } else { Some(c) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SC_A: u8 = 0x1E;
    const SC_C: u8 = 0x2E;
    const SC_1: u8 = 0x02;
    const SC_ENTER: u8 = 0x1C;
    const SC_ESC: u8 = 0x01;
    const SC_F1: u8 = 0x3B;

    fn decode_all(decoder: &mut ScancodeDecoder, scancodes: &[u8]) -> Vec<u8> {
        scancodes
            .iter()
            .filter_map(|&sc| decoder.decode(sc))
            .collect()
    }

    #[test]
    fn plain_letters_and_specials() {
        let mut d = ScancodeDecoder::new();
        assert_eq!(d.decode(SC_A), Some(b'a'));
        assert_eq!(d.decode(SC_ENTER), Some(b'\n'));
        assert_eq!(d.decode(SC_ESC), Some(0x1B));
        assert_eq!(d.decode(0x0E), Some(0x08)); // backspace
    }

    #[test]
    fn releases_and_unknown_keys_are_silent() {
        let mut d = ScancodeDecoder::new();
        assert_eq!(d.decode(SC_A | RELEASE_BIT), None);
        assert_eq!(d.decode(SC_F1), None);
        assert_eq!(d.decode(0x7F), None);
    }

    #[test]
    fn shift_applies_only_while_held() {
        let mut d = ScancodeDecoder::new();
        let typed = decode_all(
            &mut d,
            &[
                SC_LEFT_SHIFT,
                SC_A,
                SC_1,
                SC_LEFT_SHIFT | RELEASE_BIT,
                SC_A,
                SC_1,
            ],
        );
        assert_eq!(typed, b"A!a1");
    }

    #[test]
    fn right_shift_works_too() {
        let mut d = ScancodeDecoder::new();
        d.decode(SC_RIGHT_SHIFT);
        assert_eq!(d.decode(SC_A), Some(b'A'));
        d.decode(SC_RIGHT_SHIFT | RELEASE_BIT);
        assert_eq!(d.decode(SC_A), Some(b'a'));
    }

    #[test]
    fn caps_lock_latches_and_toggles() {
        let mut d = ScancodeDecoder::new();
        d.decode(SC_CAPS_LOCK);
        assert_eq!(d.decode(SC_A), Some(b'A'));
        // Release of caps lock does not toggle back.
        d.decode(SC_CAPS_LOCK | RELEASE_BIT);
        assert_eq!(d.decode(SC_A), Some(b'A'));
        // A second press does.
        d.decode(SC_CAPS_LOCK);
        assert_eq!(d.decode(SC_A), Some(b'a'));
    }

    #[test]
    fn caps_lock_inverts_shifted_letters() {
        let mut d = ScancodeDecoder::new();
        d.decode(SC_CAPS_LOCK);
        d.decode(SC_LEFT_SHIFT);
        assert_eq!(d.decode(SC_A), Some(b'a'));
        // Non-letters keep their shifted form.
        assert_eq!(d.decode(SC_1), Some(b'!'));
    }

    #[test]
    fn caps_lock_leaves_digits_alone() {
        let mut d = ScancodeDecoder::new();
        d.decode(SC_CAPS_LOCK);
        assert_eq!(d.decode(SC_1), Some(b'1'));
    }

    #[test]
    fn ctrl_folds_letters_to_control_codes() {
        let mut d = ScancodeDecoder::new();
        d.decode(SC_CTRL);
        assert_eq!(d.decode(SC_C), Some(0x03));
        d.decode(SC_CTRL | RELEASE_BIT);
        assert_eq!(d.decode(SC_C), Some(b'c'));
    }

    #[test]
    fn ctrl_ignores_case_of_the_letter() {
        // ctrl+shift+c and ctrl+caps+c both land on 0x03.
        let mut d = ScancodeDecoder::new();
        d.decode(SC_CTRL);
        d.decode(SC_LEFT_SHIFT);
        assert_eq!(d.decode(SC_C), Some(0x03));

        let mut d = ScancodeDecoder::new();
        d.decode(SC_CAPS_LOCK);
        d.decode(SC_CTRL);
        assert_eq!(d.decode(SC_C), Some(0x03));
    }

    #[test]
    fn modifier_presses_produce_nothing() {
        let mut d = ScancodeDecoder::new();
        assert_eq!(d.decode(SC_LEFT_SHIFT), None);
        assert_eq!(d.decode(SC_RIGHT_SHIFT), None);
        assert_eq!(d.decode(SC_CTRL), None);
        assert_eq!(d.decode(SC_CAPS_LOCK), None);
    }
}
