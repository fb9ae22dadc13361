//! Scancode set 1 translation tables for a US layout.
//!
//! Indexed by press scancode; a zero entry means the key produces no
//! character (function keys, cursor block, modifiers).

/// Pad a partial table out to the full scancode range.
const fn keymap(entries: &[u8]) -> [u8; 128] {
    let mut map = [0u8; 128];
    let mut i = 0;
    while i < entries.len() {
        map[i] = entries[i];
        i += 1;
    }
    map
}

/// Characters without any modifier held.
pub(crate) const BASE: [u8; 128] = keymap(&[
    0, 0x1B, b'1', b'2', b'3', b'4', b'5', b'6', //
    b'7', b'8', b'9', b'0', b'-', b'=', 0x08, //
    b'\t', //
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', //
    0, //
    b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, //
    b'\\', b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0, //
    b'*', 0, b' ',
]);

/// Characters with a shift key held.
pub(crate) const SHIFTED: [u8; 128] = keymap(&[
    0, 0x1B, b'!', b'@', b'#', b'$', b'%', b'^', //
    b'&', b'*', b'(', b')', b'_', b'+', 0x08, //
    b'\t', //
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', //
    0, //
    b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, //
    b'|', b'Z', b'X', b'C', b'V', b'B', b'N', b'M', b'<', b'>', b'?', 0, //
    b'*', 0, b' ',
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_agree_on_non_printing_slots() {
        for sc in 0..128 {
            assert_eq!(
                BASE[sc] == 0,
                SHIFTED[sc] == 0,
                "map disagreement at scancode {sc:#04x}"
            );
        }
    }

    #[test]
    fn tail_past_space_is_empty() {
        for sc in 0x3A..128 {
            assert_eq!(BASE[sc], 0);
        }
    }
}
