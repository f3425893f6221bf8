//! PS/2 keyboard (scan-code set 1, US QWERTY) plus the COM1 RX loopback
//! that lets headless tests drive keyboard input without a real keyboard.
//!
//! `try_read_char` polls serial first — intentionally, not as an artifact:
//! it is what makes the serial-driven end-to-end scenarios of SPEC_FULL §8
//! possible at all (see DESIGN.md's Open Question notes).

use spin::Mutex;
use x86::io::{inb, outb};

use crate::drivers::serial;

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;
const STATUS_OUTPUT_FULL: u8 = 0x01;

pub const KEY_UP: u8 = 0x80;
pub const KEY_DOWN: u8 = 0x81;
pub const KEY_LEFT: u8 = 0x82;
pub const KEY_RIGHT: u8 = 0x83;

const LSHIFT_MAKE: u8 = 0x2A;
const RSHIFT_MAKE: u8 = 0x36;
const RELEASE_BIT: u8 = 0x80;
const EXTENDED_PREFIX: u8 = 0xE0;

#[rustfmt::skip]
static SCANCODE_MAP: [u8; 128] = [
    0,   27,  b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0,
    b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\',
    b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0,
    b'*', 0, b' ', 0,
    0,0,0,0,0,0,0,0,0,0, 0,0, 0,0,0, 0,
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,
];

#[rustfmt::skip]
static SCANCODE_MAP_SHIFT: [u8; 128] = [
    0,   27,  b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0,
    b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|',
    b'Z', b'X', b'C', b'V', b'B', b'N', b'M', b'<', b'>', b'?', 0,
    b'*', 0, b' ', 0,
    0,0,0,0,0,0,0,0,0,0, 0,0, 0,0,0, 0,
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,
];

struct KeyboardState {
    shift: bool,
    extended: bool,
}

static STATE: Mutex<KeyboardState> = Mutex::new(KeyboardState { shift: false, extended: false });

fn status_has_data() -> bool {
    // SAFETY: reads the architected PS/2 controller status port.
    unsafe { inb(STATUS_PORT) & STATUS_OUTPUT_FULL != 0 }
}

fn read_scancode() -> u8 {
    // SAFETY: caller has confirmed `status_has_data()` just above.
    unsafe { inb(DATA_PORT) }
}

fn decode(code: u8) -> Option<u8> {
    let mut state = STATE.lock();

    if code == EXTENDED_PREFIX {
        state.extended = true;
        return None;
    }

    let released = code & RELEASE_BIT != 0;
    let base = code & !RELEASE_BIT;

    if state.extended {
        state.extended = false;
        if released {
            return None;
        }
        return match base {
            0x48 => Some(KEY_UP),
            0x50 => Some(KEY_DOWN),
            0x4B => Some(KEY_LEFT),
            0x4D => Some(KEY_RIGHT),
            _ => None,
        };
    }

    if base == LSHIFT_MAKE || base == RSHIFT_MAKE {
        state.shift = !released;
        return None;
    }

    if released {
        return None;
    }

    let table = if state.shift { &SCANCODE_MAP_SHIFT } else { &SCANCODE_MAP };
    let mapped = table[base as usize];
    if mapped == 0 {
        None
    } else {
        Some(mapped)
    }
}

/// Non-blocking: tries COM1 first (translating CR to LF for line-oriented
/// test scripts), then the PS/2 controller. Returns `None` if nothing is
/// pending on either source.
pub fn try_read_char() -> Option<u8> {
    if let Some(byte) = serial::try_read_byte() {
        return Some(if byte == b'\r' { b'\n' } else { byte });
    }

    if status_has_data() {
        let code = read_scancode();
        return decode(code);
    }

    None
}
