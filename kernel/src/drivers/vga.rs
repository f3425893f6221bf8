//! VGA text driver: 80x25 cells at 0xB8000, hardware cursor, scrolling, and
//! the save/restore of every text-mode register (plus the character font)
//! needed to recover from a program that switched into a graphics mode.

use core::ptr::{read_volatile, write_volatile};

use lazy_static::lazy_static;
use spin::Mutex;
use x86::io::{inb, outb};

use crate::config::{VGA_COLS, VGA_ROWS, VGA_TEXT_BASE};

const CRTC_INDEX: u16 = 0x3D4;
const CRTC_DATA: u16 = 0x3D5;
const MISC_WRITE: u16 = 0x3C2;
const MISC_READ: u16 = 0x3CC;
const SEQ_INDEX: u16 = 0x3C4;
const SEQ_DATA: u16 = 0x3C5;
const GC_INDEX: u16 = 0x3CE;
const GC_DATA: u16 = 0x3CF;
const AC_INDEX: u16 = 0x3C0;
const AC_READ: u16 = 0x3C1;
const INPUT_STATUS1: u16 = 0x3DA;

const N_CRTC: usize = 25;
const N_SEQ: usize = 5;
const N_GC: usize = 9;
const N_AC: usize = 21;
const FONT_BYTES: usize = 256 * 32;

pub const DEFAULT_COLOR: u8 = 0x07;

#[derive(Clone, Copy)]
struct ScreenChar {
    ch: u8,
    color: u8,
}

#[repr(transparent)]
struct Buffer {
    cells: [[ScreenChar; VGA_COLS]; VGA_ROWS],
}

struct Writer {
    row: usize,
    col: usize,
    buffer: &'static mut Buffer,
}

impl Writer {
    fn putc(&mut self, c: u8, color: u8) {
        match c {
            b'\n' => {
                self.col = 0;
                self.row += 1;
            }
            b'\r' => self.col = 0,
            0x08 => {
                if self.col > 0 {
                    self.col -= 1;
                } else if self.row > 0 {
                    self.row -= 1;
                    self.col = VGA_COLS - 1;
                }
                self.write_cell(self.row, self.col, b' ', DEFAULT_COLOR);
            }
            c => {
                self.write_cell(self.row, self.col, c, color);
                self.col += 1;
                if self.col >= VGA_COLS {
                    self.col = 0;
                    self.row += 1;
                }
            }
        }
        if self.row >= VGA_ROWS {
            self.scroll();
        }
        update_hw_cursor(self.row, self.col);
    }

    fn write_cell(&mut self, row: usize, col: usize, ch: u8, color: u8) {
        // SAFETY: row < VGA_ROWS and col < VGA_COLS are maintained by every
        // caller above before this is invoked.
        unsafe {
            write_volatile(&mut self.buffer.cells[row][col], ScreenChar { ch, color });
        }
    }

    fn scroll(&mut self) {
        for row in 1..VGA_ROWS {
            for col in 0..VGA_COLS {
                // SAFETY: row-1 and row are both in-bounds: row ranges 1..VGA_ROWS.
                let cell = unsafe { read_volatile(&self.buffer.cells[row][col]) };
                unsafe {
                    write_volatile(&mut self.buffer.cells[row - 1][col], cell);
                }
            }
        }
        let blank = ScreenChar { ch: b' ', color: DEFAULT_COLOR };
        for col in 0..VGA_COLS {
            // SAFETY: VGA_ROWS - 1 is a valid row index.
            unsafe {
                write_volatile(&mut self.buffer.cells[VGA_ROWS - 1][col], blank);
            }
        }
        self.row = VGA_ROWS - 1;
        self.col = 0;
    }

    fn clear(&mut self) {
        let blank = ScreenChar { ch: b' ', color: DEFAULT_COLOR };
        for row in 0..VGA_ROWS {
            for col in 0..VGA_COLS {
                // SAFETY: row/col bounded by the loop ranges above.
                unsafe {
                    write_volatile(&mut self.buffer.cells[row][col], blank);
                }
            }
        }
        self.row = 0;
        self.col = 0;
        update_hw_cursor(0, 0);
    }
}

fn update_hw_cursor(row: usize, col: usize) {
    let pos = (row * VGA_COLS + col) as u16;
    // SAFETY: CRTC index/data ports are the architected cursor-location
    // registers (0x0E/0x0F); no other component drives them.
    unsafe {
        outb(CRTC_INDEX, 0x0F);
        outb(CRTC_DATA, (pos & 0xFF) as u8);
        outb(CRTC_INDEX, 0x0E);
        outb(CRTC_DATA, (pos >> 8) as u8);
    }
}

lazy_static! {
    static ref WRITER: Mutex<Writer> = Mutex::new(Writer {
        row: 0,
        col: 0,
        // SAFETY: 0xB8000 is the well-known VGA text framebuffer address,
        // identity-mapped by the kernel page directory (PDE[0]).
        buffer: unsafe { &mut *(VGA_TEXT_BASE as *mut Buffer) },
    });
}

pub fn init() {
    lazy_static::initialize(&WRITER);
    log::info!("vga: text driver ready ({}x{})", VGA_COLS, VGA_ROWS);
}

pub fn clear() {
    WRITER.lock().clear();
}

pub fn putc(c: u8, color: u8) {
    WRITER.lock().putc(c, color);
}

pub fn print(s: &str, color: u8) {
    let mut w = WRITER.lock();
    for &b in s.as_bytes() {
        w.putc(b, color);
    }
}

pub fn cursor_pos() -> (usize, usize) {
    let w = WRITER.lock();
    (w.row, w.col)
}

pub fn set_cursor_pos(row: usize, col: usize) {
    let mut w = WRITER.lock();
    w.row = row.min(VGA_ROWS - 1);
    w.col = col.min(VGA_COLS - 1);
    update_hw_cursor(w.row, w.col);
}

/// One-time capture of every register that a graphics-mode program can
/// disturb, plus the character font, so that VGA text mode can be restored
/// bit-for-bit once that program exits.
pub struct VgaSnapshot {
    misc: u8,
    seq: [u8; N_SEQ],
    crtc: [u8; N_CRTC],
    gc: [u8; N_GC],
    ac: [u8; N_AC],
    font: [u8; FONT_BYTES],
}

static SNAPSHOT: Mutex<Option<VgaSnapshot>> = Mutex::new(None);

pub fn capture_snapshot() {
    // SAFETY: reading VGA register/plane state through the standard index
    // ports; this runs once at boot before any program has touched them.
    let snap = unsafe {
        let misc = inb(MISC_READ);

        let mut seq = [0u8; N_SEQ];
        for (i, slot) in seq.iter_mut().enumerate() {
            outb(SEQ_INDEX, i as u8);
            *slot = inb(SEQ_DATA);
        }

        let mut crtc = [0u8; N_CRTC];
        for (i, slot) in crtc.iter_mut().enumerate() {
            outb(CRTC_INDEX, i as u8);
            *slot = inb(CRTC_DATA);
        }

        let mut gc = [0u8; N_GC];
        for (i, slot) in gc.iter_mut().enumerate() {
            outb(GC_INDEX, i as u8);
            *slot = inb(GC_DATA);
        }

        let mut ac = [0u8; N_AC];
        for (i, slot) in ac.iter_mut().enumerate() {
            inb(INPUT_STATUS1);
            outb(AC_INDEX, i as u8);
            *slot = inb(AC_READ);
        }
        inb(INPUT_STATUS1);
        outb(AC_INDEX, 0x20);

        let font = read_plane2_font();

        VgaSnapshot { misc, seq, crtc, gc, ac, font }
    };
    *SNAPSHOT.lock() = Some(snap);
    log::info!("vga: register and font snapshot captured");
}

/// Reads the 256-glyph, 32-byte-per-glyph font out of plane 2 by briefly
/// switching the sequencer/graphics controller into the odd/even read mode
/// text mode relies on, then restoring the controller's own select state.
unsafe fn read_plane2_font() -> [u8; FONT_BYTES] {
    let base = VGA_TEXT_BASE as *const u8;
    let mut font = [0u8; FONT_BYTES];

    outb(SEQ_INDEX, 0x04);
    let seq4 = inb(SEQ_DATA);
    outb(SEQ_INDEX, 0x04);
    outb(SEQ_DATA, (seq4 & !0x04) | 0x04);

    outb(GC_INDEX, 0x04);
    let gc4 = inb(GC_DATA);
    outb(GC_INDEX, 0x05);
    let gc5 = inb(GC_DATA);
    outb(GC_INDEX, 0x06);
    let gc6 = inb(GC_DATA);

    outb(GC_INDEX, 0x04);
    outb(GC_DATA, 2);
    outb(GC_INDEX, 0x05);
    outb(GC_DATA, gc5 & !0x10);
    outb(GC_INDEX, 0x06);
    outb(GC_DATA, gc6 & !0x02);

    for (i, slot) in font.iter_mut().enumerate() {
        *slot = read_volatile(base.add(i));
    }

    outb(GC_INDEX, 0x04);
    outb(GC_DATA, gc4);
    outb(GC_INDEX, 0x05);
    outb(GC_DATA, gc5);
    outb(GC_INDEX, 0x06);
    outb(GC_DATA, gc6);
    outb(SEQ_INDEX, 0x04);
    outb(SEQ_DATA, seq4);

    font
}

/// Current GC[6] (the "memory map select / graphics mode" register) — a
/// text-mode exit checks this against the snapshot to decide whether the
/// framebuffer needs clearing in addition to register restoration.
fn current_gc6() -> u8 {
    // SAFETY: reads the well-known graphics-controller index/data ports.
    unsafe {
        outb(GC_INDEX, 0x06);
        inb(GC_DATA)
    }
}

/// Restores every captured register and the font. Must be called whenever
/// a user program exits, unconditionally, before control returns to the
/// shell.
pub fn restore_snapshot() {
    let guard = SNAPSHOT.lock();
    let Some(snap) = guard.as_ref() else {
        return;
    };

    let was_graphics = current_gc6() != snap.gc[6];

    // SAFETY: writes back exactly the registers captured in `capture_snapshot`.
    unsafe {
        outb(MISC_WRITE, snap.misc);
        for (i, &val) in snap.seq.iter().enumerate() {
            outb(SEQ_INDEX, i as u8);
            outb(SEQ_DATA, val);
        }
        for (i, &val) in snap.crtc.iter().enumerate() {
            outb(CRTC_INDEX, i as u8);
            outb(CRTC_DATA, val);
        }
        for (i, &val) in snap.gc.iter().enumerate() {
            outb(GC_INDEX, i as u8);
            outb(GC_DATA, val);
        }
        for (i, &val) in snap.ac.iter().enumerate() {
            inb(INPUT_STATUS1);
            outb(AC_INDEX, i as u8);
            outb(AC_DATA_PORT_WRITE, val);
        }
        inb(INPUT_STATUS1);
        outb(AC_INDEX, 0x20);

        restore_plane2_font(&snap.font);
    }
    drop(guard);

    if was_graphics {
        clear();
    }
}

const AC_DATA_PORT_WRITE: u16 = 0x3C0;

/// SAFETY: caller holds `SNAPSHOT` locked and has already restored the
/// sequencer/graphics-controller register values the font write depends on.
unsafe fn restore_plane2_font(font: &[u8; FONT_BYTES]) {
    let base = VGA_TEXT_BASE as *mut u8;

    outb(SEQ_INDEX, 0x04);
    let seq4 = inb(SEQ_DATA);
    outb(SEQ_INDEX, 0x02);
    outb(SEQ_DATA, 0x04);
    outb(SEQ_INDEX, 0x04);
    outb(SEQ_DATA, seq4 | 0x04);

    outb(GC_INDEX, 0x04);
    let gc4 = inb(GC_DATA);
    outb(GC_INDEX, 0x05);
    let gc5 = inb(GC_DATA);
    outb(GC_INDEX, 0x06);
    let gc6 = inb(GC_DATA);

    outb(GC_INDEX, 0x04);
    outb(GC_DATA, 2);
    outb(GC_INDEX, 0x05);
    outb(GC_DATA, gc5 & !0x10);
    outb(GC_INDEX, 0x06);
    outb(GC_DATA, gc6 & !0x02);

    for (i, &byte) in font.iter().enumerate() {
        write_volatile(base.add(i), byte);
    }

    outb(GC_INDEX, 0x04);
    outb(GC_DATA, gc4);
    outb(GC_INDEX, 0x05);
    outb(GC_DATA, gc5);
    outb(GC_INDEX, 0x06);
    outb(GC_DATA, gc6);
    outb(SEQ_INDEX, 0x04);
    outb(SEQ_DATA, seq4);
}
