//! The red screen of death: fills the VGA text buffer, dumps registers at
//! fixed columns, mirrors everything to COM1, then halts forever.
//! Grounded in `original_source/kernel/idt.c`'s `panic()` (same register
//! set, same "fixed slot" layout), re-expressed over the `vga`/`serial`
//! drivers this kernel already has.

use core::arch::asm;
use core::fmt::Write;

use x86::controlregs;

use crate::config::{VGA_COLS, VGA_ROWS};
use crate::drivers::vga;

const RED_ON_WHITE: u8 = 0x4F;
const COL_STRIDE: usize = 20;

fn fill_red() {
    vga::clear();
    // `clear()` restores the default attribute; repaint every cell with the
    // panic-screen color by writing a space in it at every position.
    for row in 0..VGA_ROWS {
        vga::set_cursor_pos(row, 0);
        for _ in 0..VGA_COLS {
            vga::putc(b' ', RED_ON_WHITE);
        }
    }
    vga::set_cursor_pos(0, 0);
}

fn print_line(row: usize, text: &str) {
    vga::set_cursor_pos(row, 0);
    for &b in text.as_bytes().iter().take(VGA_COLS) {
        vga::putc(b, RED_ON_WHITE);
    }
}

fn print_field(row: usize, col: usize, text: &str) {
    vga::set_cursor_pos(row, col);
    for &b in text.as_bytes() {
        vga::putc(b, RED_ON_WHITE);
    }
}

struct Columns {
    row: usize,
    col: usize,
}

impl Columns {
    fn emit(&mut self, label: &str, value: u32) {
        let mut buf = heapless_fmt::Buf::new();
        let _ = write!(buf, "{}={:08x}", label, value);
        print_field(self.row, self.col, buf.as_str());
        self.col += COL_STRIDE;
        if self.col + COL_STRIDE > VGA_COLS {
            self.col = 0;
            self.row += 1;
        }
    }
}

/// A tiny fixed-size formatting sink so the panic path never touches the
/// heap allocator, which may itself be the thing that is broken.
mod heapless_fmt {
    use core::fmt;

    pub struct Buf {
        data: [u8; 32],
        len: usize,
    }

    impl Buf {
        pub fn new() -> Self {
            Self { data: [0; 32], len: 0 }
        }

        pub fn as_str(&self) -> &str {
            core::str::from_utf8(&self.data[..self.len]).unwrap_or("")
        }
    }

    impl fmt::Write for Buf {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let bytes = s.as_bytes();
            let n = bytes.len().min(self.data.len() - self.len);
            self.data[self.len..self.len + n].copy_from_slice(&bytes[..n]);
            self.len += n;
            Ok(())
        }
    }

    #[cfg(all(test, not(target_os = "none")))]
    mod tests {
        use super::*;
        use core::fmt::Write as _;

        #[test]
        fn formats_within_capacity() {
            let mut buf = Buf::new();
            write!(buf, "VEC={:08x}", 13u32).unwrap();
            assert_eq!(buf.as_str(), "VEC=0000000d");
        }

        #[test]
        fn silently_truncates_past_capacity() {
            let mut buf = Buf::new();
            write!(buf, "{}", "x".repeat(64)).unwrap();
            assert_eq!(buf.as_str().len(), 32);
        }
    }
}

fn halt_forever() -> ! {
    loop {
        // SAFETY: the panic path never returns; parking the CPU with
        // interrupts disabled is the documented terminal state.
        unsafe { asm!("cli", "hlt") };
    }
}

/// Full diagnostic screen for an unhandled CPU exception: vector, error
/// code, the faulting EIP/EFLAGS, every GP register snapshot available to
/// the trap frame, and the live control registers.
pub fn show_exception(vector: u32, error_code: u32, eip: u32, eflags: u32) -> ! {
    fill_red();
    print_line(0, "*** KERNEL PANIC: unhandled exception ***");

    let mut cols = Columns { row: 2, col: 0 };
    cols.emit("VEC", vector);
    cols.emit("ERR", error_code);
    cols.emit("EIP", eip);
    cols.emit("EFLAGS", eflags);

    // SAFETY: reading control registers is always safe; they reflect
    // whatever state the CPU is actually in right now.
    let (cr0, cr2, cr3, cr4) = unsafe {
        (
            controlregs::cr0().bits() as u32,
            controlregs::cr2() as u32,
            controlregs::cr3() as u32,
            controlregs::cr4().bits() as u32,
        )
    };
    cols.row += 1;
    cols.col = 0;
    cols.emit("CR0", cr0);
    cols.emit("CR2", cr2);
    cols.emit("CR3", cr3);
    cols.emit("CR4", cr4);

    crate::serial_println!(
        "PANIC exception vec={} err={:#x} eip={:#010x} eflags={:#010x} cr0={:#x} cr2={:#x} cr3={:#x} cr4={:#x}",
        vector,
        error_code,
        eip,
        eflags,
        cr0,
        cr2,
        cr3,
        cr4
    );

    halt_forever()
}

/// Panic screen for the `panic` syscall: a user process explicitly asked
/// to go down, carrying its own message.
pub fn show_user_panic(process_name: &str, message: &str) -> ! {
    fill_red();
    print_line(0, "*** KERNEL PANIC: process panic ***");
    print_line(2, process_name);
    print_line(3, message);

    crate::serial_println!("PANIC process={} msg={}", process_name, message);

    halt_forever()
}

/// Panic screen for a Rust-level `panic!` inside the kernel itself (the
/// `#[panic_handler]` in `lib.rs` forwards here).
pub fn show_rust_panic(info: &core::panic::PanicInfo) -> ! {
    fill_red();
    print_line(0, "*** KERNEL PANIC: internal error ***");

    let mut buf = heapless_fmt::Buf::new();
    if let Some(location) = info.location() {
        let _ = write!(buf, "{}:{}", location.file(), location.line());
    }
    print_line(2, buf.as_str());

    crate::serial_println!("PANIC internal {}", info);

    halt_forever()
}
