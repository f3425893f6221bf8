//! Console and fd I/O syscalls: `write`, `read`, `getchar[_nonblock]`,
//! `setpos`/`getpos`/`clrscr`. Grounded in `original_source/kernel/kernel.c`'s
//! polled serial/VGA/keyboard drivers, re-expressed against the real fd
//! table `fd.rs` adds on top of them.

use core::arch::asm;

use crate::drivers::{keyboard, serial, vga};
use crate::syscall::{user_bytes, user_bytes_mut, with_current_pcb};

const FD_STDIN: u32 = 0;
const FD_STDOUT: u32 = 1;
pub(super) const FD_BASE: i32 = 2;

pub fn sys_write(fd: u32, buf_vaddr: u32, len: u32) -> i32 {
    let len = len as usize;
    if fd == FD_STDOUT {
        let Some(bytes) = user_bytes(buf_vaddr, len) else {
            return -1;
        };
        for &b in bytes {
            vga::putc(b, vga::DEFAULT_COLOR);
            serial::write_byte(b);
        }
        return len as i32;
    }

    let slot = fd as i32 - FD_BASE;
    let Some(bytes) = user_bytes(buf_vaddr, len) else {
        return -1;
    };
    with_current_pcb(|pcb| pcb.fds.write(slot, bytes))
        .and_then(|r| r.ok())
        .map(|n| n as i32)
        .unwrap_or(-1)
}

pub fn sys_read(fd: u32, buf_vaddr: u32, len: u32) -> i32 {
    let len = len as usize;
    if fd == FD_STDIN {
        let Some(out) = user_bytes_mut(buf_vaddr, len) else {
            return -1;
        };
        let mut n = 0;
        while n < len {
            // SAFETY: a single `sti`/`hlt`/`cli` triplet per poll, matching
            // the blocking-I/O suspension point documented for stdin reads.
            unsafe { asm!("sti") };
            let c = loop {
                if let Some(c) = keyboard::try_read_char() {
                    break c;
                }
                unsafe { asm!("hlt") };
            };
            unsafe { asm!("cli") };

            vga::putc(c, vga::DEFAULT_COLOR);
            out[n] = c;
            n += 1;
            if c == b'\n' {
                break;
            }
        }
        return n as i32;
    }

    let slot = fd as i32 - FD_BASE;
    let Some(out) = user_bytes_mut(buf_vaddr, len) else {
        return -1;
    };
    with_current_pcb(|pcb| pcb.fds.read(slot, out))
        .and_then(|r| r.ok())
        .map(|n| n as i32)
        .unwrap_or(-1)
}

pub fn sys_getchar(_frame: &mut crate::arch::x86::interrupts::InterruptFrame) -> i32 {
    unsafe { asm!("sti") };
    let c = loop {
        if let Some(c) = keyboard::try_read_char() {
            break c;
        }
        unsafe { asm!("hlt") };
    };
    unsafe { asm!("cli") };
    c as i32
}

pub fn sys_getchar_nonblock() -> i32 {
    keyboard::try_read_char().map(|c| c as i32).unwrap_or(0)
}

pub fn sys_setpos(row: u32, col: u32) {
    vga::set_cursor_pos(row as usize, col as usize);
}

pub fn sys_getpos() -> u32 {
    let (row, col) = vga::cursor_pos();
    (row as u32) * 256 + (col as u32)
}
