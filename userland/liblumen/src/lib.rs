//! System library for YOLO-OS user-space programs: the `int 0x80` syscall
//! ABI, a `print!`/`println!` console, and a heap backed by `sbrk`.

#![no_std]
#![feature(alloc_error_handler)]

extern crate alloc;

pub mod heap;
pub mod io;
pub mod sys;

pub use io::{print, println};

use core::panic::PanicInfo;

/// Default `#[panic_handler]` body for user-space programs: reports the
/// panic over stdout and exits the *process* (255), leaving the rest of
/// the system running. A genuine OS-level panic goes through `sys::panic`
/// instead.
pub fn panic_handler_impl(info: &PanicInfo) -> ! {
    println!("PANIC: {}", info);
    sys::exit(255);
}
