//! First user-space program. Translated from `original_source/bin/hello.c`.

#![no_std]
#![no_main]

use liblumen::{println, sys};

#[no_mangle]
#[link_section = ".text.startup"]
pub extern "C" fn _start() -> ! {
    println!("Hello from ring 0!");
    sys::exit(0);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    liblumen::panic_handler_impl(info)
}
