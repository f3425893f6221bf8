//! Create a directory. Translated from `original_source/bin/mkdir.c`.

#![no_std]
#![no_main]

use liblumen::println;
use liblumen::sys;

#[no_mangle]
#[link_section = ".text.startup"]
pub extern "C" fn _start() -> ! {
    let name = sys::get_args();
    if name.is_empty() {
        println!("mkdir: usage: mkdir <name>");
        sys::exit(1);
    }
    if sys::mkdir(name) < 0 {
        println!("mkdir: failed");
    }
    sys::exit(0);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    liblumen::panic_handler_impl(info)
}
