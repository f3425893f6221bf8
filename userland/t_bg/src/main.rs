//! Background-execution test: sleeps 300 ms, then prints a completion
//! marker. Run as `t_bg &`; the shell prompt should return immediately and
//! the marker appears ~300 ms later. Translated from
//! `original_source/bin/t_bg.c`.

#![no_std]
#![no_main]

use liblumen::print;
use liblumen::sys;

#[no_mangle]
#[link_section = ".text.startup"]
pub extern "C" fn _start() -> ! {
    sys::sleep(300);
    print!("bg: OK\n");
    sys::exit(0);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    liblumen::panic_handler_impl(info)
}
