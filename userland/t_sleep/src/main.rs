//! Verifies `sleep()` returns cleanly after the requested delay.
//! Translated from `original_source/bin/t_sleep.c`.

#![no_std]
#![no_main]

use liblumen::print;
use liblumen::sys;

#[no_mangle]
#[link_section = ".text.startup"]
pub extern "C" fn _start() -> ! {
    let rc = sys::sleep(1000);
    if rc == 0 {
        print!("sleep: OK\n");
        sys::exit(0);
    } else {
        print!("sleep: FAIL\n");
        sys::exit(1);
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    liblumen::panic_handler_impl(info)
}
