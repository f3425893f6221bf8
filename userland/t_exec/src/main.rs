//! Stress-tests `exec()` by spawning 300 children sequentially, verifying
//! process-slot recycling across many create/destroy cycles. Translated
//! from `original_source/bin/t_exec.c`.

#![no_std]
#![no_main]

use liblumen::print;
use liblumen::sys;

#[no_mangle]
#[link_section = ".text.startup"]
pub extern "C" fn _start() -> ! {
    for _ in 0..300 {
        if sys::exec("hello", "", false) < 0 {
            print!("exec: FAIL\n");
            sys::exit(1);
        }
    }
    print!("exec: OK\n");
    sys::exit(0);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    liblumen::panic_handler_impl(info)
}
