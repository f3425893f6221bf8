//! Rename a file or directory. Translated from `original_source/bin/mv.c`.

#![no_std]
#![no_main]

use liblumen::println;
use liblumen::sys;

#[no_mangle]
#[link_section = ".text.startup"]
pub extern "C" fn _start() -> ! {
    let args = sys::get_args();
    let usage = || {
        println!("mv: usage: mv <src> <dst>");
        sys::exit(1);
    };

    if args.is_empty() {
        usage();
    }

    let mut parts = args.splitn(2, ' ');
    let src = parts.next().unwrap_or("");
    let dst = parts.next().unwrap_or("").trim_start();
    if src.is_empty() || dst.is_empty() {
        usage();
    }

    if sys::rename(src, dst) < 0 {
        println!("mv: failed");
    }
    sys::exit(0);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    liblumen::panic_handler_impl(info)
}
