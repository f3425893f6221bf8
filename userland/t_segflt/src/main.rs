//! Deliberately writes to a kernel-only address to trigger a page fault,
//! exercising the containment path that kills the faulting process instead
//! of the kernel. Translated from `original_source/bin/t_segflt.c`.

#![no_std]
#![no_main]

use liblumen::sys;

#[no_mangle]
#[link_section = ".text.startup"]
pub extern "C" fn _start() -> ! {
    let p = 0x1000 as *mut i32;
    // SAFETY: none — this is the point. `p` is below the user region and
    // has U=0 in every page table, so this write must page-fault and the
    // kernel must kill this process rather than crash.
    unsafe { p.write_volatile(0x42) };
    sys::exit(0);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    liblumen::panic_handler_impl(info)
}
