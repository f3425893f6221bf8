//! Kernel library: everything except the raw entry stub lives here so unit
//! tests (`cargo test` on the host target) can exercise individual modules
//! without needing a bootable image.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", feature(alloc_error_handler))]

extern crate alloc;

pub mod arch;
pub mod boot;
pub mod config;
pub mod drivers;
pub mod fs;
pub mod logging;
pub mod mm;
pub mod panic_screen;
pub mod process;
pub mod syscall;

#[cfg(target_os = "none")]
use linked_list_allocator::LockedHeap;

/// Kernel heap backing `alloc::{vec, string, boxed}` used throughout the
/// syscall layer. `SIZE` comes straight out of the bringup design — a
/// modest fixed arena carved out of `.bss`, grown into by `mm::heap::init`
/// once paging is live.
#[cfg(target_os = "none")]
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

#[cfg(not(target_os = "none"))]
extern crate std;
#[cfg(not(target_os = "none"))]
#[global_allocator]
static SYSTEM_ALLOCATOR: std::alloc::System = std::alloc::System;

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    panic_screen::show_rust_panic(info)
}

#[cfg(target_os = "none")]
#[alloc_error_handler]
fn alloc_error(layout: core::alloc::Layout) -> ! {
    log::error!("kernel heap exhausted: {:?}", layout);
    panic_screen::show_user_panic("kernel", "out of heap memory")
}
