//! Kernel heap: a fixed `.bss` arena handed to `linked_list_allocator`,
//! backing the `alloc::{String, Vec}` usage in the syscall layer. The
//! reference kernel had no heap at all — every buffer in `kernel.c` was a
//! fixed-size C array — so this is sized generously rather than tuned.

const HEAP_SIZE: usize = 256 * 1024;

#[cfg(target_os = "none")]
static mut HEAP: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

/// Initializes the global allocator's backing arena. Must run once, after
/// `mm::paging::enable` (so the `.bss` pages this lives in are already
/// mapped the same as everywhere else) and before any syscall touches
/// `alloc`.
#[cfg(target_os = "none")]
pub fn init() {
    // SAFETY: runs exactly once during bringup, before any other code
    // references `HEAP` or allocates through the global allocator.
    unsafe {
        let start = core::ptr::addr_of_mut!(HEAP) as *mut u8;
        crate::ALLOCATOR.lock().init(start, HEAP_SIZE);
    }
    log::info!("heap: {} KiB arena ready", HEAP_SIZE / 1024);
}

#[cfg(not(target_os = "none"))]
pub fn init() {}
