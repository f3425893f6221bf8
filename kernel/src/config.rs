//! Compile-time constants shared across the kernel.
//!
//! The C original scattered these as per-file `#define`s (`pmm.c`, `idt.c`,
//! `fat16.c`); Rust's module system makes a single source of truth both
//! possible and preferable, so they are consolidated here.

/// Start of the physical memory window the PFA manages.
pub const PMM_BASE: u32 = 0x0010_0000;
/// End of the physical memory window the PFA manages (exclusive).
pub const PMM_END: u32 = 0x0800_0000;
/// Size of one physical frame / page.
pub const FRAME_SIZE: u32 = 4096;
/// Total number of frames in `[PMM_BASE, PMM_END)`.
pub const TOTAL_FRAMES: usize = ((PMM_END - PMM_BASE) / FRAME_SIZE) as usize;
/// Number of 32-bit words in the PFA bitmap.
pub const BITMAP_WORDS: usize = TOTAL_FRAMES.div_ceil(32);

/// Maximum number of simultaneously live processes.
pub const PROC_MAX_PROCS: usize = 32;
/// Number of file descriptors in the kernel-global fd table.
pub const MAX_FILE_FDS: usize = 16;
/// Size of each fd's in-memory buffer.
pub const FILE_BUF_SIZE: usize = 16 * 1024;

/// Base virtual address of the per-process user region.
pub const USER_REGION_BASE: u32 = 0x0040_0000;
/// One-past-the-end virtual address of the per-process user region.
pub const USER_REGION_END: u32 = 0x0080_0000;
/// Virtual address every program's `.text` begins at.
pub const PROG_BASE: u32 = 0x0040_0000;
/// Size, in bytes, of the contiguous binary-image window.
pub const PROG_SIZE: u32 = 256 * 1024;
/// Number of 4 KiB pages the binary-image window spans (VPN 0..63).
pub const PROG_PAGES: usize = (PROG_SIZE / FRAME_SIZE) as usize;
/// Heap base (first byte past the binary window).
pub const HEAP_BASE: u32 = PROG_BASE + PROG_SIZE;
/// First VPN (relative to the user PT) available for heap growth.
pub const HEAP_FIRST_VPN: usize = PROG_PAGES;
/// One-past-the-last VPN available for heap growth.
pub const HEAP_LAST_VPN: usize = 1016;
/// First VPN of the stack + args region (7 pages).
pub const STACK_ARGS_FIRST_VPN: usize = 1016;
/// Number of pages in the stack + args region.
pub const STACK_ARGS_PAGES: usize = 7;
/// VPN of the args page within the user PT.
pub const ARGS_VPN: usize = 1020;
/// Virtual address of the args page.
pub const ARGS_BASE: u32 = 0x007F_C000;
/// Top of the user stack (grows down from here).
pub const USER_STACK_TOP: u32 = 0x007F_F000;

/// Timer tick rate in Hz.
pub const PIT_HZ: u32 = 100;
/// PIT reload divisor yielding exactly `PIT_HZ` from the 1.193182 MHz input clock.
pub const PIT_DIVISOR: u16 = 11932;

/// VGA text-mode geometry.
pub const VGA_COLS: usize = 80;
pub const VGA_ROWS: usize = 25;
/// Physical/virtual address of the VGA text framebuffer.
pub const VGA_TEXT_BASE: u32 = 0x000B_8000;
/// Start of the legacy VGA graphics framebuffer window (mode 13h etc).
pub const VGA_GFX_BASE: u32 = 0x000A_0000;
/// End (exclusive) of the VGA graphics framebuffer window.
pub const VGA_GFX_END: u32 = 0x000C_0000;

/// Maximum directory entries `readdir`/`ls` can enumerate in one call.
pub const LS_MAX_ENTRIES: usize = 64;

/// Exit code delivered when a user-mode process is killed by a page fault.
pub const EXIT_CODE_SEGFAULT: i32 = 139;

/// Path to the persistent boot counter.
pub const BOOT_COUNTER_PATH: &str = "BOOT.TXT";
