//! Bootable image entry point. All real code lives in `yolo_kernel`; this
//! binary exists only so the linker has something to produce — the actual
//! entry symbol (`kernel_entry`) is the raw asm stub in
//! `arch::x86::entry`, referenced by `link.ld`'s `ENTRY()` directive.

#![no_std]
#![no_main]

use yolo_kernel as _;
