//! List directory contents. Translated from `original_source/bin/ls.c`:
//! directories first, then alphabetical within each group.

#![no_std]
#![no_main]

extern crate alloc;

use alloc::vec::Vec;

use liblumen::sys::{self, DirEntry};
use liblumen::{print, println};

const LS_MAX: usize = 64;

#[no_mangle]
#[link_section = ".text.startup"]
pub extern "C" fn _start() -> ! {
    let arg = sys::get_args();
    if !arg.is_empty() && sys::chdir(arg) < 0 {
        println!("ls: not found: {arg}");
        sys::exit(1);
    }

    let mut entries = [DirEntry::default(); LS_MAX];
    let n = sys::readdir(&mut entries);
    if n < 0 {
        println!("ls: disk error");
        sys::exit(1);
    }
    let n = n as usize;

    let mut sorted: Vec<DirEntry> = entries[..n].to_vec();
    sorted.sort_by(|a, b| {
        b.is_dir.cmp(&a.is_dir).then_with(|| a.name_str().cmp(b.name_str()))
    });

    for entry in &sorted {
        if entry.is_dir {
            println!("{}/", entry.name_str());
        } else {
            print!("{}  {}\n", entry.name_str(), entry.size);
        }
    }

    sys::exit(0);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    liblumen::panic_handler_impl(info)
}
