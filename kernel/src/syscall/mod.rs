//! System call dispatch: `int 0x80`, EAX = number, EBX/ECX/EDX = args,
//! EAX = return value. Grounded directly in the process-model design
//! (§4.10) — the reference kernel had a single flat `syscall_handler`
//! switch in `kernel.c`'s predecessor that this table-driven version
//! generalizes with a real per-process fd table and process tree.

mod fsops;
mod io;
mod mem;
mod process;

use crate::arch::x86::interrupts::InterruptFrame;
use crate::process::pcb::Pcb;
use crate::process::scheduler;

const SYS_EXIT: u32 = 0;
const SYS_WRITE: u32 = 1;
const SYS_READ: u32 = 2;
const SYS_OPEN: u32 = 3;
const SYS_CLOSE: u32 = 4;
const SYS_GETCHAR: u32 = 5;
const SYS_SETPOS: u32 = 6;
const SYS_CLRSCR: u32 = 7;
const SYS_GETCHAR_NONBLOCK: u32 = 8;
const SYS_READDIR: u32 = 9;
const SYS_UNLINK: u32 = 10;
const SYS_MKDIR: u32 = 11;
const SYS_RENAME: u32 = 12;
const SYS_EXEC: u32 = 13;
const SYS_CHDIR: u32 = 14;
const SYS_GETPOS: u32 = 15;
const SYS_PANIC: u32 = 16;
const SYS_MEMINFO: u32 = 17;
const SYS_SBRK: u32 = 18;
const SYS_SLEEP: u32 = 19;

const NEG_ONE: u32 = u32::MAX;

/// Runs the current process's pending call to completion. Returns 0 to
/// resume `frame` as-is, or a new kernel ESP if control must switch to a
/// different process (foreground `exec`/`exit`), exactly like a timer
/// preemption.
pub fn dispatch(frame: &mut InterruptFrame) -> u32 {
    let (num, ebx, ecx, edx) = frame.syscall_args();

    match num {
        SYS_EXIT => return process::sys_exit(ebx as i32),
        SYS_WRITE => {
            let r = io::sys_write(ebx, ecx, edx);
            frame.set_return_value(r as u32);
        }
        SYS_READ => {
            let r = io::sys_read(ebx, ecx, edx);
            frame.set_return_value(r as u32);
        }
        SYS_OPEN => {
            let r = fsops::sys_open(ebx, ecx);
            frame.set_return_value(r as u32);
        }
        SYS_CLOSE => {
            let r = fsops::sys_close(ebx as i32);
            frame.set_return_value(r as u32);
        }
        SYS_GETCHAR => {
            let r = io::sys_getchar(frame);
            frame.set_return_value(r as u32);
        }
        SYS_SETPOS => {
            io::sys_setpos(ebx, ecx);
            frame.set_return_value(0);
        }
        SYS_CLRSCR => {
            crate::drivers::vga::clear();
            frame.set_return_value(0);
        }
        SYS_GETCHAR_NONBLOCK => {
            let r = io::sys_getchar_nonblock();
            frame.set_return_value(r as u32);
        }
        SYS_READDIR => {
            let r = fsops::sys_readdir(ebx, ecx);
            frame.set_return_value(r as u32);
        }
        SYS_UNLINK => {
            let r = fsops::sys_unlink(ebx);
            frame.set_return_value(r as u32);
        }
        SYS_MKDIR => {
            let r = fsops::sys_mkdir(ebx);
            frame.set_return_value(r as u32);
        }
        SYS_RENAME => {
            let r = fsops::sys_rename(ebx, ecx);
            frame.set_return_value(r as u32);
        }
        SYS_EXEC => return process::sys_exec(frame, ebx, ecx, edx),
        SYS_CHDIR => {
            let r = fsops::sys_chdir(ebx);
            frame.set_return_value(r as u32);
        }
        SYS_GETPOS => {
            let r = io::sys_getpos();
            frame.set_return_value(r);
        }
        SYS_PANIC => {
            process::sys_panic(ebx);
        }
        SYS_MEMINFO => {
            let r = mem::sys_meminfo(ebx);
            frame.set_return_value(r as u32);
        }
        SYS_SBRK => {
            let r = mem::sys_sbrk(ebx as i32);
            frame.set_return_value(r as u32);
        }
        SYS_SLEEP => return process::sys_sleep(frame, ebx),
        _ => frame.set_return_value(NEG_ONE),
    }

    0
}

/// Looks up the current process's slot and its user PT physical address —
/// every syscall that touches caller-space pointers needs both.
fn current_user_pt() -> Option<(usize, u32)> {
    let slot = scheduler::current_slot()?;
    let procs = scheduler::PROCS.lock();
    Some((slot, procs.slots[slot].user_pt_phys))
}

fn with_current_pcb<R>(f: impl FnOnce(&mut Pcb) -> R) -> Option<R> {
    let slot = scheduler::current_slot()?;
    let mut procs = scheduler::PROCS.lock();
    Some(f(&mut procs.slots[slot]))
}

/// Translates a user-space pointer into a kernel-dereferenceable one and
/// hands back a byte slice of `len` bytes. Returns `None` if the process
/// isn't runnable, the pointer is unmapped, or the range would cross a
/// page boundary into an unmapped page.
fn user_bytes(vaddr: u32, len: usize) -> Option<&'static [u8]> {
    let (_, user_pt_phys) = current_user_pt()?;
    let phys = crate::mm::paging::translate_user_vaddr(user_pt_phys, vaddr)?;
    // SAFETY: `phys` was resolved through the caller's own page table and
    // lies in managed, identity-mapped physical memory; the syscall layer
    // never retains this slice past the current dispatch call.
    Some(unsafe { core::slice::from_raw_parts(phys as *const u8, len) })
}

fn user_bytes_mut(vaddr: u32, len: usize) -> Option<&'static mut [u8]> {
    let (_, user_pt_phys) = current_user_pt()?;
    let phys = crate::mm::paging::translate_user_vaddr(user_pt_phys, vaddr)?;
    // SAFETY: see `user_bytes`.
    Some(unsafe { core::slice::from_raw_parts_mut(phys as *mut u8, len) })
}

/// Reads a NUL-terminated string out of user space, up to `max_len` bytes.
fn user_cstr(vaddr: u32, max_len: usize) -> Option<alloc::string::String> {
    let bytes = user_bytes(vaddr, max_len)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(max_len);
    core::str::from_utf8(&bytes[..end]).ok().map(alloc::string::ToString::to_string)
}
