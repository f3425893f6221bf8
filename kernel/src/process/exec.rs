//! Process creation, foreground/background `exec`, and destruction —
//! ¶4.9 of the process-model design, translated into the `FrameAllocator`
//! + `ProcessDirectory` primitives built in `mm`. No original C source
//! exists for this; the reference kernel ran a single flat program with no
//! process table at all.

use crate::arch::x86::context::build_initial_frame;
use crate::arch::x86::gdt;
use crate::config::{
    ARGS_VPN, HEAP_BASE, PROG_BASE, PROG_PAGES, STACK_ARGS_FIRST_VPN, STACK_ARGS_PAGES,
    USER_STACK_TOP,
};
use crate::mm::frame_allocator::FRAME_ALLOCATOR;
use crate::mm::paging::{self, ProcessDirectory};
use crate::process::pcb::{Pcb, ProcessState};
use crate::process::scheduler;

const KERNEL_STACK_PAGES: usize = 1;
const KERNEL_STACK_SIZE: u32 = crate::config::FRAME_SIZE * KERNEL_STACK_PAGES as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    NoFreeSlot,
    OutOfMemory,
    BinaryNotFound,
    BinaryTooLarge,
}

pub type Result<T> = core::result::Result<T, ExecError>;

struct Allocation {
    pd: Option<ProcessDirectory>,
    kernel_stack: Option<u32>,
    binary_base: Option<u32>,
    stack_args_base: Option<u32>,
}

impl Allocation {
    fn rollback(self) {
        if let Some(pd) = &self.pd {
            let _ = paging::destroy_process_directory(&FRAME_ALLOCATOR, pd);
        }
        if let Some(a) = self.kernel_stack {
            let _ = FRAME_ALLOCATOR.free(a);
        }
        if let Some(a) = self.binary_base {
            let _ = FRAME_ALLOCATOR.free_contiguous(a, PROG_PAGES);
        }
        if let Some(a) = self.stack_args_base {
            let _ = FRAME_ALLOCATOR.free_contiguous(a, STACK_ARGS_PAGES);
        }
    }
}

/// Builds a new, fully-populated but not-yet-scheduled process.
///
/// Assumes the caller is running under the kernel page directory — binary
/// frames are filled through their always-identity-mapped physical
/// addresses, not through the new process's own (not-yet-active) user PT.
pub fn process_create(name: &str, args: &str) -> Result<usize> {
    let mut alloc = Allocation { pd: None, kernel_stack: None, binary_base: None, stack_args_base: None };

    let pd = paging::build_process_directory(&FRAME_ALLOCATOR).map_err(|_| ExecError::OutOfMemory)?;
    alloc.pd = Some(pd);

    let kernel_stack_base = match FRAME_ALLOCATOR.alloc() {
        Ok(a) => a,
        Err(_) => {
            alloc.rollback();
            return Err(ExecError::OutOfMemory);
        }
    };
    alloc.kernel_stack = Some(kernel_stack_base);

    let binary_base = match FRAME_ALLOCATOR.alloc_contiguous(PROG_PAGES) {
        Ok(a) => a,
        Err(_) => {
            alloc.rollback();
            return Err(ExecError::OutOfMemory);
        }
    };
    alloc.binary_base = Some(binary_base);

    let stack_args_base = match FRAME_ALLOCATOR.alloc_contiguous(STACK_ARGS_PAGES) {
        Ok(a) => a,
        Err(_) => {
            alloc.rollback();
            return Err(ExecError::OutOfMemory);
        }
    };
    alloc.stack_args_base = Some(stack_args_base);

    let pd = alloc.pd.as_ref().unwrap();
    for i in 0..PROG_PAGES {
        let frame = binary_base + (i as u32) * crate::config::FRAME_SIZE;
        let _ = pd.map_user_page(i, frame, true);
    }
    for i in 0..STACK_ARGS_PAGES {
        let frame = stack_args_base + (i as u32) * crate::config::FRAME_SIZE;
        let _ = pd.map_user_page(STACK_ARGS_FIRST_VPN + i, frame, true);
    }

    // SAFETY: `binary_base` is a freshly allocated, identity-mapped frame
    // run not yet referenced by any running process.
    let binary_mem = unsafe {
        core::slice::from_raw_parts_mut(binary_base as *mut u8, (PROG_PAGES as u32 * crate::config::FRAME_SIZE) as usize)
    };
    binary_mem.fill(0);
    let read_len = {
        let mut fs = crate::fs::FS.lock();
        fs.read_from_bin(name, binary_mem)
    };
    let read_len = match read_len {
        Ok(n) if n > 0 => n,
        _ => {
            alloc.rollback();
            return Err(ExecError::BinaryNotFound);
        }
    };
    if read_len > binary_mem.len() {
        alloc.rollback();
        return Err(ExecError::BinaryTooLarge);
    }

    // SAFETY: `stack_args_base` holds the ARGS_VPN frame at a known offset
    // within the just-allocated, identity-mapped run.
    let args_frame_index = ARGS_VPN - STACK_ARGS_FIRST_VPN;
    let args_mem = unsafe {
        let args_addr = stack_args_base + (args_frame_index as u32) * crate::config::FRAME_SIZE;
        core::slice::from_raw_parts_mut(args_addr as *mut u8, crate::config::FRAME_SIZE as usize)
    };
    args_mem.fill(0);
    let n = args.as_bytes().len().min(args_mem.len() - 1);
    args_mem[..n].copy_from_slice(&args.as_bytes()[..n]);

    let kernel_stack_top = kernel_stack_base + KERNEL_STACK_SIZE;
    // SAFETY: `kernel_stack_base` is a freshly allocated, exclusively
    // owned, identity-mapped frame big enough for one `InterruptFrame`.
    let saved_esp = unsafe { build_initial_frame(kernel_stack_top, PROG_BASE, USER_STACK_TOP) };

    let mut procs = scheduler::PROCS.lock();
    let Some(slot) = procs.find_free_slot() else {
        drop(procs);
        alloc.rollback();
        return Err(ExecError::NoFreeSlot);
    };
    let pid = procs.alloc_pid();

    let pcb = &mut procs.slots[slot];
    *pcb = Pcb::unused();
    pcb.pid = pid;
    pcb.set_name(name);
    let built_pd = alloc.pd.as_ref().unwrap();
    pcb.pd_phys = built_pd.pd_phys();
    pcb.user_pt_phys = built_pd.user_pt_phys();
    pcb.kernel_stack_base = kernel_stack_base;
    pcb.kernel_stack_top = kernel_stack_top;
    pcb.saved_esp = saved_esp;
    pcb.heap_break = HEAP_BASE;
    pcb.saved_cwd_cluster = crate::fs::FS.lock().cwd_cluster();
    pcb.state = ProcessState::Ready;

    // `alloc`'s Drop would free everything we just committed to the PCB —
    // defuse it by taking ownership of the pieces without running rollback.
    core::mem::forget(alloc);

    Ok(slot)
}

/// `exec` with `flags` bit 0 clear: blocks the caller until the child
/// exits, returning the child's exit code. Called from the syscall
/// dispatcher, which is itself running on the parent's kernel stack inside
/// the very `InterruptFrame` this function snapshots.
pub fn exec_foreground(
    name: &str,
    args: &str,
    parent_slot: usize,
    parent_frame_addr: u32,
) -> core::result::Result<u32, i32> {
    let child_slot = process_create(name, args).map_err(|_| -1)?;

    let mut procs = scheduler::PROCS.lock();
    let parent_cr3 = procs.slots[parent_slot].pd_phys;
    procs.slots[parent_slot].state = ProcessState::Waiting;
    procs.slots[parent_slot].saved_exec_ret_esp = parent_frame_addr;

    let parent_pid = procs.slots[parent_slot].pid;
    let child = &mut procs.slots[child_slot];
    child.is_background = false;
    child.parent_pid = Some(parent_pid);
    child.parent_cr3 = parent_cr3;
    child.state = ProcessState::Running;
    let child_esp = child.saved_esp;
    let child_pd = child.pd_phys;
    let child_kernel_stack_top = child.kernel_stack_top;

    scheduler::set_current_slot(child_slot);
    drop(procs);

    // SAFETY: `child_pd` was just built by `process_create` and is fully
    // populated.
    unsafe { paging::switch_to_phys(child_pd) };
    gdt::set_kernel_stack(child_kernel_stack_top);

    Ok(child_esp)
}

/// `exec` with `flags` bit 0 set: returns the new PID immediately, leaving
/// the child READY for the scheduler to pick up on its own.
pub fn exec_background(name: &str, args: &str) -> core::result::Result<u32, i32> {
    let child_slot = process_create(name, args).map_err(|_| -1)?;
    let mut procs = scheduler::PROCS.lock();
    procs.slots[child_slot].is_background = true;
    Ok(procs.slots[child_slot].pid)
}

/// Frees every resource owned by a terminated process: its user page
/// table's mapped frames, the page directory and user PT themselves, and
/// its kernel stack. Must run under the kernel page directory.
pub fn destroy_process(slot: usize) {
    let mut procs = scheduler::PROCS.lock();
    let pcb = &mut procs.slots[slot];
    let user_pt_phys = pcb.user_pt_phys;
    let pd_phys = pcb.pd_phys;
    let kernel_stack_base = pcb.kernel_stack_base;
    pcb.fds.close_all();

    // SAFETY: `user_pt_phys` is identity-mapped kernel-resident memory
    // owned exclusively by this (now-dead) process.
    if user_pt_phys != 0 {
        unsafe {
            let table = user_pt_phys as *const [u32; 1024];
            for &raw in (*table).iter() {
                if raw & 1 != 0 {
                    let _ = FRAME_ALLOCATOR.free(raw & !0xFFF);
                }
            }
        }
    }

    if pd_phys != 0 {
        let _ = FRAME_ALLOCATOR.free(pd_phys);
    }
    if user_pt_phys != 0 {
        let _ = FRAME_ALLOCATOR.free(user_pt_phys);
    }
    if kernel_stack_base != 0 {
        let _ = FRAME_ALLOCATOR.free(kernel_stack_base);
    }

    *pcb = Pcb::unused();
}
