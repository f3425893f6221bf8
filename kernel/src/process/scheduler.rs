//! Round-robin scheduler: timer-driven preemption, sleep/wakeup, and
//! termination. Ties together the `InterruptFrame`/new-ESP convention
//! established in `arch::x86::interrupts` with the `ProcessTable` built in
//! `pcb`. No original C source exists for any of this — the reference
//! kernel ran one program at a time with no preemption at all.

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use spin::Mutex;

use crate::arch::x86::gdt;
use crate::arch::x86::interrupts::InterruptFrame;
use crate::mm::paging;
use crate::process::exec;
use crate::process::pcb::{ProcessState, ProcessTable};

pub static PROCS: Mutex<ProcessTable> = Mutex::new(ProcessTable::new());

/// Slot index of the process currently holding the CPU. Usize::MAX means
/// "no process yet" (only true before the first `exec` installs PID 1).
static CURRENT: AtomicUsize = AtomicUsize::new(usize::MAX);
static TICKS: AtomicU64 = AtomicU64::new(0);

pub fn current_slot() -> Option<usize> {
    match CURRENT.load(Ordering::SeqCst) {
        usize::MAX => None,
        slot => Some(slot),
    }
}

pub fn set_current_slot(slot: usize) {
    CURRENT.store(slot, Ordering::SeqCst);
}

pub fn ticks() -> u64 {
    TICKS.load(Ordering::SeqCst)
}

/// Called on every timer IRQ. Saves the interrupted process's stack
/// pointer, wakes anything whose deadline has passed, and round-robins to
/// the next runnable slot. Returns the new ESP to resume on, or 0 if the
/// current process should simply keep running.
pub fn tick(frame: &mut InterruptFrame) -> u32 {
    let now = TICKS.fetch_add(1, Ordering::SeqCst) + 1;

    let Some(current) = current_slot() else {
        return 0;
    };

    let mut procs = PROCS.lock();

    for pcb in procs.slots.iter_mut() {
        if pcb.state == ProcessState::Sleeping && now >= pcb.wakeup_tick {
            pcb.state = ProcessState::Ready;
        }
    }

    if procs.slots[current].state == ProcessState::Running {
        procs.slots[current].saved_esp = frame as *mut _ as u32;
        procs.slots[current].state = ProcessState::Ready;
    }

    let Some(next) = pick_next(&procs, current) else {
        // No other runnable process: resume whoever was running, if any.
        if procs.slots[current].state == ProcessState::Ready {
            procs.slots[current].state = ProcessState::Running;
        }
        return 0;
    };

    if next == current {
        procs.slots[current].state = ProcessState::Running;
        return 0;
    }

    switch_to_slot(&mut procs, next)
}

/// Finds the next READY slot after `after`, wrapping around, skipping
/// anything not runnable. Returns `None` if nothing else is runnable.
fn pick_next(procs: &ProcessTable, after: usize) -> Option<usize> {
    let n = procs.slots.len();
    for offset in 1..=n {
        let idx = (after + offset) % n;
        if procs.slots[idx].state == ProcessState::Ready {
            return Some(idx);
        }
    }
    None
}

/// Installs `slot` as the running process: flips its state, points CR3 and
/// TSS.ESP0 at it, updates `CURRENT`, and returns its saved kernel ESP.
fn switch_to_slot(procs: &mut ProcessTable, slot: usize) -> u32 {
    procs.slots[slot].state = ProcessState::Running;
    let pd_phys = procs.slots[slot].pd_phys;
    let kernel_stack_top = procs.slots[slot].kernel_stack_top;
    let esp = procs.slots[slot].saved_esp;

    set_current_slot(slot);
    // SAFETY: `pd_phys` belongs to a live, fully-built process directory —
    // every slot reachable through `pick_next` is READY or RUNNING, which
    // only ever holds for processes created via `exec::process_create`.
    unsafe { paging::switch_to_phys(pd_phys) };
    gdt::set_kernel_stack(kernel_stack_top);
    esp
}

/// Puts the current process to sleep until at least `wakeup_tick`, and
/// switches away immediately. Used by the `sleep` syscall.
pub fn sleep_current(frame: &mut InterruptFrame, wakeup_tick: u64) -> u32 {
    let Some(current) = current_slot() else {
        return 0;
    };
    let mut procs = PROCS.lock();
    procs.slots[current].saved_esp = frame as *mut _ as u32;
    procs.slots[current].state = ProcessState::Sleeping;
    procs.slots[current].wakeup_tick = wakeup_tick;

    match pick_next(&procs, current) {
        Some(next) => switch_to_slot(&mut procs, next),
        None => {
            // Nothing else runnable: busy-wait by resuming self once woken.
            // The outer `hlt` loop in `boot` picks up ticks meanwhile.
            procs.slots[current].state = ProcessState::Sleeping;
            procs.slots[current].saved_esp
        }
    }
}

/// Terminates the current process with `exit_code`. Foreground children
/// hand control straight back to their waiting parent (returning the
/// parent's saved `InterruptFrame` as the new ESP); background processes
/// and PID 1 just become ZOMBIE and fall through to the scheduler.
pub fn terminate_current(exit_code: i32) -> u32 {
    let Some(current) = current_slot() else {
        return 0;
    };

    let mut procs = PROCS.lock();
    let is_background = procs.slots[current].is_background;
    let parent_pid = procs.slots[current].parent_pid;
    let parent_cr3 = procs.slots[current].parent_cr3;
    let parent_ret_esp = procs.slots[current].saved_exec_ret_esp;
    procs.slots[current].exit_code = exit_code;
    procs.slots[current].state = ProcessState::Zombie;

    if !is_background {
        if let Some(parent_pid) = parent_pid {
            let saved_cwd_cluster = procs.slots[current].saved_cwd_cluster;
            if let Some(parent) = procs.find_by_pid(parent_pid) {
                parent.state = ProcessState::Running;
            }
            drop(procs);
            exec::destroy_process(current);
            crate::drivers::vga::restore_snapshot();
            crate::fs::FS.lock().set_cwd_cluster(saved_cwd_cluster);

            set_current_slot_by_pid(parent_pid);
            // SAFETY: `parent_cr3` is the parent's own page directory,
            // which stayed alive (WAITING, not freed) while the child ran.
            unsafe { paging::switch_to_phys(parent_cr3) };
            let parent_stack_top = {
                let mut procs = PROCS.lock();
                if let Some(parent) = procs.find_by_pid(parent_pid) {
                    // SAFETY: `parent_ret_esp` points at the `InterruptFrame`
                    // the parent's own `exec` syscall is suspended inside;
                    // writing its `eax` delivers the exit code as `exec`'s
                    // return value.
                    unsafe {
                        let frame = parent_ret_esp as *mut InterruptFrame;
                        (*frame).set_return_value(exit_code as u32);
                    }
                    parent.kernel_stack_top
                } else {
                    0
                }
            };
            if parent_stack_top != 0 {
                gdt::set_kernel_stack(parent_stack_top);
            }
            return parent_ret_esp;
        }
    }

    drop(procs);
    exec::destroy_process(current);
    crate::drivers::vga::restore_snapshot();
    let mut procs = PROCS.lock();
    match pick_next(&procs, current) {
        Some(next) => switch_to_slot(&mut procs, next),
        None => 0,
    }
}

fn set_current_slot_by_pid(pid: u32) {
    let mut procs = PROCS.lock();
    if let Some(slot) = procs.slots.iter().position(|p| p.pid == pid) {
        drop(procs);
        set_current_slot(slot);
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;
    use crate::process::pcb::ProcessTable;

    #[test]
    fn pick_next_wraps_around_and_skips_non_ready() {
        let mut procs = ProcessTable::new();
        procs.slots[0].state = ProcessState::Running;
        procs.slots[1].state = ProcessState::Zombie;
        procs.slots[2].state = ProcessState::Ready;
        assert_eq!(pick_next(&procs, 0), Some(2));
    }

    #[test]
    fn pick_next_returns_none_when_nothing_else_runnable() {
        let mut procs = ProcessTable::new();
        procs.slots[0].state = ProcessState::Running;
        assert_eq!(pick_next(&procs, 0), None);
    }

    #[test]
    fn pick_next_wraps_past_the_end_of_the_table() {
        let mut procs = ProcessTable::new();
        let last = procs.slots.len() - 1;
        procs.slots[last].state = ProcessState::Running;
        procs.slots[0].state = ProcessState::Ready;
        assert_eq!(pick_next(&procs, last), Some(0));
    }
}
