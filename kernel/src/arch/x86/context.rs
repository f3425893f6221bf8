//! Builds the saved-register frame a brand-new process needs on its kernel
//! stack so that the *normal* interrupt-return path (`isr_common_stub`'s
//! `popad`/`iretd` epilogue) can drop it into ring 3 the same way it
//! resumes any process the timer tick switched away from.
//!
//! The very first process ever scheduled (the shell, PID 1) has no prior
//! interrupt context to return through, so it instead enters ring 3 via
//! `interrupt_stubs::exec_run`, a one-shot trampoline. Every process
//! created afterwards — including subsequent `exec` calls — is entered
//! through this synthesized frame instead, so the scheduler only has one
//! resume mechanism to reason about once PID 1 is running.

use super::gdt::{USER_CODE_SELECTOR, USER_DATA_SELECTOR};
use super::interrupts::InterruptFrame;

const EFLAGS_IF: u32 = 1 << 9;
const EFLAGS_RESERVED: u32 = 1 << 1;

/// Writes an `InterruptFrame` at the top of `kernel_stack_top` (which must
/// be 4-byte aligned and have room for one full frame below it) so that
/// resuming through it lands at `entry_eip` in ring 3 with `user_esp` as
/// the user stack pointer. Returns the kernel ESP to hand back as the
/// context switch's "new ESP".
///
/// # Safety
/// `kernel_stack_top` must reference writable, exclusively-owned memory at
/// least `size_of::<InterruptFrame>()` bytes below it.
pub unsafe fn build_initial_frame(kernel_stack_top: u32, entry_eip: u32, user_esp: u32) -> u32 {
    let frame_addr = kernel_stack_top - core::mem::size_of::<InterruptFrame>() as u32;
    // SAFETY: caller guarantees this range is writable and exclusively
    // owned by the process whose stack this is.
    unsafe {
        let frame = frame_addr as *mut InterruptFrame;
        (*frame).gs = USER_DATA_SELECTOR as u32;
        (*frame).fs = USER_DATA_SELECTOR as u32;
        (*frame).es = USER_DATA_SELECTOR as u32;
        (*frame).ds = USER_DATA_SELECTOR as u32;
        (*frame).edi = 0;
        (*frame).esi = 0;
        (*frame).ebp = 0;
        (*frame).esp_dummy = 0;
        (*frame).ebx = 0;
        (*frame).edx = 0;
        (*frame).ecx = 0;
        (*frame).eax = 0;
        (*frame).vector = 0;
        (*frame).error_code = 0;
        (*frame).eip = entry_eip;
        (*frame).cs = USER_CODE_SELECTOR as u32;
        (*frame).eflags = EFLAGS_IF | EFLAGS_RESERVED;
        (*frame).user_esp = user_esp;
        (*frame).user_ss = USER_DATA_SELECTOR as u32;
    }
    frame_addr
}
