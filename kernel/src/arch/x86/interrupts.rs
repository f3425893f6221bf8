//! The Rust-side half of interrupt dispatch: `isr_handler` is called by
//! `interrupt_stubs::isr_common_stub` with a pointer to the saved register
//! frame, and returns either 0 (resume the interrupted context) or a new
//! kernel ESP (the scheduler's way of switching to a different process
//! without ever unwinding back through `isr_handler`'s own call stack).

use super::pic;
use crate::config::EXIT_CODE_SEGFAULT;
use crate::panic_screen;
use crate::process::scheduler;
use crate::syscall;

const VECTOR_PAGE_FAULT: u32 = 14;
const VECTOR_TIMER: u32 = 32;
const VECTOR_KEYBOARD: u32 = 33;
const VECTOR_SYSCALL: u32 = 128;
const RING3_CS_RPL: u32 = 3;

#[repr(C)]
pub struct InterruptFrame {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    /// Present only when the interrupted code was ring 3 — pushed by the
    /// CPU itself before `eip`/`cs`/`eflags` are read, and popped
    /// automatically by `iretd` on the way back out. Reading these when
    /// `from_ring3()` is false reads whatever happens to follow the frame
    /// on the kernel stack and is meaningless.
    pub user_esp: u32,
    pub user_ss: u32,
}

impl InterruptFrame {
    pub fn from_ring3(&self) -> bool {
        self.cs & RING3_CS_RPL == RING3_CS_RPL
    }

    /// Syscall argument registers, per the EBX/ECX/EDX convention.
    pub fn syscall_args(&self) -> (u32, u32, u32, u32) {
        (self.eax, self.ebx, self.ecx, self.edx)
    }

    pub fn set_return_value(&mut self, value: u32) {
        self.eax = value;
    }
}

/// Called from `interrupt_stubs::isr_common_stub`. Returns a new ESP to
/// switch the running context onto a different kernel stack, or 0 to
/// resume on the current one.
///
/// # Safety
/// `frame` must point at a valid, fully-populated `InterruptFrame` built by
/// `isr_common_stub` for the lifetime of this call.
#[no_mangle]
pub unsafe extern "C" fn isr_handler(frame: *mut InterruptFrame) -> u32 {
    // SAFETY: the trampoline passes the address of the frame it just built
    // on its own stack; it remains valid for the duration of this call.
    let frame = unsafe { &mut *frame };

    match frame.vector {
        0..=31 => handle_exception(frame),
        VECTOR_TIMER => {
            let next_esp = scheduler::tick(frame);
            // SAFETY: vector came from the PIC-dispatched timer IRQ.
            unsafe { pic::send_eoi(VECTOR_TIMER as u8) };
            return next_esp;
        }
        VECTOR_KEYBOARD => {
            // SAFETY: vector came from the PIC-dispatched keyboard IRQ.
            // Actual key decoding happens through the polled path in
            // `drivers::keyboard`; this EOI just keeps the PIC unblocked.
            unsafe { pic::send_eoi(VECTOR_KEYBOARD as u8) };
        }
        VECTOR_SYSCALL => {
            // `syscall::dispatch` either sets `frame.eax` itself and
            // returns 0 (ordinary syscalls resume right here), or — for a
            // foreground `exec`/`exit` — returns the kernel ESP of whatever
            // process should run next, exactly like a timer preemption.
            return syscall::dispatch(frame);
        }
        _ => {}
    }

    0
}

fn handle_exception(frame: &InterruptFrame) -> u32 {
    if frame.vector == VECTOR_PAGE_FAULT && frame.from_ring3() {
        log::error!(
            "page fault in user process: eip={:#010x} err={:#x}",
            frame.eip,
            frame.error_code
        );
        crate::drivers::vga::print("Segmentation fault\n", crate::drivers::vga::DEFAULT_COLOR);
        return scheduler::terminate_current(EXIT_CODE_SEGFAULT);
    }

    log::error!("unhandled exception {} at eip={:#010x}", frame.vector, frame.eip);
    panic_screen::show_exception(frame.vector, frame.error_code, frame.eip, frame.eflags);
}
