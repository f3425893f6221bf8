//! Process-lifecycle syscalls: `exit`, `exec`, `sleep`, `panic`. These are
//! the four calls that can hand control to a different kernel stack, so
//! each returns the same new-ESP convention `dispatch` forwards straight
//! out of `isr_handler`.

use crate::arch::x86::interrupts::InterruptFrame;
use crate::config::PIT_HZ;
use crate::panic_screen;
use crate::process::exec;
use crate::process::scheduler;
use crate::syscall::{user_cstr, with_current_pcb};

const MAX_NAME: usize = 32;
const MAX_ARGS: usize = 128;
const EXEC_FLAG_BACKGROUND: u32 = 1;

pub fn sys_exit(code: i32) -> u32 {
    scheduler::terminate_current(code)
}

pub fn sys_exec(frame: &mut InterruptFrame, name_vaddr: u32, args_vaddr: u32, flags: u32) -> u32 {
    let (Some(name), Some(args)) =
        (user_cstr(name_vaddr, MAX_NAME), user_cstr(args_vaddr, MAX_ARGS))
    else {
        frame.set_return_value(u32::MAX);
        return 0;
    };

    if flags & EXEC_FLAG_BACKGROUND != 0 {
        return match exec::exec_background(&name, &args) {
            Ok(pid) => {
                frame.set_return_value(pid);
                0
            }
            Err(_) => {
                frame.set_return_value(u32::MAX);
                0
            }
        };
    }

    let Some(parent_slot) = scheduler::current_slot() else {
        frame.set_return_value(u32::MAX);
        return 0;
    };
    let parent_frame_addr = frame as *mut InterruptFrame as u32;

    match exec::exec_foreground(&name, &args, parent_slot, parent_frame_addr) {
        Ok(new_esp) => new_esp,
        Err(_) => {
            frame.set_return_value(u32::MAX);
            0
        }
    }
}

pub fn sys_sleep(frame: &mut InterruptFrame, ms: u32) -> u32 {
    let ticks_to_wait = ((ms as u64) * PIT_HZ as u64).div_ceil(1000).max(1);
    let wakeup_tick = scheduler::ticks() + ticks_to_wait;
    frame.set_return_value(0);
    scheduler::sleep_current(frame, wakeup_tick)
}

pub fn sys_panic(msg_vaddr: u32) -> ! {
    let msg = user_cstr(msg_vaddr, 256).unwrap_or_else(|| alloc::string::String::from("panic"));
    let name = with_current_pcb(|pcb| alloc::string::String::from(pcb.name()))
        .unwrap_or_else(|| alloc::string::String::from("?"));
    panic_screen::show_user_panic(&name, &msg);
}
