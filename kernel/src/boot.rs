//! Bringup sequence, run once from `kernel_entry`. Order matches §4.12 of
//! the kernel design exactly; each step's own module already knows how to
//! initialize itself, this just calls them in the dependency order
//! the reference kernel's linear `kmain` followed (`original_source/kernel/kernel.c`).

use core::fmt::Write as _;

use crate::arch::x86::interrupt_stubs::exec_run;
use crate::arch::x86::{gdt, idt, pic, pit};
use crate::config::BOOT_COUNTER_PATH;
use crate::drivers::{ata, serial, vga};
use crate::fs;
use crate::logging;
use crate::mm::{frame_allocator, paging};
use crate::panic_screen;
use crate::process::pcb::ProcessState;
use crate::process::{exec, scheduler};

#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    serial::init();
    logging::init();
    log::info!("yolo-os: booting");

    // SAFETY: first thing to run, single-threaded, interrupts still
    // disabled from the bootloader's handoff state.
    unsafe {
        paging::build_kernel_directory();
        paging::enable();
    }
    log::info!("paging: enabled");

    crate::mm::heap::init();

    // SAFETY: no interrupts are live yet; GDT/IDT are being installed for
    // the first and only time before `sti`.
    unsafe {
        gdt::init();
        idt::init();
        pic::init();
    }
    log::info!("gdt/idt/pic: installed");

    // SAFETY: IDT and PIC are fully programmed; it is now safe to take
    // interrupts.
    unsafe { core::arch::asm!("sti") };
    log::info!("interrupts: enabled");

    vga::init();
    vga::capture_snapshot();
    vga::clear();

    ata::init();
    fs::init();

    persist_boot_counter();

    // SAFETY: IDT already routes vector 32 to the timer ISR; this just
    // starts the PIT ticking at that rate.
    unsafe { pit::init() };
    frame_allocator::init();

    let Ok(shell_slot) = exec::process_create("sh", "") else {
        panic_screen::show_user_panic("boot", "failed to create shell process");
    };

    let (pd_phys, kernel_stack_top) = {
        let mut procs = scheduler::PROCS.lock();
        procs.slots[shell_slot].state = ProcessState::Running;
        (procs.slots[shell_slot].pd_phys, procs.slots[shell_slot].kernel_stack_top)
    };
    scheduler::set_current_slot(shell_slot);

    // SAFETY: `pd_phys` was just built by `process_create` and is fully
    // populated; switching to it before the one-shot ring-3 entry below is
    // required so the shell's own mappings are live when it starts running.
    unsafe { paging::switch_to_phys(pd_phys) };
    gdt::set_kernel_stack(kernel_stack_top);

    log::info!("boot: entering shell (pid 1)");

    // SAFETY: PID 1 has no prior interrupt context to resume through, so
    // unlike every later context switch it enters ring 3 via the one-shot
    // trampoline rather than the scheduler's iretd-from-ISR path.
    unsafe { exec_run(crate::config::PROG_BASE, crate::config::USER_STACK_TOP) }
}

/// Reads `/BOOT.TXT`, increments the decimal counter it holds (treating a
/// missing or malformed file as 0), and writes it back before the shell
/// starts. Purely diagnostic — lets a headless test harness confirm how
/// many times the image has booted.
fn persist_boot_counter() {
    let mut buf = [0u8; 16];
    let previous = match fs::FS.lock().read(BOOT_COUNTER_PATH, &mut buf) {
        Ok(n) => core::str::from_utf8(&buf[..n]).ok().and_then(|s| s.trim().parse::<u32>().ok()),
        Err(_) => None,
    }
    .unwrap_or(0);

    let next = previous.wrapping_add(1);
    let mut out = heapless_decimal::Buf::new();
    let _ = write!(out, "{}", next);
    let _ = fs::FS.lock().write(BOOT_COUNTER_PATH, out.as_bytes());

    log::info!("boot: boot counter is now {}", next);
}

mod heapless_decimal {
    use core::fmt;

    pub struct Buf {
        data: [u8; 16],
        len: usize,
    }

    impl Buf {
        pub fn new() -> Self {
            Self { data: [0; 16], len: 0 }
        }

        pub fn as_bytes(&self) -> &[u8] {
            &self.data[..self.len]
        }
    }

    impl fmt::Write for Buf {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let bytes = s.as_bytes();
            let n = bytes.len().min(self.data.len() - self.len);
            self.data[self.len..self.len + n].copy_from_slice(&bytes[..n]);
            self.len += n;
            Ok(())
        }
    }
}
