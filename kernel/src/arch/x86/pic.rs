//! 8259 PIC remap: IRQ 0-15 moved from their default (exception-colliding)
//! vectors 8-15/112-119 to 32-47, per `original_source/kernel/idt.c`'s
//! `pic_remap`. Uses the `pic8259` crate instead of hand-rolled ICW
//! sequencing since it implements the identical remap this kernel needs.

use pic8259::ChainedPics;
use spin::Mutex;

pub const PIC1_OFFSET: u8 = 32;
pub const PIC2_OFFSET: u8 = 40;

pub const IRQ_TIMER: u8 = PIC1_OFFSET;
pub const IRQ_KEYBOARD: u8 = PIC1_OFFSET + 1;

static PICS: Mutex<ChainedPics> =
    // SAFETY: offsets place IRQ vectors at 32-47, outside the CPU exception
    // range (0-31) and outside the syscall gate (128).
    unsafe { Mutex::new(ChainedPics::new(PIC1_OFFSET, PIC2_OFFSET)) };

/// Remaps the PIC and masks every IRQ except the timer and keyboard.
///
/// # Safety
/// Must run once, early in boot, before interrupts are enabled.
pub unsafe fn init() {
    // SAFETY: standard one-time PIC initialization sequence.
    unsafe {
        PICS.lock().initialize();
        // Mask everything, then unmask IRQ0 (PIT) and IRQ1 (keyboard) —
        // mirrors idt.c's `pit_init` unmasking 0xFC on the master's data port.
        PICS.lock().write_masks(0xFC, 0xFF);
    }
}

/// Sends an end-of-interrupt for `vector`, required before the handler for
/// this vector can fire again.
///
/// # Safety
/// `vector` must be a vector this kernel actually dispatched from the PIC
/// (32-47); sending an EOI for anything else desynchronizes the PIC.
pub unsafe fn send_eoi(vector: u8) {
    // SAFETY: caller guarantees `vector` came from a real PIC-dispatched IRQ.
    unsafe { PICS.lock().notify_end_of_interrupt(vector) };
}
