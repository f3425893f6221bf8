//! 256-entry IDT: gates 0-31 are CPU exceptions, 32-47 are the remapped
//! hardware IRQs, and 128 is the `int 0x80` syscall gate. Handler entry
//! points come from the raw trampolines in `interrupt_stubs`.
//!
//! Access bytes (0x8E ring-0-only, 0xEE ring-3-callable) match
//! `original_source/kernel/idt.c`'s `idt_set_gate` exactly.

use x86::dtables::{lidt, DescriptorTablePointer};

use super::gdt::KERNEL_CODE_SELECTOR;
use super::interrupt_stubs::ISR_STUBS;

const ENTRIES: usize = 256;
const GATE_RING0: u8 = 0x8E;
const GATE_RING3: u8 = 0xEE;
const SYSCALL_VECTOR: usize = 128;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self { offset_low: 0, selector: 0, zero: 0, type_attr: 0, offset_high: 0 }
    }

    fn new(handler: u32, type_attr: u8) -> Self {
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector: KERNEL_CODE_SELECTOR,
            zero: 0,
            type_attr,
            offset_high: (handler >> 16) as u16,
        }
    }
}

static mut IDT: [IdtEntry; ENTRIES] = [IdtEntry::missing(); ENTRIES];

/// Populates and loads the IDT.
///
/// # Safety
/// Must run once, early in boot, after `gdt::init` (gates reference the
/// kernel code selector) and before interrupts are enabled.
pub unsafe fn init() {
    // SAFETY: single-threaded boot context; `IDT` is not yet loaded.
    unsafe {
        for vector in 0..48 {
            IDT[vector] = IdtEntry::new(ISR_STUBS[vector] as usize as u32, GATE_RING0);
        }
        IDT[SYSCALL_VECTOR] = IdtEntry::new(ISR_STUBS[48] as usize as u32, GATE_RING3);

        let idt_ptr = DescriptorTablePointer::new(&IDT);
        lidt(&idt_ptr);
    }
}
