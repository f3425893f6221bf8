//! GDT + TSS: null descriptor, ring-0 code/data, ring-3 code/data, and a
//! TSS descriptor carrying only SS0/ESP0 (the fields the CPU actually reads
//! on a ring-3 -> ring-0 transition).
//!
//! Selector layout and access bytes are taken verbatim from
//! `original_source/kernel/idt.c`'s `gdt_init`.

use core::mem::size_of;

use lazy_static::lazy_static;
use spin::Mutex;
use x86::dtables::{lgdt, DescriptorTablePointer};
use x86::segmentation::SegmentSelector;
use x86::task::load_tr;
use x86::Ring;

pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;
pub const USER_CODE_SELECTOR: u16 = 0x18 | 3;
pub const USER_DATA_SELECTOR: u16 = 0x20 | 3;
const TSS_SELECTOR: u16 = 0x28;

const ACCESS_RING0_CODE: u8 = 0x9A;
const ACCESS_RING0_DATA: u8 = 0x92;
const ACCESS_RING3_CODE: u8 = 0xFA;
const ACCESS_RING3_DATA: u8 = 0xF2;
const ACCESS_TSS: u8 = 0x89;
const GRANULARITY_4K_32BIT: u8 = 0xCF;

const TSS_STACK_SIZE: usize = 4096;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GdtEntry {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    granularity: u8,
    base_high: u8,
}

impl GdtEntry {
    const fn null() -> Self {
        Self { limit_low: 0, base_low: 0, base_mid: 0, access: 0, granularity: 0, base_high: 0 }
    }

    fn new(base: u32, limit: u32, access: u8, granularity: u8) -> Self {
        Self {
            limit_low: (limit & 0xFFFF) as u16,
            base_low: (base & 0xFFFF) as u16,
            base_mid: ((base >> 16) & 0xFF) as u8,
            access,
            granularity: (((limit >> 16) & 0x0F) as u8) | (granularity & 0xF0),
            base_high: ((base >> 24) & 0xFF) as u8,
        }
    }
}

/// Minimal 32-bit TSS: only `ss0`/`esp0` are used, since every interrupt and
/// syscall gate in this kernel is a plain interrupt gate, never a hardware
/// task switch.
#[repr(C, packed)]
struct Tss {
    prev_tss: u32,
    esp0: u32,
    ss0: u16,
    pad0: u16,
    unused: [u32; 22],
    iopb_offset: u16,
    pad1: u16,
}

impl Tss {
    const fn zeroed() -> Self {
        Self {
            prev_tss: 0,
            esp0: 0,
            ss0: 0,
            pad0: 0,
            unused: [0; 22],
            iopb_offset: 0,
            pad1: 0,
        }
    }
}

#[repr(align(16))]
struct TssStack([u8; TSS_STACK_SIZE]);

static TSS_STACK: Mutex<TssStack> = Mutex::new(TssStack([0; TSS_STACK_SIZE]));

lazy_static! {
    static ref TSS: Mutex<Tss> = {
        let mut tss = Tss::zeroed();
        tss.ss0 = KERNEL_DATA_SELECTOR;
        // SAFETY: `TSS_STACK` is a 4KB static, never moved; its address is
        // stable for the kernel's lifetime.
        let stack_top = {
            let stack = TSS_STACK.lock();
            stack.0.as_ptr() as u32 + TSS_STACK_SIZE as u32
        };
        tss.esp0 = stack_top;
        tss.iopb_offset = size_of::<Tss>() as u16;
        Mutex::new(tss)
    };
}

static GDT: Mutex<[GdtEntry; 6]> = Mutex::new([GdtEntry::null(); 6]);

/// Installs the GDT, reloads every segment register, then loads the TSS
/// selector into the task register.
///
/// # Safety
/// Must run once, early in boot, before any ring-3 transition or interrupt
/// gate is exercised.
pub unsafe fn init() {
    lazy_static::initialize(&TSS);

    {
        let mut gdt = GDT.lock();
        gdt[0] = GdtEntry::null();
        gdt[1] = GdtEntry::new(0, 0xFFFFF, ACCESS_RING0_CODE, GRANULARITY_4K_32BIT);
        gdt[2] = GdtEntry::new(0, 0xFFFFF, ACCESS_RING0_DATA, GRANULARITY_4K_32BIT);
        gdt[3] = GdtEntry::new(0, 0xFFFFF, ACCESS_RING3_CODE, GRANULARITY_4K_32BIT);
        gdt[4] = GdtEntry::new(0, 0xFFFFF, ACCESS_RING3_DATA, GRANULARITY_4K_32BIT);
        let tss_base = {
            let tss = TSS.lock();
            &*tss as *const Tss as u32
        };
        let tss_limit = size_of::<Tss>() as u32 - 1;
        gdt[5] = GdtEntry::new(tss_base, tss_limit, ACCESS_TSS, 0);
    }

    let gdt_ptr = {
        let gdt = GDT.lock();
        DescriptorTablePointer::new(&*gdt)
    };

    // SAFETY: `gdt_ptr` references the just-populated static GDT, which
    // outlives this call; reloading every segment register and the task
    // register immediately after `lgdt` is the architecturally required
    // sequence.
    unsafe {
        lgdt(&gdt_ptr);
        reload_segments();
        load_tr(SegmentSelector::new(TSS_SELECTOR >> 3, Ring::Ring0));
    }
}

/// Reloads CS via a far jump and the data segment registers via direct
/// moves, matching `original_source/kernel/idt.c`'s inline asm exactly.
///
/// # Safety
/// Must only run immediately after `lgdt` with the selectors this kernel's
/// GDT actually defines.
#[inline(always)]
unsafe fn reload_segments() {
    // SAFETY: `0x08`/`0x10` are this kernel's fixed ring-0 code/data
    // selectors, valid immediately after the `lgdt` that precedes this call.
    unsafe {
        core::arch::asm!(
            "ljmp $0x08, $1f",
            "1:",
            "mov $0x10, %ax",
            "mov %ax, %ds",
            "mov %ax, %es",
            "mov %ax, %fs",
            "mov %ax, %gs",
            "mov %ax, %ss",
            options(att_syntax, nostack),
        );
    }
}

/// Updates ESP0 in the TSS so the next ring-3 -> ring-0 transition lands on
/// the correct process's kernel stack. Called by the scheduler on every
/// context switch.
pub fn set_kernel_stack(esp0: u32) {
    TSS.lock().esp0 = esp0;
}
