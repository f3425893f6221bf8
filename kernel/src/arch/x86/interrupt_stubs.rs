//! Raw asm trampolines: one stub per interrupt vector that normalizes the
//! CPU-pushed frame (padding a dummy error code where the CPU doesn't push
//! one), saves the remaining general/segment registers, calls into
//! `interrupts::isr_handler`, and restores — possibly onto a *different*
//! stack, when `isr_handler` returns a non-zero ESP to switch to (the
//! preemption path).
//!
//! Also home to `exec_run`, the one-shot trampoline that drops the CPU to
//! ring 3 for the first time a process runs.
//!
//! This is necessarily raw assembly: Rust's `extern "x86-interrupt"` ABI
//! does not support returning a replacement stack pointer to drive a
//! context switch, which the scheduler design here depends on.

use core::arch::global_asm;

macro_rules! isr_no_err {
    ($num:literal) => {
        concat!(
            ".global isr",
            $num,
            "\n",
            "isr",
            $num,
            ":\n",
            "    push 0\n",
            "    push ",
            $num,
            "\n",
            "    jmp isr_common_stub\n",
        )
    };
}

macro_rules! isr_err {
    ($num:literal) => {
        concat!(
            ".global isr",
            $num,
            "\n",
            "isr",
            $num,
            ":\n",
            "    push ",
            $num,
            "\n",
            "    jmp isr_common_stub\n",
        )
    };
}

global_asm!(
    ".section .text",
    ".align 4",
    "isr_common_stub:",
    "    pushad",
    "    push ds",
    "    push es",
    "    push fs",
    "    push gs",
    "    mov ax, 0x10",
    "    mov ds, ax",
    "    mov es, ax",
    "    mov fs, ax",
    "    mov gs, ax",
    "    push esp",
    "    call isr_handler",
    "    add esp, 4",
    "    test eax, eax",
    "    jz 1f",
    "    mov esp, eax",
    "1:",
    "    pop gs",
    "    pop fs",
    "    pop es",
    "    pop ds",
    "    popad",
    "    add esp, 8",
    "    iretd",
    isr_no_err!(0),
    isr_no_err!(1),
    isr_no_err!(2),
    isr_no_err!(3),
    isr_no_err!(4),
    isr_no_err!(5),
    isr_no_err!(6),
    isr_no_err!(7),
    isr_err!(8),
    isr_no_err!(9),
    isr_err!(10),
    isr_err!(11),
    isr_err!(12),
    isr_err!(13),
    isr_err!(14),
    isr_no_err!(15),
    isr_no_err!(16),
    isr_err!(17),
    isr_no_err!(18),
    isr_no_err!(19),
    isr_no_err!(20),
    isr_no_err!(21),
    isr_no_err!(22),
    isr_no_err!(23),
    isr_no_err!(24),
    isr_no_err!(25),
    isr_no_err!(26),
    isr_no_err!(27),
    isr_no_err!(28),
    isr_no_err!(29),
    isr_no_err!(30),
    isr_no_err!(31),
    isr_no_err!(32),
    isr_no_err!(33),
    isr_no_err!(34),
    isr_no_err!(35),
    isr_no_err!(36),
    isr_no_err!(37),
    isr_no_err!(38),
    isr_no_err!(39),
    isr_no_err!(40),
    isr_no_err!(41),
    isr_no_err!(42),
    isr_no_err!(43),
    isr_no_err!(44),
    isr_no_err!(45),
    isr_no_err!(46),
    isr_no_err!(47),
    isr_no_err!(128),
);

global_asm!(
    ".section .text",
    ".global exec_run",
    "exec_run:",
    "    mov eax, [esp + 4]", // entry eip
    "    mov ecx, [esp + 8]", // user esp
    "    mov dx, 0x20 | 3",   // user data selector, RPL 3
    "    mov ds, dx",
    "    mov es, dx",
    "    mov fs, dx",
    "    mov gs, dx",
    "    push 0x20 | 3", // ss
    "    push ecx",      // esp
    "    pushfd",
    "    push 0x18 | 3", // cs
    "    push eax",      // eip
    "    iretd",
);

extern "C" {
    fn isr0();
    fn isr1();
    fn isr2();
    fn isr3();
    fn isr4();
    fn isr5();
    fn isr6();
    fn isr7();
    fn isr8();
    fn isr9();
    fn isr10();
    fn isr11();
    fn isr12();
    fn isr13();
    fn isr14();
    fn isr15();
    fn isr16();
    fn isr17();
    fn isr18();
    fn isr19();
    fn isr20();
    fn isr21();
    fn isr22();
    fn isr23();
    fn isr24();
    fn isr25();
    fn isr26();
    fn isr27();
    fn isr28();
    fn isr29();
    fn isr30();
    fn isr31();
    fn isr32();
    fn isr33();
    fn isr34();
    fn isr35();
    fn isr36();
    fn isr37();
    fn isr38();
    fn isr39();
    fn isr40();
    fn isr41();
    fn isr42();
    fn isr43();
    fn isr44();
    fn isr45();
    fn isr46();
    fn isr47();
    fn isr128();

    /// Drops to ring 3 for the first time a process is scheduled.
    /// `entry_eip` and `user_esp` are both user virtual addresses.
    pub fn exec_run(entry_eip: u32, user_esp: u32) -> !;
}

/// Indexed by interrupt vector 0-47, plus index 48 for the syscall gate
/// (vector 128) — `idt::init` uses this table to fill every gate.
pub static ISR_STUBS: [unsafe extern "C" fn(); 49] = [
    isr0, isr1, isr2, isr3, isr4, isr5, isr6, isr7, isr8, isr9, isr10, isr11, isr12, isr13, isr14,
    isr15, isr16, isr17, isr18, isr19, isr20, isr21, isr22, isr23, isr24, isr25, isr26, isr27,
    isr28, isr29, isr30, isr31, isr32, isr33, isr34, isr35, isr36, isr37, isr38, isr39, isr40,
    isr41, isr42, isr43, isr44, isr45, isr46, isr47, isr128,
];
