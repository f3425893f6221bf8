//! PIT channel 0, mode 3 (square wave), programmed for 100Hz — the
//! scheduler's preemption tick. Divisor and command byte match
//! `original_source/kernel/idt.c`'s `pit_init` exactly.

use x86::io::outb;

use crate::config::PIT_DIVISOR;

const CMD_PORT: u16 = 0x43;
const CHANNEL0_PORT: u16 = 0x40;
const CMD_CH0_LOHI_MODE3: u8 = 0x36;

/// Programs PIT channel 0 to fire at `config::PIT_HZ`.
///
/// # Safety
/// Must run once, after `pic::init`, before interrupts are enabled.
pub unsafe fn init() {
    // SAFETY: standard PIT channel-0 programming sequence: command byte,
    // then the 16-bit divisor as low byte then high byte.
    unsafe {
        outb(CMD_PORT, CMD_CH0_LOHI_MODE3);
        outb(CHANNEL0_PORT, (PIT_DIVISOR & 0xFF) as u8);
        outb(CHANNEL0_PORT, (PIT_DIVISOR >> 8) as u8);
    }
    log::info!("pit: channel 0 programmed, divisor={}", PIT_DIVISOR);
}
