//! COM1 serial port: kernel diagnostic output plus an RX loopback used as a
//! second, headless-testable input source by `drivers::keyboard`.

use core::fmt::{self, Write};

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

const COM1_BASE: u16 = 0x3F8;

lazy_static! {
    static ref COM1: Mutex<SerialPort> = {
        // SAFETY: 0x3F8 is the standard COM1 I/O base on PC-compatible
        // hardware; nothing else in the kernel touches this port range.
        let mut port = unsafe { SerialPort::new(COM1_BASE) };
        port.init();
        Mutex::new(port)
    };
}

pub fn init() {
    lazy_static::initialize(&COM1);
    log::info!("serial: COM1 initialized at 0x{:x}", COM1_BASE);
}

/// Mirrors one byte of console output to COM1, e.g. for `write(1, ...)` so
/// headless test runners can capture everything the VGA screen shows.
pub fn write_byte(b: u8) {
    COM1.lock().send(b);
}

pub fn print_fmt(args: fmt::Arguments) {
    // Locking COM1 here races only with other kernel contexts; the syscall
    // and IRQ paths that call into this always run with interrupts disabled
    // except across the explicit `hlt` windows that never touch serial I/O.
    COM1.lock().write_fmt(args).expect("serial write failed");
}

/// Non-blocking poll of the receive buffer; used both for the panic mirror
/// and for the headless RX loopback path in `drivers::keyboard`.
pub fn try_read_byte() -> Option<u8> {
    COM1.lock().try_receive().ok()
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => ($crate::drivers::serial::print_fmt(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}
