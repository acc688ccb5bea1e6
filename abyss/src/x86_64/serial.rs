//! 16550 UART on the first serial port.
use super::pio::Pio;

const COM1: u16 = 0x3f8;
const LINE_STATUS: u16 = 5;
const TX_EMPTY: u8 = 0x20;

/// Write-only handle to COM1.
pub struct Serial {
    base: u16,
}

impl Serial {
    /// Handle to COM1 as left configured by the firmware.
    pub const fn com1() -> Self {
        Serial { base: COM1 }
    }

    /// Program 9600 baud, 8N1, FIFO off.
    ///
    /// # Safety
    /// Nothing else may be driving the port.
    pub unsafe fn init(&self) {
        Pio::new(self.base + 1).write_u8(0);
        Pio::new(self.base + 3).write_u8(0x80);
        Pio::new(self.base).write_u8((115200 / 9600) as u8);
        Pio::new(self.base + 1).write_u8(0);
        Pio::new(self.base + 3).write_u8(0x03);
        Pio::new(self.base + 2).write_u8(0);
        Pio::new(self.base + 4).write_u8(0);
    }

    fn put(&self, b: u8) {
        for _ in 0..12800 {
            if Pio::new(self.base + LINE_STATUS).read_u8() & TX_EMPTY != 0 {
                break;
            }
            // delay
            Pio::new(0x84).read_u8();
        }
        Pio::new(self.base).write_u8(b);
    }
}

impl core::fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        s.bytes().for_each(|b| self.put(b));
        Ok(())
    }
}
