// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Polling-mode USART driver.
//!
//! All blocking operations busy-spin on a status flag with no timeout and
//! no yield; a silent or disconnected line blocks the caller forever. That
//! is the intended failure model for a bare-metal driver with no OS
//! underneath, not an oversight.

use crate::regs::{
    Cr1, Isr, Reg, UsartBus, ALT_FUNC_RX_POS, ALT_FUNC_TX_POS, ALT_FUNC_USART1,
    GPIOA_CLOCK_ENABLE, MODE_ALTERNATE, MODE_RX_POS, MODE_TX_POS, USART1_CLOCK_ENABLE,
};

pub mod log;

/// The fixed 8 MHz reference clock feeding the baud rate generator.
/// Other clock sources are not supported.
pub const CLOCK_HZ: u32 = 8_000_000;

/// Returned by [`Usart::try_receive`] when no byte is pending.
pub struct ReceiveBufferEmpty;

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Split a baud rate into the divisor mantissa and 4-bit fraction written
/// to the baud rate register: `divisor = round(CLOCK_HZ / baud_rate)`,
/// mantissa `divisor / 16`, fraction `divisor % 16`.
pub fn baud_divisor(baud_rate: u32) -> (u32, u32) {
    let divisor = (CLOCK_HZ + baud_rate / 2) / baud_rate;
    (divisor / 16, divisor % 16)
}

/// One USART channel. Owns its register bus; all I/O goes through the
/// channel that was bound at construction.
pub struct Usart<B> {
    bus: B,
}

impl<B: UsartBus> Usart<B> {
    /// Bind a channel and run the full initialization sequence.
    ///
    /// `baud_rate` must be positive and small enough that the divisor is
    /// non-zero; a zero divisor leaves the peripheral misconfigured and is
    /// not detected, matching the hardware contract.
    pub fn new(bus: B, baud_rate: u32) -> Usart<B> {
        let mut usart = Usart { bus };
        usart.configure(baud_rate);
        usart
    }

    /// Re-run the initialization sequence. The steps are ordered: each
    /// register is only touched after the clock feeding it is enabled.
    /// Re-running with the same baud rate leaves the same configuration.
    pub fn configure(&mut self, baud_rate: u32) {
        // 1. Clock the GPIO bank carrying the TX/RX pins.
        self.bus
            .modify(Reg::GpioClockEnable, |v| v | GPIOA_CLOCK_ENABLE);

        // 2. Switch both pins to alternate-function mode.
        self.bus.modify(Reg::PinMode, |v| {
            v | (MODE_ALTERNATE << MODE_TX_POS) | (MODE_ALTERNATE << MODE_RX_POS)
        });

        // 3. Route them to the USART.
        self.bus.modify(Reg::PinAltFunc, |v| {
            v | (ALT_FUNC_USART1 << ALT_FUNC_TX_POS) | (ALT_FUNC_USART1 << ALT_FUNC_RX_POS)
        });

        // 4. Clock the USART itself.
        self.bus
            .modify(Reg::UsartClockEnable, |v| v | USART1_CLOCK_ENABLE);

        // 5. Baud rate divisor, mantissa in bits 4.., fraction in bits 0..4.
        let (mantissa, fraction) = baud_divisor(baud_rate);
        self.bus.write(Reg::BaudRate, (mantissa << 4) | fraction);

        // 6. Enable transmitter, receiver and the peripheral.
        self.bus.write(
            Reg::Control,
            (Cr1::TRANSMITTER | Cr1::RECEIVER | Cr1::ENABLE).bits(),
        );
    }

    fn status(&mut self) -> Isr {
        Isr::from_bits_truncate(self.bus.read(Reg::Status))
    }

    /// Hardware line-error flags (overrun, framing, noise, parity).
    ///
    /// The driver itself never inspects or clears these; receive errors
    /// are silently ignored. This accessor exists so callers that care
    /// can at least observe them.
    pub fn error_flags(&mut self) -> Isr {
        self.status()
            & (Isr::OVERRUN | Isr::FRAMING_ERROR | Isr::NOISE | Isr::PARITY_ERROR)
    }

    /// Send one byte. Spins until the transmit register is free, writes
    /// the byte, then spins again until it has been fully shifted out, so
    /// returning means the byte is on the wire.
    pub fn send(&mut self, byte: u8) {
        while !self.status().contains(Isr::TX_EMPTY) {}
        self.bus.write(Reg::TransmitData, byte as u32);
        while !self.status().contains(Isr::TX_COMPLETE) {}
    }

    /// Receive one byte, spinning until one arrives.
    pub fn receive(&mut self) -> u8 {
        loop {
            if let Ok(byte) = self.try_receive() {
                return byte;
            }
        }
    }

    /// Receive one byte if one is already pending, without blocking.
    pub fn try_receive(&mut self) -> Result<u8, ReceiveBufferEmpty> {
        if self.status().contains(Isr::RX_NOT_EMPTY) {
            Ok(self.bus.read(Reg::ReceiveData) as u8)
        } else {
            Err(ReceiveBufferEmpty)
        }
    }

    /// Write the textual representation of `value` in `base` (2..=16).
    ///
    /// A minus sign is emitted for negative values in base 10 only; other
    /// bases print the two's-complement bit pattern. The conversion buffer
    /// holds a sign plus 32 base-2 digits, the worst case over the
    /// supported base range.
    pub fn write_int(&mut self, value: i32, base: u32) {
        debug_assert!((2..=16).contains(&base));

        let negative = base == 10 && value < 0;
        let mut magnitude = if negative {
            value.unsigned_abs()
        } else {
            value as u32
        };

        let mut buf = [0u8; 33];
        let mut pos = buf.len();
        loop {
            pos -= 1;
            buf[pos] = DIGITS[(magnitude % base) as usize];
            magnitude /= base;
            if magnitude == 0 {
                break;
            }
        }
        if negative {
            pos -= 1;
            buf[pos] = b'-';
        }

        for &b in &buf[pos..] {
            self.send(b);
        }
    }

    /// Write exactly `digit_count` uppercase hex digits of `value`, most
    /// significant first, `digit_count` in [1, 8].
    ///
    /// If `value` has set bits beyond the requested width, every digit is
    /// replaced with a `.` placeholder instead of truncating silently.
    pub fn write_hex(&mut self, value: u32, digit_count: u32) {
        debug_assert!((1..=8).contains(&digit_count));

        // At 8 digits nothing can be out of range, which also keeps the
        // shift below 32.
        let oversized = digit_count < 8 && value >> (digit_count * 4) != 0;

        for i in (0..digit_count).rev() {
            if oversized {
                self.send(b'.');
                continue;
            }
            let nibble = ((value >> (i * 4)) & 0xF) as u8;
            let digit = if nibble < 10 {
                b'0' + nibble
            } else {
                b'A' + (nibble - 10)
            };
            self.send(digit);
        }
    }

    /// Read one line into `buffer`, echoing as the user types.
    ///
    /// Blocks until a carriage return (13) arrives; the terminator is
    /// consumed but not stored. Printable bytes (0x20..=0x7E) are stored
    /// and echoed while there is room for one more byte plus the NUL
    /// terminator; once the buffer is full they are silently dropped.
    /// A delete byte (127) is echoed and removes the last stored byte.
    /// Other control bytes are ignored. The buffer is NUL-terminated at
    /// the stored length, which is returned (terminator not counted).
    pub fn read_line(&mut self, buffer: &mut [u8]) -> usize {
        assert!(
            !buffer.is_empty(),
            "read_line needs room for the NUL terminator"
        );

        let mut len = 0;
        loop {
            let byte = self.receive();
            match byte {
                13 => break,
                0x20..=0x7E if len + 1 < buffer.len() => {
                    buffer[len] = byte;
                    len += 1;
                    self.send(byte);
                }
                // 0x7F renders as a proper delete on the terminal.
                0x7F if len > 0 => {
                    self.send(byte);
                    len -= 1;
                }
                _ => {}
            }
        }
        buffer[len] = 0;
        len
    }

    /// The underlying register bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable access to the underlying register bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

impl<B: UsartBus> ufmt::uWrite for Usart<B> {
    type Error = ();

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        for b in s.bytes() {
            self.send(b);
        }
        Ok(())
    }
}

impl<B: UsartBus> core::fmt::Write for Usart<B> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for b in s.bytes() {
            self.send(b);
        }
        Ok(())
    }
}
