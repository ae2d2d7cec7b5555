// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Register-level access to the USART and the pins it is routed through.
//!
//! The driver never touches memory-mapped state directly; everything goes
//! through the [`UsartBus`] trait so the same code can run against real
//! hardware ([`UsartMmio`]) or a simulated register bank
//! ([`crate::sim::SimUsart`]).

use bitflags::bitflags;

/// The registers the driver touches, named after their STM32F030
/// counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    /// RCC_AHBENR, clock gate for the GPIO bank carrying the TX/RX pins.
    GpioClockEnable,
    /// RCC_APB2ENR, clock gate for the USART peripheral.
    UsartClockEnable,
    /// GPIOA_MODER, pin mode selection.
    PinMode,
    /// GPIOA_AFRL, alternate function selection for pins 0..=7.
    PinAltFunc,
    /// USART_BRR, baud rate divisor (mantissa and fraction).
    BaudRate,
    /// USART_CR1, transmitter/receiver/peripheral enable bits.
    Control,
    /// USART_ISR, status flags.
    Status,
    /// USART_RDR, receive data.
    ReceiveData,
    /// USART_TDR, transmit data.
    TransmitData,
}

impl Reg {
    /// Number of distinct registers, for array-backed implementations.
    pub const COUNT: usize = 9;

    /// Dense index of this register, stable across the [`Reg::COUNT`] range.
    pub fn index(self) -> usize {
        self as usize
    }
}

bitflags! {
    /// USART_CR1 fields used by the driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cr1: u32 {
        /// UE, peripheral enable.
        const ENABLE = 1 << 0;
        /// RE, receiver enable.
        const RECEIVER = 1 << 2;
        /// TE, transmitter enable.
        const TRANSMITTER = 1 << 3;
    }
}

bitflags! {
    /// USART_ISR fields. The driver waits on the transmit/receive flags;
    /// the line-error flags are exposed through
    /// [`crate::usart::Usart::error_flags`] but never acted on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Isr: u32 {
        /// PE, parity error.
        const PARITY_ERROR = 1 << 0;
        /// FE, framing error.
        const FRAMING_ERROR = 1 << 1;
        /// NF, noise detected.
        const NOISE = 1 << 2;
        /// ORE, overrun error.
        const OVERRUN = 1 << 3;
        /// RXNE, receive data register not empty.
        const RX_NOT_EMPTY = 1 << 5;
        /// TC, transmission complete.
        const TX_COMPLETE = 1 << 6;
        /// TXE, transmit data register empty.
        const TX_EMPTY = 1 << 7;
    }
}

/// RCC_AHBENR bit gating the GPIO bank A clock.
pub const GPIOA_CLOCK_ENABLE: u32 = 1 << 17;
/// RCC_APB2ENR bit gating the USART1 clock.
pub const USART1_CLOCK_ENABLE: u32 = 1 << 14;

/// GPIO_MODER value selecting alternate-function mode for one pin.
pub const MODE_ALTERNATE: u32 = 0b10;
/// GPIO_MODER field position for PA2 (USART1_TX).
pub const MODE_TX_POS: u32 = 2 * 2;
/// GPIO_MODER field position for PA3 (USART1_RX).
pub const MODE_RX_POS: u32 = 3 * 2;

/// Alternate function index routing PA2/PA3 to USART1.
pub const ALT_FUNC_USART1: u32 = 0b0001;
/// GPIO_AFRL field position for PA2.
pub const ALT_FUNC_TX_POS: u32 = 2 * 4;
/// GPIO_AFRL field position for PA3.
pub const ALT_FUNC_RX_POS: u32 = 3 * 4;

/// Access to the register set behind the driver.
///
/// Reads take `&mut self` because reading the receive data register has a
/// side effect on real hardware (it clears RXNE), and implementations such
/// as the simulated bank mirror that.
pub trait UsartBus {
    fn read(&mut self, reg: Reg) -> u32;
    fn write(&mut self, reg: Reg, value: u32);

    /// Read-modify-write helper for registers shared with other pins or
    /// peripherals (clock gates, pin mode, alternate function).
    fn modify(&mut self, reg: Reg, f: impl FnOnce(u32) -> u32) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

/// Memory-mapped register access for one USART and its pins.
pub struct UsartMmio {
    rcc: *mut u32,
    gpio: *mut u32,
    usart: *mut u32,
}

/// STM32F030 peripheral base addresses.
const RCC_BASE: usize = 0x4002_1000;
const GPIOA_BASE: usize = 0x4800_0000;
const USART1_BASE: usize = 0x4001_3800;

impl UsartMmio {
    /// Create a new [`UsartMmio`] from peripheral base addresses.
    ///
    /// # Safety
    ///
    /// The addresses MUST BE the bases of memory-mapped RCC, GPIO and USART
    /// blocks with the STM32F030 register layout, and nothing else may
    /// access those blocks concurrently.
    pub const unsafe fn new(rcc_base: usize, gpio_base: usize, usart_base: usize) -> UsartMmio {
        UsartMmio {
            rcc: rcc_base as *mut u32,
            gpio: gpio_base as *mut u32,
            usart: usart_base as *mut u32,
        }
    }

    /// USART1 routed through PA2 (TX) and PA3 (RX).
    ///
    /// # Safety
    ///
    /// Only one live instance may access USART1 at a time, and there must
    /// be no other thread of execution touching these peripherals.
    pub const unsafe fn usart1() -> UsartMmio {
        UsartMmio::new(RCC_BASE, GPIOA_BASE, USART1_BASE)
    }

    fn addr(&self, reg: Reg) -> *mut u32 {
        // Word offsets within each peripheral block.
        unsafe {
            match reg {
                Reg::GpioClockEnable => self.rcc.add(0x14 / 4),
                Reg::UsartClockEnable => self.rcc.add(0x18 / 4),
                Reg::PinMode => self.gpio,
                Reg::PinAltFunc => self.gpio.add(0x20 / 4),
                Reg::Control => self.usart,
                Reg::BaudRate => self.usart.add(0x0C / 4),
                Reg::Status => self.usart.add(0x1C / 4),
                Reg::ReceiveData => self.usart.add(0x24 / 4),
                Reg::TransmitData => self.usart.add(0x28 / 4),
            }
        }
    }
}

impl UsartBus for UsartMmio {
    fn read(&mut self, reg: Reg) -> u32 {
        unsafe { self.addr(reg).read_volatile() }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        unsafe { self.addr(reg).write_volatile(value) }
    }
}
