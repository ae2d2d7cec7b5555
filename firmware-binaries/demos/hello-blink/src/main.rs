#![no_std]
#![cfg_attr(not(test), no_main)]
// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use panic_halt as _;
use ufmt::uwriteln;

use usart_sys::regs::UsartMmio;
use usart_sys::usart::Usart;

#[cfg(not(test))]
use cortex_m_rt::entry;

const BAUD_RATE: u32 = 115_200;
const DELAY_SPINS: u32 = 308_000;

// PB0 drives the LED; the serial library has no business knowing about it.
const RCC_AHBENR: *mut u32 = 0x4002_1014 as *mut u32;
const GPIOB_MODER: *mut u32 = 0x4800_0400 as *mut u32;
const GPIOB_ODR: *mut u32 = 0x4800_0414 as *mut u32;
const GPIOB_CLOCK_ENABLE: u32 = 1 << 18;
const PB0_OUTPUT_MODE: u32 = 0b01;

fn led_init() {
    unsafe {
        RCC_AHBENR.write_volatile(RCC_AHBENR.read_volatile() | GPIOB_CLOCK_ENABLE);
        GPIOB_MODER.write_volatile(GPIOB_MODER.read_volatile() | PB0_OUTPUT_MODE);
    }
}

fn led_toggle() {
    unsafe {
        GPIOB_ODR.write_volatile(GPIOB_ODR.read_volatile() ^ 1);
    }
}

#[cfg_attr(not(test), entry)]
fn main() -> ! {
    led_init();

    let bus = unsafe { UsartMmio::usart1() };
    let mut usart = Usart::new(bus, BAUD_RATE);

    usart.send(b'H');
    uwriteln!(usart, "ello World!").unwrap();

    loop {
        led_toggle();
        uwriteln!(usart, "Test!").unwrap();
        for _ in 0..DELAY_SPINS {
            cortex_m::asm::nop();
        }
    }
}
