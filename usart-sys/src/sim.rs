// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! A simulated register bank for driving the driver without hardware.
//!
//! Transmit is modelled as always ready: TXE and TC read as set, so writes
//! complete without spinning and land in an inspectable log. Receive is a
//! bounded queue; RXNE reads as set while the queue is non-empty and a
//! data-register read pops one byte, mirroring the hardware side effect.

use heapless::{Deque, Vec};

use crate::regs::{Isr, Reg, UsartBus};

const RX_CAPACITY: usize = 64;
const TX_CAPACITY: usize = 1024;

/// In-memory stand-in for the USART register set.
pub struct SimUsart {
    regs: [u32; Reg::COUNT],
    rx: Deque<u8, RX_CAPACITY>,
    tx: Vec<u8, TX_CAPACITY>,
}

impl SimUsart {
    pub fn new() -> SimUsart {
        SimUsart {
            regs: [0; Reg::COUNT],
            rx: Deque::new(),
            tx: Vec::new(),
        }
    }

    /// Queue bytes for the driver to receive, in order.
    ///
    /// Panics if the queue overflows its fixed capacity; feed less than
    /// 64 bytes between reads.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.rx.push_back(b).is_err() {
                panic!("simulated receive queue overflow");
            }
        }
    }

    /// Everything the driver transmitted so far.
    pub fn transmitted(&self) -> &[u8] {
        &self.tx
    }

    /// Clear the transmit log, keeping register state and pending input.
    pub fn clear_transmitted(&mut self) {
        self.tx.clear();
    }

    /// Raw backing value of a register, without the synthesized status
    /// bits. Useful for checking the image the init sequence leaves behind.
    pub fn reg(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    fn status(&self) -> u32 {
        let mut flags = Isr::TX_EMPTY | Isr::TX_COMPLETE;
        if !self.rx.is_empty() {
            flags |= Isr::RX_NOT_EMPTY;
        }
        flags.bits()
    }
}

impl Default for SimUsart {
    fn default() -> Self {
        SimUsart::new()
    }
}

impl UsartBus for SimUsart {
    fn read(&mut self, reg: Reg) -> u32 {
        match reg {
            Reg::Status => self.status(),
            Reg::ReceiveData => self.rx.pop_front().unwrap_or(0) as u32,
            _ => self.regs[reg.index()],
        }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        match reg {
            Reg::TransmitData => {
                if self.tx.push(value as u8).is_err() {
                    panic!("simulated transmit log overflow");
                }
            }
            _ => self.regs[reg.index()] = value,
        }
    }
}
