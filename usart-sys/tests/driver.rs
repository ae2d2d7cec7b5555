// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use log::Log;
use proptest::prelude::*;
use test_strategy::proptest;

use usart_sys::regs::{
    Cr1, Reg, ALT_FUNC_RX_POS, ALT_FUNC_TX_POS, ALT_FUNC_USART1, GPIOA_CLOCK_ENABLE,
    MODE_ALTERNATE, MODE_RX_POS, MODE_TX_POS, USART1_CLOCK_ENABLE,
};
use usart_sys::sim::SimUsart;
use usart_sys::usart::log::SerialLogger;
use usart_sys::usart::{baud_divisor, Usart, CLOCK_HZ};

fn sim_usart(baud_rate: u32) -> Usart<SimUsart> {
    Usart::new(SimUsart::new(), baud_rate)
}

fn transmitted_string(usart: &Usart<SimUsart>) -> String {
    String::from_utf8(usart.bus().transmitted().to_vec()).unwrap()
}

#[proptest]
fn divisor_tracks_reference_clock(#[strategy(300u32..=500_000u32)] baud_rate: u32) {
    // Below 16 the mantissa would be zero and the peripheral cannot
    // divide; such rates are out of contract.
    prop_assume!(CLOCK_HZ / baud_rate >= 16);

    let (mantissa, fraction) = baud_divisor(baud_rate);
    let reconstructed = mantissa * 16 * baud_rate + fraction * baud_rate;
    prop_assert!(CLOCK_HZ.abs_diff(reconstructed) <= baud_rate);
}

#[test]
fn divisor_matches_reference_table() {
    // Known-good divisors for an 8 MHz clock.
    assert_eq!(baud_divisor(9_600), (52, 1));
    assert_eq!(baud_divisor(115_200), (4, 5));
    assert_eq!(baud_divisor(460_800), (1, 1));
    assert_eq!(baud_divisor(500_000), (1, 0));
}

#[test]
fn init_writes_expected_register_image() {
    let usart = sim_usart(9_600);
    let sim = usart.bus();

    assert_eq!(sim.reg(Reg::GpioClockEnable), GPIOA_CLOCK_ENABLE);
    assert_eq!(
        sim.reg(Reg::PinMode),
        (MODE_ALTERNATE << MODE_TX_POS) | (MODE_ALTERNATE << MODE_RX_POS)
    );
    assert_eq!(
        sim.reg(Reg::PinAltFunc),
        (ALT_FUNC_USART1 << ALT_FUNC_TX_POS) | (ALT_FUNC_USART1 << ALT_FUNC_RX_POS)
    );
    assert_eq!(sim.reg(Reg::UsartClockEnable), USART1_CLOCK_ENABLE);
    assert_eq!(sim.reg(Reg::BaudRate), (52 << 4) | 1);
    assert_eq!(
        sim.reg(Reg::Control),
        (Cr1::TRANSMITTER | Cr1::RECEIVER | Cr1::ENABLE).bits()
    );
}

#[test]
fn reconfiguring_with_same_baud_is_idempotent() {
    let mut usart = sim_usart(115_200);

    let watched = [
        Reg::GpioClockEnable,
        Reg::UsartClockEnable,
        Reg::PinMode,
        Reg::PinAltFunc,
        Reg::BaudRate,
        Reg::Control,
    ];
    let before: Vec<u32> = watched.iter().map(|&r| usart.bus().reg(r)).collect();

    usart.configure(115_200);

    let after: Vec<u32> = watched.iter().map(|&r| usart.bus().reg(r)).collect();
    assert_eq!(before, after);
}

#[test]
fn last_configure_call_wins() {
    let mut usart = sim_usart(9_600);
    usart.configure(115_200);
    assert_eq!(usart.bus().reg(Reg::BaudRate), (4 << 4) | 5);
}

#[test]
fn send_transmits_in_order() {
    let mut usart = sim_usart(115_200);
    usart.send(b'H');
    usart.send(b'i');
    assert_eq!(usart.bus().transmitted(), b"Hi");
}

#[test]
fn empty_string_transmits_nothing() {
    let mut usart = sim_usart(115_200);
    core::fmt::Write::write_str(&mut usart, "").unwrap();
    assert_eq!(usart.bus().transmitted(), b"");
}

#[test]
fn string_write_goes_byte_by_byte() {
    let mut usart = sim_usart(115_200);
    core::fmt::Write::write_str(&mut usart, "Test!\n").unwrap();
    assert_eq!(usart.bus().transmitted(), b"Test!\n");
}

fn hex_output(value: u32, digit_count: u32) -> String {
    let mut usart = sim_usart(115_200);
    usart.write_hex(value, digit_count);
    transmitted_string(&usart)
}

#[test]
fn hex_pads_to_requested_width() {
    assert_eq!(hex_output(0xAB, 4), "00AB");
    assert_eq!(hex_output(0xF, 1), "F");
    assert_eq!(hex_output(0xDEADBEEF, 8), "DEADBEEF");
}

#[test]
fn hex_oversized_value_prints_placeholders() {
    assert_eq!(hex_output(0x1ABCD, 4), "....");
    assert_eq!(hex_output(0x10, 1), ".");
}

fn int_output(value: i32, base: u32) -> String {
    let mut usart = sim_usart(115_200);
    usart.write_int(value, base);
    transmitted_string(&usart)
}

#[test]
fn int_formats_across_bases() {
    assert_eq!(int_output(0, 10), "0");
    assert_eq!(int_output(1234, 10), "1234");
    assert_eq!(int_output(-42, 10), "-42");
    assert_eq!(int_output(255, 16), "ff");
    assert_eq!(int_output(5, 2), "101");
}

#[test]
fn int_non_decimal_bases_print_twos_complement() {
    assert_eq!(int_output(-1, 16), "ffffffff");
    assert_eq!(
        int_output(i32::MIN, 2),
        "10000000000000000000000000000000"
    );
}

#[test]
fn int_extremes_fit_the_conversion_buffer() {
    assert_eq!(int_output(i32::MIN, 10), "-2147483648");
    assert_eq!(int_output(i32::MAX, 10), "2147483647");
    assert_eq!(int_output(-1, 2), "11111111111111111111111111111111");
}

#[test]
fn poll_returns_nothing_then_the_pending_byte() {
    let mut usart = sim_usart(115_200);
    assert!(usart.try_receive().is_err());

    usart.bus_mut().feed(b"z");
    assert_eq!(usart.try_receive().ok(), Some(b'z'));
    assert!(usart.try_receive().is_err());
}

#[test]
fn receive_returns_queued_bytes_in_order() {
    let mut usart = sim_usart(115_200);
    usart.bus_mut().feed(b"ok");
    assert_eq!(usart.receive(), b'o');
    assert_eq!(usart.receive(), b'k');
}

#[test]
fn read_line_applies_backspace_edits() {
    let mut usart = sim_usart(115_200);
    usart.bus_mut().feed(b"ab\x7Fc\r");

    let mut buf = [0u8; 8];
    let len = usart.read_line(&mut buf);

    assert_eq!(len, 2);
    assert_eq!(&buf[..2], b"ac");
    assert_eq!(buf[2], 0);
    // Every accepted byte is echoed, including the delete itself.
    assert_eq!(usart.bus().transmitted(), b"ab\x7Fc");
}

#[test]
fn read_line_drops_input_once_full() {
    let mut usart = sim_usart(115_200);
    usart.bus_mut().feed(b"abcd\r");

    let mut buf = [0u8; 3];
    let len = usart.read_line(&mut buf);

    assert_eq!(len, 2);
    assert_eq!(&buf[..2], b"ab");
    assert_eq!(buf[2], 0);
    // The dropped bytes are not echoed either.
    assert_eq!(usart.bus().transmitted(), b"ab");
}

#[test]
fn read_line_backspace_still_works_when_full() {
    let mut usart = sim_usart(115_200);
    usart.bus_mut().feed(b"abcd\x7Fe\r");

    let mut buf = [0u8; 3];
    let len = usart.read_line(&mut buf);

    assert_eq!(len, 2);
    assert_eq!(&buf[..2], b"ae");
    assert_eq!(usart.bus().transmitted(), b"ab\x7Fe");
}

#[test]
fn read_line_ignores_other_control_bytes() {
    let mut usart = sim_usart(115_200);
    usart.bus_mut().feed(b"a\tb\x07\r");

    let mut buf = [0u8; 8];
    let len = usart.read_line(&mut buf);

    assert_eq!(len, 2);
    assert_eq!(&buf[..2], b"ab");
    assert_eq!(usart.bus().transmitted(), b"ab");
}

#[test]
fn read_line_backspace_on_empty_line_is_ignored() {
    let mut usart = sim_usart(115_200);
    usart.bus_mut().feed(b"\x7Fa\r");

    let mut buf = [0u8; 8];
    let len = usart.read_line(&mut buf);

    assert_eq!(len, 1);
    assert_eq!(&buf[..1], b"a");
    assert_eq!(usart.bus().transmitted(), b"a");
}

#[test]
fn read_line_empty_line_returns_zero() {
    let mut usart = sim_usart(115_200);
    usart.bus_mut().feed(b"\r");

    let mut buf = [0u8; 8];
    let len = usart.read_line(&mut buf);

    assert_eq!(len, 0);
    assert_eq!(buf[0], 0);
    assert_eq!(usart.bus().transmitted(), b"");
}

#[test]
fn error_flags_are_clear_on_the_simulated_bank() {
    let mut usart = sim_usart(115_200);
    assert!(usart.error_flags().is_empty());
}

#[test]
#[should_panic]
fn hex_rejects_zero_digit_count() {
    let mut usart = sim_usart(115_200);
    usart.write_hex(0x1, 0);
}

fn info_record(message: core::fmt::Arguments) -> log::Record {
    log::Record::builder()
        .args(message)
        .level(log::Level::Info)
        .file(Some("demo.rs"))
        .line(Some(7))
        .build()
}

#[test]
fn logger_writes_formatted_records_to_its_port() {
    let logger = SerialLogger::new(log::LevelFilter::Trace, log::LevelFilter::Off);
    logger.set_port(sim_usart(115_200));

    logger.log(&info_record(format_args!("Test!")));

    let port = logger.into_port().unwrap();
    let out = String::from_utf8(port.bus().transmitted().to_vec()).unwrap();
    assert_eq!(out, "INFO | Test!\n");
}

#[test]
fn logger_source_location_follows_its_filter() {
    let logger = SerialLogger::new(log::LevelFilter::Trace, log::LevelFilter::Trace);
    logger.set_port(sim_usart(115_200));

    logger.log(&info_record(format_args!("Test!")));

    let port = logger.into_port().unwrap();
    let out = String::from_utf8(port.bus().transmitted().to_vec()).unwrap();
    assert_eq!(out, "INFO | demo.rs:7 - Test!\n");
}

#[test]
fn logger_prefixes_can_be_suppressed() {
    let logger = SerialLogger::new(log::LevelFilter::Off, log::LevelFilter::Off);
    logger.set_port(sim_usart(115_200));

    logger.log(&info_record(format_args!("Test!")));

    let port = logger.into_port().unwrap();
    let out = String::from_utf8(port.bus().transmitted().to_vec()).unwrap();
    assert_eq!(out, "Test!\n");
}
