//! E2E tests for the scripted phase.
//!
//! These tests verify that every default payload, including multi-byte text
//! and shell-special characters, reaches the device intact and that the
//! report reflects what came back.

use crate::common::{connect, echo_connection, fast_settings};
use cdc_echo_harness::port::{decode_line, MockSerialPort};
use cdc_echo_harness::session::{
    parse_echo, run_scripted, ExchangeOutcome, SessionSettings, DEFAULT_PAYLOADS,
};
use cdc_echo_harness::Console;
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

#[test]
fn test_default_payloads_all_echo() {
    let (mock, mut conn) = echo_connection();
    let (console, output) = Console::captured();

    let report = run_scripted(&mut conn, &fast_settings(), &console).unwrap();

    assert_eq!(report.exchanges.len(), DEFAULT_PAYLOADS.len());
    assert_eq!(report.matched(), DEFAULT_PAYLOADS.len());
    assert!(report.counters_strictly_increasing());
    assert_eq!(mock.echo_count(), 7);

    let text = output.contents();
    for (i, payload) in DEFAULT_PAYLOADS.iter().enumerate() {
        assert!(text.contains(&format!("Sending message {}: {payload}", i + 1)));
        assert!(text.contains(&format!("Received: [Echo #{}] {payload}", i + 1)));
    }
}

#[test]
fn test_payload_bytes_on_the_wire() {
    let (mock, mut conn) = echo_connection();
    let (console, _) = Console::captured();

    run_scripted(&mut conn, &fast_settings(), &console).unwrap();

    let writes = mock.get_write_log();
    assert_eq!(writes.len(), 7);
    for (written, payload) in writes.iter().zip(DEFAULT_PAYLOADS) {
        let mut expected = payload.as_bytes().to_vec();
        expected.extend_from_slice(b"\r\n");
        assert_eq!(written, &expected);
    }
    // Multi-byte payload: 6 CJK characters are 18 UTF-8 bytes.
    assert_eq!(writes[5].len(), 18 + 2);
}

#[test]
fn test_sent_byte_counts_are_reported() {
    let (_mock, mut conn) = echo_connection();
    let (console, output) = Console::captured();

    run_scripted(&mut conn, &fast_settings(), &console).unwrap();

    let text = output.contents();
    // "Hello from PC!" plus CR LF.
    assert!(text.contains("Sent 16 bytes"));
    assert!(text.contains("Sent 20 bytes"));
}

#[test]
fn test_device_already_counting_still_matches() {
    let (mock, mut conn) = echo_connection();
    let (console, _) = Console::captured();

    // Device echoed three lines before the run began.
    let warmup = SessionSettings {
        payloads: vec!["a".into(), "b".into(), "c".into()],
        ..fast_settings()
    };
    run_scripted(&mut conn, &warmup, &console).unwrap();

    let report = run_scripted(&mut conn, &fast_settings(), &console).unwrap();

    assert_eq!(report.matched(), 7);
    let counters: Vec<u32> = report.echo_counters().collect();
    assert_eq!(counters, (4..=10).collect::<Vec<_>>());
    assert_eq!(mock.echo_count(), 10);
}

#[test]
fn test_silent_device_times_out_per_message() {
    let mock = MockSerialPort::new("MOCK0");
    let mut conn = connect(&mock);
    let (console, output) = Console::captured();
    let settings = SessionSettings {
        payloads: vec!["one".into(), "two".into(), "three".into()],
        ..fast_settings()
    };

    let started = Instant::now();
    let report = run_scripted(&mut conn, &settings, &console).unwrap();
    let elapsed = started.elapsed();

    assert!(report
        .exchanges
        .iter()
        .all(|x| x.outcome == ExchangeOutcome::Timeout));
    assert_eq!(report.matched(), 0);
    // Three read windows of 150 ms each, no retries.
    assert!(elapsed >= Duration::from_millis(450), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    assert_eq!(
        output
            .contents()
            .matches("No response received (timeout)")
            .count(),
        3
    );
}

#[test]
fn test_unexpected_response_is_reported_not_fatal() {
    let mock = MockSerialPort::new("MOCK0");
    let mut conn = connect(&mock);
    let (console, output) = Console::captured();
    mock.enqueue_read(b"ERR busy\r\n");
    let settings = SessionSettings {
        payloads: vec!["ping".into(), "pong".into()],
        ..fast_settings()
    };

    let report = run_scripted(&mut conn, &settings, &console).unwrap();

    assert_eq!(
        report.exchanges[0].outcome,
        ExchangeOutcome::Unexpected {
            received: "ERR busy".into()
        }
    );
    assert_eq!(report.exchanges[1].outcome, ExchangeOutcome::Timeout);
    assert!(output.contents().contains("Received: ERR busy"));
}

#[test]
fn test_inter_message_delay_is_respected() {
    let (_mock, mut conn) = echo_connection();
    let (console, _) = Console::captured();
    let settings = SessionSettings {
        payloads: vec!["x".into(), "y".into(), "z".into()],
        inter_message_delay: Duration::from_millis(100),
        ..SessionSettings::default()
    };

    let started = Instant::now();
    run_scripted(&mut conn, &settings, &console).unwrap();

    // Delay between messages only, not after the last one.
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[test]
fn test_echo_of_special_payload_parses() {
    let line = decode_line("[Echo #7] Special chars: !@#$%^&*()\r\n".as_bytes());
    let echo = parse_echo(&line).unwrap();
    assert_eq!(echo.counter, 7);
    assert_eq!(echo.payload, DEFAULT_PAYLOADS[6]);
}
