//! E2E tests for the interactive phase and the full two-phase session.
//!
//! Operator input is fed through a channel in place of stdin; interrupts are
//! plain futures in place of Ctrl-C.

use crate::common::{connect, echo_connection, fast_settings};
use cdc_echo_harness::port::MockSerialPort;
use cdc_echo_harness::session::{run_interactive, SessionSettings, Termination};
use cdc_echo_harness::{run_session, AppError, Console};
use std::future::pending;
use std::time::Duration;
use tokio::sync::mpsc;

/// Feed operator lines with a pause after each, then keep the channel open.
fn script_operator(lines: &[&str], pause: Duration) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    tokio::spawn(async move {
        for line in lines {
            if tx.send(line).await.is_err() {
                return;
            }
            tokio::time::sleep(pause).await;
        }
        tx.closed().await;
    });
    rx
}

#[tokio::test]
async fn test_full_session_scripted_then_interactive() {
    let (mock, conn) = echo_connection();
    let (console, output) = Console::captured();
    let input = script_operator(&["status", "exit"], Duration::from_millis(300));

    let outcome = run_session(conn, fast_settings(), input, pending(), console)
        .await
        .unwrap();

    assert_eq!(outcome.scripted.matched(), 7);
    assert_eq!(outcome.interactive.ended_by, Termination::Sentinel);
    assert_eq!(outcome.interactive.lines_sent, 1);
    assert_eq!(outcome.interactive.lines_received, 1);
    assert_eq!(mock.echo_count(), 8);

    let text = output.contents();
    assert!(text.contains("Device: [Echo #8] status"));
    assert!(text.contains("Type messages and press Enter to send them to the device."));
    assert!(text.ends_with("Serial port closed.\n"));
}

#[tokio::test]
async fn test_every_quit_command_spelling_ends_the_phase() {
    for sentinel in ["quit", "EXIT", "Q", "  exit  "] {
        let (mock, conn) = echo_connection();
        let (console, _) = Console::captured();
        let input = script_operator(&[sentinel], Duration::ZERO);

        let summary = run_interactive(conn, &fast_settings(), input, pending(), console)
            .await
            .unwrap();

        assert_eq!(summary.ended_by, Termination::Sentinel, "{sentinel:?}");
        assert!(mock.get_write_log().is_empty(), "{sentinel:?} was sent");
    }
}

#[tokio::test]
async fn test_lines_resembling_quit_are_sent() {
    let (mock, conn) = echo_connection();
    let (console, _) = Console::captured();
    let input = script_operator(&["quit now", "qq", "q"], Duration::from_millis(50));

    let summary = run_interactive(conn, &fast_settings(), input, pending(), console)
        .await
        .unwrap();

    assert_eq!(summary.lines_sent, 2);
    assert_eq!(
        mock.get_write_log(),
        vec![b"quit now\r\n".to_vec(), b"qq\r\n".to_vec()]
    );
}

#[tokio::test]
async fn test_empty_lines_are_sent_as_bare_terminators() {
    let (mock, conn) = echo_connection();
    let (console, _) = Console::captured();
    let input = script_operator(&["", "q"], Duration::from_millis(50));

    let summary = run_interactive(conn, &fast_settings(), input, pending(), console)
        .await
        .unwrap();

    assert_eq!(summary.lines_sent, 1);
    assert_eq!(mock.get_write_log(), vec![b"\r\n".to_vec()]);
}

#[tokio::test]
async fn test_custom_quit_commands() {
    let (_mock, conn) = echo_connection();
    let (console, _) = Console::captured();
    let settings = SessionSettings {
        quit_commands: vec!["bye".into()],
        ..fast_settings()
    };
    let input = script_operator(&["quit", "BYE"], Duration::from_millis(50));

    let summary = run_interactive(conn, &settings, input, pending(), console)
        .await
        .unwrap();

    assert_eq!(summary.ended_by, Termination::Sentinel);
    assert_eq!(summary.lines_sent, 1);
}

#[tokio::test]
async fn test_interrupt_while_waiting_for_input() {
    let (_mock, conn) = echo_connection();
    let (console, output) = Console::captured();
    let (_tx, rx) = mpsc::channel::<String>(1);

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        run_interactive(
            conn,
            &fast_settings(),
            rx,
            tokio::time::sleep(Duration::from_millis(100)),
            console,
        ),
    )
    .await
    .expect("interrupt ends the phase promptly")
    .unwrap();

    assert_eq!(summary.ended_by, Termination::Interrupted);
    let text = output.contents();
    assert!(text.contains("Exiting interactive mode..."));
    assert!(text.contains("Serial port closed."));
}

#[tokio::test]
async fn test_end_of_input_closes_cleanly() {
    let (_mock, conn) = echo_connection();
    let (console, output) = Console::captured();
    let (tx, rx) = mpsc::channel::<String>(1);
    drop(tx);

    let summary = run_interactive(conn, &fast_settings(), rx, pending(), console)
        .await
        .unwrap();

    assert_eq!(summary.ended_by, Termination::InputClosed);
    assert!(output.contents().contains("Serial port closed."));
}

#[tokio::test]
async fn test_device_output_between_operator_lines() {
    let mock = MockSerialPort::new("MOCK0");
    let conn = connect(&mock);
    let (console, output) = Console::captured();
    let (tx, rx) = mpsc::channel(4);

    let device = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        // The third line arrives in two pieces.
        device.enqueue_read(b"tick 1\r\ntick 2\r\ntick");
        tokio::time::sleep(Duration::from_millis(20)).await;
        device.enqueue_read(b" 3\r\n");
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = tx.send("q".to_string()).await;
    });

    let summary = run_interactive(conn, &fast_settings(), rx, pending(), console)
        .await
        .unwrap();

    assert_eq!(summary.lines_received, 3);
    let text = output.contents();
    let first = text.find("Device: tick 1").unwrap();
    let second = text.find("Device: tick 2").unwrap();
    let third = text.find("Device: tick 3").unwrap();
    assert!(first < second && second < third);
}

#[tokio::test]
async fn test_invalid_utf8_from_device_is_shown_lossily() {
    let mock = MockSerialPort::new("MOCK0");
    let conn = connect(&mock);
    let (console, output) = Console::captured();
    let (tx, rx) = mpsc::channel(4);

    let device = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        device.enqueue_read(b"bad \xFF byte\r\n");
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = tx.send("q".to_string()).await;
    });

    run_interactive(conn, &fast_settings(), rx, pending(), console)
        .await
        .unwrap();

    assert!(output.contents().contains("Device: bad \u{FFFD} byte"));
}

#[tokio::test]
async fn test_write_to_unplugged_device_is_fatal() {
    let (mock, conn) = echo_connection();
    let (console, output) = Console::captured();
    let (tx, rx) = mpsc::channel(4);

    let device = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        device.disconnect();
        let _ = tx.send("anyone there?".to_string()).await;
        tx.closed().await;
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        run_interactive(conn, &fast_settings(), rx, pending(), console),
    )
    .await
    .expect("write fault ends the phase promptly")
    .unwrap_err();

    assert!(matches!(err, AppError::Io(_)));
    let text = output.contents();
    assert!(text.contains("Write error"));
    assert!(text.contains("Serial port closed."));
}

#[tokio::test]
async fn test_line_split_across_read_windows_is_shown_once() {
    let mock = MockSerialPort::new("MOCK0");
    let conn = connect(&mock);
    let (console, output) = Console::captured();
    let (tx, rx) = mpsc::channel(4);

    let device = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        device.enqueue_read(b"[Echo #1] hel");
        // Longer than the 150 ms read window.
        tokio::time::sleep(Duration::from_millis(400)).await;
        device.enqueue_read(b"lo\r\n");
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = tx.send("q".to_string()).await;
    });

    let summary = run_interactive(conn, &fast_settings(), rx, pending(), console)
        .await
        .unwrap();

    assert_eq!(summary.lines_received, 1);
    let text = output.contents();
    assert!(text.contains("Device: [Echo #1] hello"), "{text}");
    assert!(!text.contains("Device: lo"));
}

#[tokio::test]
async fn test_unplugged_device_is_reported_once() {
    let (mock, conn) = echo_connection();
    let (console, output) = Console::captured();
    let (tx, rx) = mpsc::channel(4);

    let device = mock.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        device.disconnect();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = tx.send("quit".to_string()).await;
    });

    let summary = run_interactive(conn, &fast_settings(), rx, pending(), console)
        .await
        .unwrap();

    assert_eq!(summary.ended_by, Termination::Sentinel);
    let text = output.contents();
    assert_eq!(text.matches("Read error").count(), 1, "{text}");
    assert!(text.contains("device disconnected"));
}
