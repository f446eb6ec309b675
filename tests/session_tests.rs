//! Integration tests for the device session over the mock backend.
//!
//! Covers the transfer lifecycle (start / poll / cancel), timeout handling,
//! line-state tracking, parameter configuration, break pulses, and
//! line-coding dispatch - everything the session does short of touching real
//! hardware.

use std::time::Duration;

use cdc_link::port::{
    DataBits, FlowControl, LineCoding, LineCodingHandler, MockCdcPort, Parity, PortError,
    SerialOptions, StopBits,
};
use cdc_link::session::{DeviceSession, Direction, SessionError, Timeouts, TransferStatus};
use pretty_assertions::assert_eq;

fn mock_session() -> (MockCdcPort, DeviceSession) {
    let mock = MockCdcPort::new("MOCK0");
    let session = DeviceSession::from_port(Box::new(mock.clone()));
    (mock, session)
}

async fn wait_write(session: &mut DeviceSession) -> Result<usize, SessionError> {
    loop {
        match session.poll_write()? {
            TransferStatus::Complete(n) => return Ok(n),
            TransferStatus::Pending => tokio::time::sleep(Duration::from_millis(2)).await,
        }
    }
}

async fn wait_read(session: &mut DeviceSession) -> Result<Vec<u8>, SessionError> {
    loop {
        match session.poll_read()? {
            TransferStatus::Complete(data) => return Ok(data),
            TransferStatus::Pending => tokio::time::sleep(Duration::from_millis(2)).await,
        }
    }
}

// ============================================================================
// Transfer lifecycle
// ============================================================================

#[tokio::test]
async fn write_completes_and_reaches_device() {
    let (mock, mut session) = mock_session();

    session.start_write(b"AT\r\n").unwrap();
    assert!(session.has_pending_write());

    let written = wait_write(&mut session).await.unwrap();
    assert_eq!(written, 4);
    assert!(!session.has_pending_write());
    assert_eq!(mock.write_log(), vec![b"AT\r\n".to_vec()]);
}

#[tokio::test]
async fn read_returns_queued_prefix() {
    let (mock, mut session) = mock_session();
    mock.enqueue_read(b"Hello, World!");

    session.start_read(8).unwrap();
    let data = wait_read(&mut session).await.unwrap();

    assert_eq!(data, b"Hello, W".to_vec());
    assert_eq!(mock.available_bytes(), 5);
}

#[tokio::test]
async fn read_and_write_outstanding_concurrently() {
    let (mock, mut session) = mock_session();
    mock.enqueue_read(b"pong");

    session.start_read(4).unwrap();
    session.start_write(b"ping").unwrap();
    assert!(session.has_pending_read());
    assert!(session.has_pending_write());

    let written = wait_write(&mut session).await.unwrap();
    let data = wait_read(&mut session).await.unwrap();
    assert_eq!(written, 4);
    assert_eq!(data, b"pong".to_vec());
}

#[tokio::test]
async fn second_start_in_same_direction_is_rejected() {
    let (mock, mut session) = mock_session();
    mock.enqueue_read(b"x");

    session.start_write(b"one").unwrap();
    assert!(matches!(
        session.start_write(b"two"),
        Err(SessionError::TransferInFlight(Direction::Write))
    ));

    session.start_read(1).unwrap();
    assert!(matches!(
        session.start_read(1),
        Err(SessionError::TransferInFlight(Direction::Read))
    ));
}

#[tokio::test]
async fn poll_without_transfer_fails_uniformly() {
    let (_mock, mut session) = mock_session();

    assert!(matches!(
        session.poll_write(),
        Err(SessionError::NoTransferPending(Direction::Write))
    ));
    assert!(matches!(
        session.poll_read(),
        Err(SessionError::NoTransferPending(Direction::Read))
    ));
}

#[tokio::test]
async fn zero_capacity_read_completes_empty() {
    let (mock, mut session) = mock_session();
    mock.enqueue_read(b"untouched");

    session.start_read(0).unwrap();
    let data = wait_read(&mut session).await.unwrap();

    assert!(data.is_empty());
    assert_eq!(mock.available_bytes(), 9);
}

// ============================================================================
// Timeouts
// ============================================================================

#[tokio::test]
async fn read_timeout_completes_with_no_data() {
    let (mock, mut session) = mock_session();
    mock.set_should_timeout(true);

    session.start_read(16).unwrap();
    let data = wait_read(&mut session).await.unwrap();
    assert!(data.is_empty());
}

#[tokio::test]
async fn read_with_empty_queue_completes_with_no_data() {
    let (_mock, mut session) = mock_session();

    session.start_read(16).unwrap();
    let data = wait_read(&mut session).await.unwrap();
    assert!(data.is_empty());
}

#[tokio::test]
async fn write_timeout_is_an_error() {
    let (mock, mut session) = mock_session();
    mock.set_should_timeout(true);

    session.start_write(b"doomed").unwrap();
    let result = wait_write(&mut session).await;
    assert!(matches!(
        result,
        Err(SessionError::Port(PortError::Timeout(_)))
    ));
    assert!(!session.has_pending_write());
}

#[tokio::test]
async fn set_timeouts_reaches_backend() {
    let (mock, mut session) = mock_session();
    let timeouts = Timeouts {
        read: Duration::from_millis(250),
        write: Duration::from_millis(750),
    };

    session.set_timeouts(timeouts).unwrap();
    assert_eq!(session.timeouts(), timeouts);
    // The session handle carries the read deadline
    assert_eq!(mock.timeout(), Duration::from_millis(250));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn cancel_clears_both_pending_records() {
    let (mock, mut session) = mock_session();
    mock.enqueue_read(b"data");

    session.start_read(4).unwrap();
    session.start_write(b"data").unwrap();
    session.cancel();

    assert!(!session.has_pending_read());
    assert!(!session.has_pending_write());
    assert!(matches!(
        session.poll_read(),
        Err(SessionError::NoTransferPending(Direction::Read))
    ));
    assert!(matches!(
        session.poll_write(),
        Err(SessionError::NoTransferPending(Direction::Write))
    ));
}

#[tokio::test]
async fn cancel_with_nothing_pending_is_a_no_op() {
    let (_mock, mut session) = mock_session();
    session.cancel();
    assert!(!session.has_pending_read());
    assert!(!session.has_pending_write());
}

#[tokio::test]
async fn transfer_can_restart_after_cancel() {
    let (mock, mut session) = mock_session();

    session.start_write(b"first").unwrap();
    session.cancel();

    session.start_write(b"second").unwrap();
    let written = wait_write(&mut session).await.unwrap();
    assert_eq!(written, 6);
    assert!(mock.write_log().contains(&b"second".to_vec()));
}

// ============================================================================
// Line state and break
// ============================================================================

#[tokio::test]
async fn control_lines_forwarded_and_tracked() {
    let (mock, mut session) = mock_session();

    session.set_dtr(true).unwrap();
    session.set_rts(true).unwrap();
    assert!(mock.dtr());
    assert!(mock.rts());

    session.set_control_lines(false, true).unwrap();
    let lines = session.control_lines();
    assert!(!lines.dtr);
    assert!(lines.rts);
    assert!(!mock.dtr());
    assert!(mock.rts());
}

#[tokio::test]
async fn break_pulse_asserts_then_clears() {
    let (mock, mut session) = mock_session();

    session.send_break(Duration::from_millis(5)).await.unwrap();

    assert!(!mock.break_active());
    assert_eq!(mock.break_pulses(), 1);
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn configure_applies_and_reads_back() {
    let (mock, mut session) = mock_session();
    let options = SerialOptions {
        baud_rate: 115200,
        data_bits: DataBits::Seven,
        parity: Parity::Even,
        stop_bits: StopBits::Two,
        flow_control: FlowControl::Software,
    };

    session.configure(&options).unwrap();
    assert_eq!(session.options().unwrap(), options);
    assert_eq!(mock.applied_options(), options);
}

#[tokio::test]
async fn flow_control_changes_only_that_parameter() {
    let (mock, mut session) = mock_session();

    session.set_flow_control(FlowControl::Hardware).unwrap();

    let applied = mock.applied_options();
    assert_eq!(applied.flow_control, FlowControl::Hardware);
    assert_eq!(applied.baud_rate, SerialOptions::default().baud_rate);
}

#[tokio::test]
async fn clear_buffers_discards_unread_input() {
    let (mock, mut session) = mock_session();
    mock.enqueue_read(b"stale");

    session.clear_buffers().unwrap();
    assert!(mock.was_cleared());
    assert_eq!(session.bytes_to_read(), Some(0));
}

// ============================================================================
// Line coding
// ============================================================================

struct RecordingHandler {
    current: LineCoding,
}

impl LineCodingHandler for RecordingHandler {
    fn set_line_coding(&mut self, coding: &LineCoding) -> Result<(), PortError> {
        self.current = *coding;
        Ok(())
    }

    fn line_coding(&mut self) -> Result<LineCoding, PortError> {
        Ok(self.current)
    }
}

#[tokio::test]
async fn line_coding_unsupported_without_handler() {
    let (_mock, mut session) = mock_session();
    let coding = LineCoding {
        baud_rate: 9600,
        data_bits: DataBits::Eight,
        parity: Parity::None,
        stop_bits: StopBits::One,
    };

    assert!(matches!(
        session.set_line_coding(&coding),
        Err(SessionError::Port(PortError::Unsupported(_)))
    ));
    assert!(matches!(
        session.line_coding(),
        Err(SessionError::Port(PortError::Unsupported(_)))
    ));
}

#[tokio::test]
async fn line_coding_routed_through_handler() {
    let (_mock, mut session) = mock_session();
    session.set_line_coding_handler(Box::new(RecordingHandler {
        current: LineCoding {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        },
    }));

    let coding = LineCoding {
        baud_rate: 230400,
        data_bits: DataBits::Seven,
        parity: Parity::Odd,
        stop_bits: StopBits::Two,
    };
    session.set_line_coding(&coding).unwrap();
    assert_eq!(session.line_coding().unwrap(), coding);

    session.clear_line_coding_handler();
    assert!(session.line_coding().is_err());
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// A read completes with exactly the queued prefix, bounded by the
        /// requested capacity; the remainder stays queued.
        #[test]
        fn read_yields_bounded_prefix(
            data in proptest::collection::vec(any::<u8>(), 0..512),
            capacity in 0usize..256,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (mock, mut session) = mock_session();
                mock.enqueue_read(&data);

                session.start_read(capacity).unwrap();
                let received = wait_read(&mut session).await.unwrap();

                let expected_len = capacity.min(data.len());
                prop_assert_eq!(received.len(), expected_len);
                prop_assert_eq!(&received[..], &data[..expected_len]);
                prop_assert_eq!(mock.available_bytes(), data.len() - expected_len);
                Ok(())
            })?;
        }

        /// Whatever the session writes arrives at the device intact.
        #[test]
        fn write_delivers_payload_intact(
            data in proptest::collection::vec(any::<u8>(), 1..512),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (mock, mut session) = mock_session();

                session.start_write(&data).unwrap();
                let written = wait_write(&mut session).await.unwrap();

                prop_assert_eq!(written, data.len());
                prop_assert_eq!(mock.write_log()[0].clone(), data);
                Ok(())
            })?;
        }
    }
}
