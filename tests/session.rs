//! Façade tests against a scripted transport.
//!
//! These cover the command sequences each protocol family puts on the wire,
//! the remote-mode bracket, and the recovery paths for odd transfers.

mod common;

use std::time::Duration;

use common::{fast_config, sample_frame, Call, MockTransport};
use ut2000_linux::protocol::*;
use ut2000_linux::{
    Channel, ChannelReading, Colormap, Device, DeviceModel, DeviceState, FrameError, ScopeError,
};

fn device(model: DeviceModel, transport: MockTransport) -> Device<MockTransport> {
    Device::for_model(model, transport, fast_config()).expect("construction")
}

/// Attach, acquire, detach, letting `?` skip the explicit detach on failure.
fn acquire(device: &mut Device<MockTransport>) -> Result<(ChannelReading, ChannelReading), ScopeError> {
    let mut session = device.attach()?;
    let readings = session.get_samples()?;
    session.detach()?;
    Ok(readings)
}

// ── Construction ──────────────────────────────────────────────────────

#[test]
fn control_model_runs_connect_handshake() {
    let dev = device(DeviceModel::Ut2025B, MockTransport::default());
    assert_eq!(
        dev.transport().calls,
        vec![
            Call::ControlOut { request_type: 0x42, request: 0xB1, value: 0x2C, index: 0 },
            Call::ControlIn { request_type: 0xC2, request: 0xB2, length: 8 },
        ]
    );
    assert_eq!(dev.state(), DeviceState::Connected);
}

#[test]
fn bulk_model_needs_no_handshake() {
    let dev = device(DeviceModel::Ut2052Cel, MockTransport::default());
    assert!(dev.transport().calls.is_empty());
}

// ── Attach / detach ───────────────────────────────────────────────────

#[test]
fn control_attach_sends_priming() {
    let mut dev = device(DeviceModel::Ut2102C, MockTransport::default());
    let session = dev.attach().unwrap();
    session.detach().unwrap();

    let mut expected = vec![CMD_PRIME_A, CMD_ENTER_REMOTE];
    expected.extend([CMD_PRIME_A; 10]);
    expected.extend([CMD_PRIME_C; 10]);
    expected.push(CMD_LEAVE_REMOTE);
    assert_eq!(dev.transport().commands(), expected);
    assert_eq!(dev.state(), DeviceState::Connected);
}

#[test]
fn bulk_attach_writes_to_bulk_out() {
    let mut dev = device(DeviceModel::Ut2052Cel, MockTransport::default());
    {
        let _session = dev.attach().unwrap();
    }
    assert_eq!(
        dev.transport().calls,
        vec![
            Call::Write { endpoint: 0x02, data: vec![0xF0] },
            Call::Write { endpoint: 0x02, data: vec![0xF1] },
        ]
    );
}

#[test]
fn priming_failure_leaves_remote_mode_once() {
    // Handshake, enter remote, then the third priming code fails.
    let mut dev = device(DeviceModel::Ut2025B, MockTransport::default().failing_control_out(5));
    let err = dev.attach().err().expect("priming failure");

    assert!(matches!(err, ScopeError::Transport(rusb::Error::Pipe)));
    assert_eq!(
        dev.transport().commands(),
        vec![CMD_PRIME_A, CMD_ENTER_REMOTE, CMD_PRIME_A, CMD_PRIME_A, CMD_PRIME_A, CMD_LEAVE_REMOTE]
    );
    assert_eq!(dev.state(), DeviceState::Connected);
}

#[test]
fn read_failure_still_detaches_once() {
    let mut dev = device(DeviceModel::Ut2025B, MockTransport::with_reads([Err(rusb::Error::Pipe)]));
    let err = acquire(&mut dev).unwrap_err();

    assert!(matches!(err, ScopeError::Transport(rusb::Error::Pipe)));
    assert_eq!(dev.transport().count(CMD_LEAVE_REMOTE), 1);
    assert_eq!(dev.state(), DeviceState::Connected);
}

#[test]
fn explicit_detach_is_not_repeated_on_drop() {
    let mut dev = device(DeviceModel::Ut2025B, MockTransport::with_reads([Ok(sample_frame(1024))]));
    acquire(&mut dev).unwrap();
    assert_eq!(dev.transport().count(CMD_LEAVE_REMOTE), 1);
}

// ── Screenshots ───────────────────────────────────────────────────────

#[test]
fn control_screenshot_strips_transfer_header() {
    // 512 header bytes in front of an all-zero framebuffer, split across
    // the primary read and the header probe.
    let mut wire = vec![0xFFu8; 512];
    wire.extend(vec![0u8; 38400]);
    let probe = wire.split_off(38400);

    let mut dev = device(DeviceModel::Ut2025B, MockTransport::with_reads([Ok(wire), Ok(probe)]));
    let colormap = Colormap::default();
    let mut session = dev.attach().unwrap();
    let image = session.get_screenshot(&colormap).unwrap();
    session.detach().unwrap();

    assert_eq!((image.width(), image.height()), (320, 240));
    assert!(image.pixels().iter().all(|&p| p == colormap.color(0)));

    let calls = &dev.transport().calls;
    let e2 = calls
        .iter()
        .position(|c| *c == Call::ControlOut { request_type: 0x42, request: 0xB1, value: 0xE2, index: 0 })
        .expect("screenshot command");
    assert_eq!(
        calls[e2 + 1],
        Call::ControlOut { request_type: 0x42, request: 0xB0, value: 0, index: 38 }
    );
    assert_eq!(
        dev.transport().reads(),
        vec![
            &Call::Read { endpoint: 0x82, length: 38400, timeout: SCREENSHOT_TIMEOUT },
            &Call::Read { endpoint: 0x82, length: 512, timeout: HEADER_PROBE_TIMEOUT },
        ]
    );
}

#[test]
fn header_probe_timeout_keeps_primary_buffer() {
    let mut framebuffer = vec![0u8; 48000];
    framebuffer[0] = 0xF0;

    let mut dev = device(DeviceModel::Ut2052Cel, MockTransport::with_reads([Ok(framebuffer.clone())]));
    let mut session = dev.attach().unwrap();
    let frame = session.get_raw_screenshot().unwrap();
    drop(session);

    assert_eq!(frame.as_bytes(), framebuffer.as_slice());
    assert_eq!(dev.transport().commands(), vec![0xF0, 0xE2, 0xF1]);
}

#[test]
fn header_probe_errors_other_than_timeout_propagate() {
    let mut dev = device(
        DeviceModel::Ut2052Cel,
        MockTransport::with_reads([Ok(vec![0u8; 48000]), Err(rusb::Error::NoDevice)]),
    );
    let mut session = dev.attach().unwrap();
    let err = session.get_screenshot(&Colormap::default()).unwrap_err();
    drop(session);

    assert!(matches!(err, ScopeError::Transport(rusb::Error::NoDevice)));
    assert_eq!(dev.transport().count(CMD_LEAVE_REMOTE), 1);
}

#[test]
fn truncated_screenshot_is_malformed() {
    let mut dev = device(DeviceModel::Ut2052Cel, MockTransport::with_reads([Ok(vec![0u8; 1000])]));
    let mut session = dev.attach().unwrap();
    let err = session.get_screenshot(&Colormap::default()).unwrap_err();

    assert!(matches!(
        err,
        ScopeError::MalformedFrame(FrameError::Length { got: 1000, .. })
    ));
}

// ── Samples ───────────────────────────────────────────────────────────

#[test]
fn control_samples_sequence_and_decode() {
    let mut frame = sample_frame(1024);
    frame[516] = 0;
    let mut dev = device(DeviceModel::Ut2025B, MockTransport::with_reads([Ok(frame)]));
    let (ch1, ch2) = acquire(&mut dev).unwrap();

    assert_eq!(ch1.channel, Channel::Ch1);
    assert_eq!(ch1.raw_samples.len(), 250);
    assert_eq!(ch1.sample_voltages[0], -5.0);
    assert_eq!(ch1.sample_voltages[1], 0.0);
    assert_eq!(ch2.raw_samples.len(), 250);
    assert!(ch1.active && ch2.active);

    let commands = dev.transport().commands();
    let e1 = commands.iter().position(|&c| c == CMD_GET_SAMPLES).unwrap();
    assert_eq!(&commands[e1 - 20..e1 - 10], &[CMD_PRIME_B; 10]);
    assert_eq!(&commands[e1 - 10..e1], &[CMD_PRIME_C; 10]);
    assert!(dev.transport().calls.contains(&Call::ControlOut {
        request_type: 0x42,
        request: 0xB0,
        value: 1,
        index: 2
    }));
    assert_eq!(
        dev.transport().reads(),
        vec![&Call::Read { endpoint: 0x82, length: 2560, timeout: DATA_TIMEOUT }]
    );
}

#[test]
fn control_sample_acquisition_wire_order() {
    let mut dev = device(DeviceModel::Ut2025B, MockTransport::with_reads([Ok(sample_frame(1024))]));
    acquire(&mut dev).unwrap();

    let mut expected = vec![CMD_PRIME_A, CMD_ENTER_REMOTE];
    expected.extend([CMD_PRIME_A; 10]);
    expected.extend([CMD_PRIME_C; 10]);
    expected.extend([CMD_PRIME_B; 10]);
    expected.extend([CMD_PRIME_C; 10]);
    expected.extend([CMD_GET_SAMPLES, CMD_LEAVE_REMOTE]);
    assert_eq!(dev.transport().commands(), expected);
}

#[test]
fn control_samples_unexpected_length_is_not_retried() {
    let mut dev = device(DeviceModel::Ut2025B, MockTransport::with_reads([Ok(sample_frame(704))]));
    let err = acquire(&mut dev).unwrap_err();

    assert!(matches!(err, ScopeError::MalformedFrame(FrameError::Length { got: 704, .. })));
    assert_eq!(dev.transport().count(CMD_GET_SAMPLES), 1);
    assert_eq!(dev.transport().count(CMD_LEAVE_REMOTE), 1);
}

#[test]
fn short_read_retries_whole_acquisition() {
    let mut dev = device(
        DeviceModel::Ut2052Cel,
        MockTransport::with_reads([Ok(vec![0u8; 100]), Ok(sample_frame(704))]),
    );
    let (ch1, ch2) = acquire(&mut dev).unwrap();

    assert_eq!(dev.transport().count(CMD_GET_SAMPLES), 2);
    assert_eq!(ch1.raw_samples.len(), 300);
    assert_eq!(ch2.raw_samples.len(), 300);
    // Fixture samples are 128 and this model's zero reference is 130.
    assert!((ch1.sample_voltages[0] - (-2.0 / 256.0 * 10.0)).abs() < 1e-12);
}

#[test]
fn retry_ceiling_ends_in_retry_exhausted() {
    let mut config = fast_config();
    config.max_retries = 3;
    let reads = (0..10).map(|_| Ok(vec![0u8; 100]));
    let mut dev = Device::for_model(DeviceModel::Ut2052Cel, MockTransport::with_reads(reads), config).unwrap();

    let err = acquire(&mut dev).unwrap_err();
    assert!(matches!(err, ScopeError::RetryExhausted { attempts: 3, last_len: 100 }));
    assert_eq!(dev.transport().count(CMD_GET_SAMPLES), 3);
    assert_eq!(dev.transport().count(CMD_LEAVE_REMOTE), 1);
}

#[test]
fn custom_timeouts_reach_the_transport() {
    let config = fast_config().with_data_timeout(Duration::from_millis(750));
    let mut dev = Device::for_model(
        DeviceModel::Ut2052Cel,
        MockTransport::with_reads([Ok(sample_frame(704))]),
        config,
    )
    .unwrap();
    acquire(&mut dev).unwrap();

    assert_eq!(
        dev.transport().reads(),
        vec![&Call::Read { endpoint: 0x82, length: 2560, timeout: Duration::from_millis(750) }]
    );
}
