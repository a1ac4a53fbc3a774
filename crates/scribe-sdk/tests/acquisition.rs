//! 采集状态机端到端测试

mod common;

use approx::assert_abs_diff_eq;
use common::{base_frame, planar_session};
use scribe_sdk::driver::{FailureHandlerRegistry, StartupChoice, TolerateTimeouts};
use scribe_sdk::link::{MockDevice, MockLink, MockResponse};
use scribe_sdk::prelude::*;
use scribe_sdk::protocol::{FrameMeta, JointSubset};
use scribe_sdk::ResultCode;
use std::sync::Arc;

#[test]
fn test_foreground_quarter_turn_moves_tip() {
    let mut session = planar_session();
    session.link_mut().push_frame(base_frame(4096, 0));

    let result = session.request_foreground(CalcStrategy::Tip6Dof).unwrap();
    assert_eq!(result, Acquisition::Updated);
    assert_abs_diff_eq!(session.joints().deg[0], 90.0, epsilon = 1e-9);

    let tip = session.tip_position();
    assert_abs_diff_eq!(tip.x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tip.y, 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(tip.z, 0.0, epsilon = 1e-9);
}

#[test]
fn test_units_change_between_samples() {
    let mut session = planar_session();
    session.link_mut().push_frame(base_frame(0, 0));
    session.request_foreground(CalcStrategy::Tip3Dof).unwrap();
    assert_abs_diff_eq!(session.tip_position().x, 10.0, epsilon = 1e-9);

    session.set_length_units(LengthUnits::Millimeters).unwrap();
    session.link_mut().push_frame(base_frame(0, 0));
    session.request_foreground(CalcStrategy::Tip3Dof).unwrap();
    assert_abs_diff_eq!(session.tip_position().x, 254.0, epsilon = 1e-9);
}

#[test]
fn test_background_then_motion() {
    let mut session = planar_session();

    session.request_background(CalcStrategy::Tip3Dof).unwrap();
    session.link_mut().push_response(MockResponse::Pending);
    assert_eq!(session.poll_background().unwrap(), Acquisition::NoPacketYet);
    session.link_mut().push_frame(base_frame(8192, 0));
    assert_eq!(session.poll_background().unwrap(), Acquisition::Updated);
    assert_abs_diff_eq!(session.tip_position().x, -10.0, epsilon = 1e-9);

    session.start_motion(CalcStrategy::Joints3, 2, 10, true).unwrap();
    assert_eq!(
        session.link().motion_configs()[0].request.joints,
        JointSubset::Three
    );
    session.link_mut().push_frame(FrameMeta::with_encoders(
        JointSubset::Three,
        [4096, 0, 0, 0, 0, 0],
        0,
    ));
    assert_eq!(session.poll_motion().unwrap(), Acquisition::Updated);
    assert_abs_diff_eq!(session.joints().deg[0], 90.0, epsilon = 1e-9);
    session.end_motion_stream();
    assert_eq!(session.mode(), AcquisitionMode::Idle);
}

#[test]
fn test_background_request_with_lost_send() {
    let mut session = planar_session();
    let fallback = session.handlers().handler(FailureKind::Timeout).unwrap();
    session
        .handlers_mut()
        .set_handler(FailureKind::Timeout, Arc::new(TolerateTimeouts::new(3, fallback)));
    session.link_mut().fail_next_send(LinkError::Timeout);

    session.request_background(CalcStrategy::Tip3Dof).unwrap();
    assert_eq!(
        session.mode(),
        AcquisitionMode::BackgroundPending(CalcStrategy::Tip3Dof)
    );
    session.link_mut().push_frame(base_frame(4096, 0));
    assert!(session.poll_background().unwrap().is_updated());
    assert_eq!(session.link().sent_requests().len(), 1);
    assert_abs_diff_eq!(session.tip_position().y, 10.0, epsilon = 1e-9);
}

#[test]
fn test_tolerated_timeouts_then_frame() {
    let mut session = planar_session();
    let fallback = session.handlers().handler(FailureKind::Timeout).unwrap();
    session
        .handlers_mut()
        .set_handler(FailureKind::Timeout, Arc::new(TolerateTimeouts::new(2, fallback)));

    // 超时被吞掉，报告为尚无数据
    for _ in 0..2 {
        session.link_mut().push_response(MockResponse::Timeout);
        assert_eq!(
            session.request_foreground(CalcStrategy::Tip3Dof).unwrap(),
            Acquisition::NoPacketYet
        );
    }
    // 成功的一帧清零计数
    session.link_mut().push_frame(base_frame(0, 0));
    assert!(
        session
            .request_foreground(CalcStrategy::Tip3Dof)
            .unwrap()
            .is_updated()
    );
    session.link_mut().push_response(MockResponse::Timeout);
    assert_eq!(
        session.request_foreground(CalcStrategy::Tip3Dof).unwrap(),
        Acquisition::NoPacketYet
    );
}

#[test]
fn test_no_handler_is_terminal() {
    let mut session = ArmSessionBuilder::new(MockLink::new(MockDevice::standard()))
        .handlers(FailureHandlerRegistry::new())
        .connect(1, 9600)
        .unwrap();
    session.link_mut().push_response(MockResponse::BadPacket);
    let err = session.request_foreground(CalcStrategy::Tip3Dof).unwrap_err();
    assert_eq!(err.code(), ResultCode::BadPacket);
    assert_eq!(u8::from(err.code()), 3);
}

struct Reconfigure;

impl RecoveryPrompt for Reconfigure {
    fn replacement_port(&self, _port: u32, _baud: u32) -> Option<u32> {
        None
    }
    fn flush_after_bad_packet(&self, _port: u32, _baud: u32) -> bool {
        true
    }
    fn startup_choice(&self, _kind: FailureKind, _port: u32, _baud: u32) -> StartupChoice {
        StartupChoice::Reconfigure {
            port: 4,
            baud: 57600,
        }
    }
    fn confirm_restart(&self, _port: u32, _baud: u32) -> bool {
        false
    }
}

#[test]
fn test_connect_recovers_with_new_port() {
    let mut link = MockLink::new(MockDevice::standard());
    link.fail_next_connect(LinkError::NoDeviceResponse);
    let session = ArmSessionBuilder::new(link)
        .simple_handlers(Arc::new(Reconfigure))
        .connect(1, 9600)
        .unwrap();
    assert!(session.is_connected());
    assert_eq!(session.link().port(), 4);
    assert_eq!(session.link().baud(), 57600);
}
