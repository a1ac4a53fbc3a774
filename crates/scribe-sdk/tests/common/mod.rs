//! 集成测试共用的脚本化设备

#![allow(dead_code)]

use scribe_sdk::link::{MockDevice, MockLink};
use scribe_sdk::prelude::*;
use scribe_sdk::protocol::{ArmConstants, FrameMeta, JointSubset};
use std::sync::Arc;

/// 平面臂：所有扭转角为 0，只有第二节连杆长 10 英寸
///
/// 测针尖位于以基座轴为圆心、半径 10 的圆上，基座转角决定它的位置。
pub fn planar_device() -> MockDevice {
    let constants = ArmConstants::new(
        [0.0; 6],
        [0.0, 10.0, 0.0, 0.0, 0.0, 0.0],
        [0.0; 6],
    );
    MockDevice::with_constants(&constants).with_max_counts([16383; 6])
}

/// 以英寸为单位连接的平面臂会话
pub fn planar_session() -> ArmSession<MockLink> {
    ArmSessionBuilder::new(MockLink::new(planar_device()))
        .length_units(LengthUnits::Inches)
        .simple_handlers(Arc::new(NonInteractive))
        .connect(1, 9600)
        .unwrap()
}

/// 只转动基座的一帧
pub fn base_frame(base_counts: u32, buttons: u8) -> FrameMeta {
    FrameMeta::with_encoders(JointSubset::Six, [base_counts, 0, 0, 0, 0, 0], buttons)
}
