//! 采集模式与计算策略
//!
//! 每种数据请求都附带一个计算策略，决定数据到达后要计算到哪一步。
//! 策略同时决定向设备请求的关节数量。

use scribe_protocol::JointSubset;

/// 数据到达后的计算策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalcStrategy {
    /// 只计算测针尖位置
    Tip3Dof,
    /// 位置 + 姿态角
    Tip6Dof,
    /// 只解析前 3 个关节角
    Joints3,
    /// 只解析 6 个关节角
    Joints6,
    /// 全部：关节角、所有连杆端点、位置与姿态
    Full,
    /// 只解析关节角，不做运动学计算
    #[default]
    Nothing,
}

impl CalcStrategy {
    /// 前台/后台请求使用的关节子集
    pub fn request_joints(self) -> JointSubset {
        match self {
            CalcStrategy::Joints3 => JointSubset::Three,
            _ => JointSubset::Six,
        }
    }

    /// 运动触发流使用的关节子集
    ///
    /// 与设备 SDK 的配对表逐项一致：`Full` 只请求 3 个关节，
    /// 因此后 3 个关节在该模式下保持上一次的值。
    pub fn motion_joints(self) -> JointSubset {
        match self {
            CalcStrategy::Joints3 | CalcStrategy::Full => JointSubset::Three,
            CalcStrategy::Tip3Dof
            | CalcStrategy::Tip6Dof
            | CalcStrategy::Joints6
            | CalcStrategy::Nothing => JointSubset::Six,
        }
    }

    /// 是否需要计算测针尖位置
    pub fn computes_position(self) -> bool {
        matches!(
            self,
            CalcStrategy::Tip3Dof | CalcStrategy::Tip6Dof | CalcStrategy::Full
        )
    }

    /// 是否需要计算姿态角
    pub fn computes_orientation(self) -> bool {
        matches!(self, CalcStrategy::Tip6Dof | CalcStrategy::Full)
    }
}

/// 采集状态机
///
/// ```text
/// Idle ──request_foreground──▶ ForegroundPending ──(帧/失败)──▶ Idle
/// Idle ──request_background──▶ BackgroundPending ──poll──▶ BackgroundPending
/// Idle ──start_motion_stream─▶ MotionStreaming ──end_motion_stream──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionMode {
    #[default]
    Idle,
    ForegroundPending,
    /// 后台请求已发出，轮询时使用该策略
    BackgroundPending(CalcStrategy),
    /// 设备正在按运动阈值推送数据
    MotionStreaming(CalcStrategy),
}

impl AcquisitionMode {
    pub fn is_streaming(self) -> bool {
        matches!(self, AcquisitionMode::MotionStreaming(_))
    }

    /// 当前挂起的计算策略
    pub fn pending_strategy(self) -> Option<CalcStrategy> {
        match self {
            AcquisitionMode::BackgroundPending(s) | AcquisitionMode::MotionStreaming(s) => Some(s),
            _ => None,
        }
    }
}
