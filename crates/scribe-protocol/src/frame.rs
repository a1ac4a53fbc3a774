//! 数据帧与请求描述
//!
//! 链路层每收到一帧完整数据，就交给上层一个 [`FrameMeta`]，其中记录了
//! 哪些编码器在本帧中被更新、原始计数值、按键状态以及可选的计时器和模拟量。

use crate::ProtocolError;
use crate::constants::{NUM_ANALOGS, NUM_DOF, NUM_ENCODERS};

/// 一次请求上报的关节子集
///
/// 设备只支持上报前 3 个或全部 6 个关节。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointSubset {
    /// 关节 0-2
    Three,
    /// 关节 0-5
    Six,
}

impl JointSubset {
    /// 关节数量
    #[inline]
    pub const fn count(self) -> usize {
        match self {
            JointSubset::Three => 3,
            JointSubset::Six => 6,
        }
    }
}

impl TryFrom<usize> for JointSubset {
    type Error = ProtocolError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(JointSubset::Three),
            6 => Ok(JointSubset::Six),
            other => Err(ProtocolError::InvalidJointCount(other)),
        }
    }
}

/// 一帧数据的元信息
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameMeta {
    /// 每个关节编码器是否在本帧中被更新
    pub encoder_updated: [bool; NUM_DOF],
    /// 原始编码器计数（未屏蔽）
    pub encoders: [u32; NUM_DOF],
    /// 按键/踏板位图
    pub buttons: u8,
    /// 设备计时器（仅当请求了计时器时存在）
    pub timer: Option<u32>,
    /// 模拟量读数（长度等于请求的模拟量数）
    pub analogs: Vec<u16>,
}

impl FrameMeta {
    /// 构造一个更新前 `subset` 个关节的帧
    ///
    /// `counts` 中超出子集的值仍会写入 `encoders`，但不会被标记为已更新。
    pub fn with_encoders(subset: JointSubset, counts: [u32; NUM_DOF], buttons: u8) -> Self {
        let mut encoder_updated = [false; NUM_DOF];
        for updated in encoder_updated.iter_mut().take(subset.count()) {
            *updated = true;
        }
        Self {
            encoder_updated,
            encoders: counts,
            buttons,
            timer: None,
            analogs: Vec::new(),
        }
    }

    /// 本帧更新的关节子集
    ///
    /// 与设备行为一致：关节 2 被更新意味着前三个关节都已更新，
    /// 关节 5 被更新意味着后三个关节也已更新。
    pub fn joint_subset(&self) -> Option<JointSubset> {
        match (self.encoder_updated[2], self.encoder_updated[5]) {
            (true, true) => Some(JointSubset::Six),
            (true, false) => Some(JointSubset::Three),
            _ => None,
        }
    }
}

/// 数据请求参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    /// 是否附带计时器
    pub timer: bool,
    /// 附带的模拟量数量
    pub analog_count: u8,
    /// 请求的关节子集
    pub joints: JointSubset,
}

/// 运动触发上报的配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionReportConfig {
    pub request: ReportRequest,
    /// 每个编码器触发新帧所需的最小变化量（脉冲）。0 表示运动不触发
    pub encoder_thresholds: [u32; NUM_ENCODERS],
    /// 每个模拟量触发新帧所需的最小变化量
    pub analog_thresholds: [u32; NUM_ANALOGS],
    /// 两帧之间的最小间隔（毫秒）
    pub min_interval_ms: u32,
    /// 按键状态变化是否触发新帧
    pub buttons_active: bool,
}

impl MotionReportConfig {
    /// 所有编码器使用同一阈值，模拟量不触发
    pub fn uniform(
        request: ReportRequest,
        motion_threshold: u32,
        min_interval_ms: u32,
        buttons_active: bool,
    ) -> Self {
        Self {
            request,
            encoder_thresholds: [motion_threshold; NUM_ENCODERS],
            analog_thresholds: [0; NUM_ANALOGS],
            min_interval_ms,
            buttons_active,
        }
    }
}

/// 非阻塞接收所处的模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// 后台请求-响应
    Background,
    /// 运动触发流
    Motion,
}
