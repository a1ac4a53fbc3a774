//! # Scribe Protocol
//!
//! 数字化测量臂的数据模型（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 硬件常量（自由度、参数块长度、踏板编码等）
//! - `units`: 长度/角度单位与姿态角格式
//! - `frame`: 数据帧元信息与请求描述
//! - `device`: 设备描述字符串
//! - `calibration`: 标定参数块解析（DH 常量）
//!
//! ## 字节序
//!
//! 设备参数块使用大端字节序（高位在前）。
//! 本模块提供了字节序转换工具函数。

pub mod calibration;
pub mod constants;
pub mod device;
pub mod frame;
pub mod units;

// 重新导出常用类型
pub use calibration::{ArmConstants, TipOverrideSource, TipOverrides};
pub use constants::*;
pub use device::DeviceStrings;
pub use frame::{FrameMeta, JointSubset, MotionReportConfig, PollMode, ReportRequest};
pub use units::{AngleFormat, AngleUnits, LengthUnits, OrientationFormula, Vector3};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 参数块格式不受支持或长度与格式不符
    #[error("Bad parameter block: format {format:?}, {len} bytes")]
    BadFormat { format: String, len: usize },

    #[error("Invalid joint count: {0} (expected 3 or 6)")]
    InvalidJointCount(usize),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// 字节序转换工具函数
///
/// 大端字节序转 i16
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// i16 转大端字节序
pub fn i16_to_bytes_be(value: i16) -> [u8; 2] {
    value.to_be_bytes()
}
