//! 驱动层模块
//!
//! 本模块提供数字化测量臂的采集会话，包括：
//! - 关节角解析（编码器计数 → 弧度/角度）
//! - 正运动学（DH 变换链、测针尖位置与姿态）
//! - 采集状态机（前台/后台/运动触发）
//! - 失败处理器注册表
//!
//! # 使用场景
//!
//! 适用于需要直接控制取数方式和计算策略的场景。
//! 逐点采集、踏板消抖等更高级的接口见 `scribe-client`。

mod builder;
mod error;
pub mod handlers;
pub mod joints;
pub mod kinematics;
pub mod mode;
mod session;

pub use builder::ArmSessionBuilder;
pub use error::{DriverError, ResultCode};
pub use handlers::{
    Directive, FailureHandler, FailureHandlerRegistry, FailureKind, NonInteractive,
    RecoveryPrompt, SimpleHandler, StartupChoice, TolerateTimeouts,
};
pub use joints::{EncoderScale, JointState};
pub use kinematics::{Pose, StylusTip, TransformEngine};
pub use mode::{AcquisitionMode, CalcStrategy};
pub use session::{Acquisition, ArmSession, SessionOptions};
