//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use scribe_sdk::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use scribe_client::{DigitizingSession, PedalEvent, Polyline, PolylineCollector};

// 驱动层
pub use scribe_driver::{
    Acquisition, AcquisitionMode, ArmSession, ArmSessionBuilder, CalcStrategy, FailureKind,
    NonInteractive, RecoveryPrompt, StylusTip,
};

// 链路层（常用 Trait）
pub use scribe_link::ArmLink;

// 协议层类型
pub use scribe_protocol::{AngleFormat, AngleUnits, LengthUnits, Vector3};

// 配置
pub use crate::config::{ApplyConfig, connect_from_config};
pub use scribe_tools::SessionConfig;

// 错误类型
pub use crate::SdkError;
pub use scribe_driver::DriverError;
pub use scribe_link::LinkError;
pub use scribe_protocol::ProtocolError;
pub use scribe_tools::ConfigError;
