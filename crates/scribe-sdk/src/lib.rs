//! Scribe SDK - 六自由度数字化测量臂 Rust SDK
//!
//! 通过串口连接测量臂，把编码器计数转换为关节角，再经 DH 变换链得到测针尖
//! 的位置与姿态。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 常量、单位、标定参数块解析
//! - **链路层** (`link`): 串口链路抽象（`ArmLink`），测试用的脚本化链路
//! - **驱动层** (`driver`): 关节角解析、正运动学、采集状态机、失败处理器
//! - **客户端层** (`client`): 踏板消抖、按距离采样、折线收集
//! - **工具层** (`tools`): TOML 会话配置、测针覆盖值文件
//!
//! # 快速开始
//!
//! ```rust
//! use scribe_sdk::prelude::*;
//! ```
//!
//! 从配置连接（此处使用脚本化链路，需要 `mock` feature）：
//!
//! ```rust,ignore
//! use scribe_sdk::link::{MockDevice, MockLink};
//! use scribe_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! let config = SessionConfig::from_toml_str("length_units = \"inches\"")?;
//! let arm = connect_from_config(
//!     MockLink::new(MockDevice::standard()),
//!     &config,
//!     Arc::new(NonInteractive),
//! )?;
//! let mut digitizer = DigitizingSession::new(arm);
//! let event = digitizer.sample_point()?;
//! ```

pub mod config;
pub mod logging;
pub mod prelude;

pub use scribe_client as client;
pub use scribe_driver as driver;
pub use scribe_link as link;
pub use scribe_protocol as protocol;
pub use scribe_tools as tools;

use thiserror::Error;

// 协议层
pub use scribe_protocol::{
    AngleFormat, AngleUnits, ArmConstants, FrameMeta, LengthUnits, ProtocolError, Vector3,
};

// 链路层
pub use scribe_link::{ArmLink, LinkError};

// 驱动层
pub use scribe_driver::{
    Acquisition, ArmSession, ArmSessionBuilder, CalcStrategy, DriverError,
    FailureHandlerRegistry, FailureKind, NonInteractive, ResultCode, StylusTip,
};

// 客户端层（推荐入口）
pub use scribe_client::{DigitizingSession, PedalEvent, PolylineCollector};

// 工具层
pub use scribe_tools::{ConfigError, SessionConfig};

pub use config::{ApplyConfig, connect_from_config};
pub use logging::{init_logging, init_logging_with};

/// SDK 顶层错误
#[derive(Error, Debug)]
pub enum SdkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl SdkError {
    /// 驱动错误对应的结果码；配置和日志错误没有结果码
    pub fn code(&self) -> Option<ResultCode> {
        match self {
            SdkError::Driver(err) => Some(err.code()),
            _ => None,
        }
    }
}
