//! # Scribe Tools - 文件配置
//!
//! **依赖原则**: 只依赖 `scribe-protocol`，不依赖驱动层
//!
//! ## 包含模块
//!
//! - `config` - 会话配置（TOML）
//! - `overrides` - 测针覆盖值文件（`Name = value` 逐行格式）
//!
//! 把配置应用到会话构建器的代码在 `scribe-sdk` 中。

pub mod config;
pub mod overrides;

pub use config::{ConfigError, SessionConfig, TipConfig};
pub use overrides::TipOverrideFile;
