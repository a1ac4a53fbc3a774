//! # 会话配置
//!
//! 测量臂会话的文件配置（TOML）。
//!
//! ```toml
//! port = 1
//! baud = 9600
//! length_units = "mm"
//! angle_units = "degrees"
//! angle_format = "xyz_fixed"
//! report_timer = false
//! analog_reports = 0
//! tip_override_file = "tip.txt"
//!
//! [tip]
//! kind = "custom"
//! delta = 1.5
//! ```

use crate::overrides::TipOverrideFile;
use scribe_protocol::{AngleFormat, AngleUnits, LengthUnits, NUM_ANALOGS, ProtocolError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl From<ProtocolError> for ConfigError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidValue { field, value } => {
                ConfigError::InvalidValue { field, value }
            },
            other => ConfigError::InvalidValue {
                field: "protocol".to_string(),
                value: other.to_string(),
            },
        }
    }
}

/// 测针类型
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TipConfig {
    #[default]
    Point,
    Ball,
    /// 自定义长度增量（配置的长度单位）
    Custom { delta: f64 },
}

/// 会话配置
///
/// 单位与姿态角格式以字符串保存，加载时校验，未知取值返回
/// [`ConfigError::InvalidValue`]。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 串口号
    pub port: u32,
    /// 波特率
    pub baud: u32,
    /// `"mm"` 或 `"inches"`
    pub length_units: String,
    /// `"degrees"` 或 `"radians"`
    pub angle_units: String,
    /// 例如 `"xyz_fixed"`、`"zyx_euler"`
    pub angle_format: String,
    /// 每次请求附带计时器
    pub report_timer: bool,
    /// 每次请求附带的模拟量通道数（0..=8）
    pub analog_reports: usize,
    /// 测针覆盖值文件，相对路径以配置文件所在目录为基准
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_override_file: Option<PathBuf>,
    /// 表放在最后，TOML 中表之后不能再出现普通键
    pub tip: TipConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: 1,
            baud: 9600,
            length_units: LengthUnits::default().to_string(),
            angle_units: AngleUnits::default().to_string(),
            angle_format: AngleFormat::default().to_string(),
            report_timer: false,
            analog_reports: 0,
            tip_override_file: None,
            tip: TipConfig::default(),
        }
    }
}

impl SessionConfig {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    ///
    /// 相对的 `tip_override_file` 会被解析为相对于配置文件所在目录。
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        if let (Some(file), Some(dir)) = (config.tip_override_file.as_mut(), path.parent())
            && file.is_relative()
        {
            *file = dir.join(&*file);
        }
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;
        let content = toml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 校验所有字符串取值和模拟量通道数
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.length_units()?;
        self.angle_units()?;
        self.angle_format()?;
        if self.analog_reports > NUM_ANALOGS {
            return Err(ConfigError::InvalidValue {
                field: "analog_reports".to_string(),
                value: self.analog_reports.to_string(),
            });
        }
        if let TipConfig::Custom { delta } = self.tip
            && !delta.is_finite()
        {
            return Err(ConfigError::InvalidValue {
                field: "tip.delta".to_string(),
                value: delta.to_string(),
            });
        }
        Ok(())
    }

    pub fn length_units(&self) -> Result<LengthUnits, ConfigError> {
        Ok(self.length_units.parse()?)
    }

    pub fn angle_units(&self) -> Result<AngleUnits, ConfigError> {
        Ok(self.angle_units.parse()?)
    }

    pub fn angle_format(&self) -> Result<AngleFormat, ConfigError> {
        Ok(self.angle_format.parse()?)
    }

    /// 读取测针覆盖值文件；未配置时返回 `None`
    pub fn load_tip_overrides(&self) -> Result<Option<TipOverrideFile>, ConfigError> {
        match &self.tip_override_file {
            Some(path) => Ok(Some(TipOverrideFile::load(path)?)),
            None => Ok(None),
        }
    }
}
