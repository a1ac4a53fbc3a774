//! 设备描述字符串

use crate::constants::{BETA_COMMENT_MARKER, PARAM_FORMAT_DH0_5};

/// 连接时从设备读取的描述字符串
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceStrings {
    pub product_name: String,
    pub model_name: String,
    pub serial_number: String,
    /// 自由注释，包含 `"Beta"` 时设备提供扩展参数块
    pub comment: String,
    /// 参数块格式标签，如 `"Format DH0.5"`
    pub param_format: String,
    pub firmware_version: String,
}

impl DeviceStrings {
    /// 设备是否提供 BETA 扩展参数
    pub fn supports_beta(&self) -> bool {
        self.comment.contains(BETA_COMMENT_MARKER)
    }

    /// 参数块格式是否受支持
    pub fn has_supported_format(&self) -> bool {
        self.param_format.trim() == PARAM_FORMAT_DH0_5
    }
}
