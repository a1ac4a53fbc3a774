//! 驱动层错误类型定义

use crate::mode::AcquisitionMode;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use scribe_link::LinkError;
use scribe_protocol::ProtocolError;
use std::fmt;
use thiserror::Error;

/// 操作结果码
///
/// 数值与设备 SDK 的结果码保持稳定，便于与外部程序交换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ResultCode {
    Success = 0,
    /// 轮询时数据尚未到达（不是错误）
    NoPacketYet = 1,
    Timeout = 2,
    BadPacket = 3,
    BadPort = 4,
    /// 参数块格式不符
    BadFormat = 5,
    /// 启动时设备无响应
    NoDeviceResponse = 6,
    /// 无法开始会话
    HandshakeFailed = 7,
    CantOpenPort = 8,
    /// 指示调用者用（可能已更新的）端口/波特率重试
    TryAgain = 9,
    NotConnected = 10,
    IoError = 11,
    /// 当前采集模式不允许此操作，重试不会改变结果
    InvalidMode = 12,
}

impl ResultCode {
    pub fn label(self) -> &'static str {
        match self {
            ResultCode::Success => "Success",
            ResultCode::NoPacketYet => "No packet yet",
            ResultCode::Timeout => "Timed out",
            ResultCode::BadPacket => "Bad packet",
            ResultCode::BadPort => "Bad port",
            ResultCode::BadFormat => "Bad parameter format",
            ResultCode::NoDeviceResponse => "No device response",
            ResultCode::HandshakeFailed => "Cannot begin session",
            ResultCode::CantOpenPort => "Cannot open port",
            ResultCode::TryAgain => "Try again",
            ResultCode::NotConnected => "Not connected",
            ResultCode::IoError => "IO error",
            ResultCode::InvalidMode => "Invalid acquisition mode",
        }
    }

    /// 是否表示失败（`Success` 与 `NoPacketYet` 都不是失败）
    pub fn is_failure(self) -> bool {
        !matches!(self, ResultCode::Success | ResultCode::NoPacketYet)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 不可恢复的链路错误（IO、未连接）
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 参数块解析错误，对本次连接是终态
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 失败处理器给出了终止指令
    #[error("Operation aborted: {0}")]
    Aborted(ResultCode),

    /// 会话尚未连接
    #[error("Arm not connected")]
    NotConnected,

    /// 当前采集模式不允许此操作
    #[error("Invalid acquisition mode: expected {expected}, found {actual:?}")]
    InvalidMode {
        expected: &'static str,
        actual: AcquisitionMode,
    },
}

impl DriverError {
    /// 对应的结果码
    pub fn code(&self) -> ResultCode {
        match self {
            DriverError::Link(err) => match err {
                LinkError::Io(_) => ResultCode::IoError,
                LinkError::Timeout => ResultCode::Timeout,
                LinkError::BadPacket => ResultCode::BadPacket,
                LinkError::BadPort(_) => ResultCode::BadPort,
                LinkError::CantOpenPort { .. } => ResultCode::CantOpenPort,
                LinkError::NoDeviceResponse => ResultCode::NoDeviceResponse,
                LinkError::HandshakeFailed => ResultCode::HandshakeFailed,
                LinkError::NotConnected => ResultCode::NotConnected,
            },
            DriverError::Protocol(ProtocolError::BadFormat { .. }) => ResultCode::BadFormat,
            DriverError::Protocol(_) => ResultCode::BadFormat,
            DriverError::Aborted(code) => *code,
            DriverError::NotConnected => ResultCode::NotConnected,
            DriverError::InvalidMode { .. } => ResultCode::InvalidMode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_roundtrip() {
        for raw in 0u8..=12 {
            let code = ResultCode::try_from(raw).unwrap();
            assert_eq!(u8::from(code), raw);
        }
        assert!(ResultCode::try_from(13u8).is_err());
        assert!(ResultCode::try_from(200u8).is_err());
    }

    #[test]
    fn test_is_failure() {
        assert!(!ResultCode::Success.is_failure());
        assert!(!ResultCode::NoPacketYet.is_failure());
        assert!(ResultCode::Timeout.is_failure());
        assert!(ResultCode::BadFormat.is_failure());
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Aborted(ResultCode::Timeout);
        assert_eq!(format!("{}", err), "Operation aborted: Timed out");

        let err = DriverError::Link(LinkError::BadPacket);
        assert!(format!("{}", err).contains("Bad packet"));

        let err = DriverError::NotConnected;
        assert_eq!(format!("{}", err), "Arm not connected");
    }

    #[test]
    fn test_driver_error_code() {
        assert_eq!(
            DriverError::Aborted(ResultCode::HandshakeFailed).code(),
            ResultCode::HandshakeFailed
        );
        let err: DriverError = ProtocolError::BadFormat {
            format: "x".to_string(),
            len: 2,
        }
        .into();
        assert_eq!(err.code(), ResultCode::BadFormat);
        assert_eq!(
            DriverError::Link(LinkError::NotConnected).code(),
            ResultCode::NotConnected
        );
    }

    #[test]
    fn test_invalid_mode_is_not_try_again() {
        let err = DriverError::InvalidMode {
            expected: "background request pending",
            actual: AcquisitionMode::Idle,
        };
        assert_eq!(err.code(), ResultCode::InvalidMode);
        assert_ne!(err.code(), ResultCode::TryAgain);
        assert!(err.code().is_failure());
    }
}
