//! # Scribe Link Layer
//!
//! 串口链路层抽象。字节级协议（帧封装、校验、波特率自同步、命令编码）
//! 由具体实现负责，驱动层只通过 [`ArmLink`] 使用它。

use scribe_protocol::{
    DeviceStrings, FrameMeta, MotionReportConfig, NUM_DOF, PollMode, ReportRequest,
};
use thiserror::Error;

pub mod stream;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use stream::{ByteStream, MemoryStream};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockDevice, MockLink, MockResponse};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    /// 在超时时间内没有收到完整响应
    #[error("Timed out waiting for packet")]
    Timeout,
    /// 收到的数据包格式错误或校验失败
    #[error("Bad packet received")]
    BadPacket,
    /// 端口号无效
    #[error("Invalid port: {0}")]
    BadPort(u32),
    /// 端口存在但无法打开
    #[error("Cannot open port {port} at {baud} baud")]
    CantOpenPort { port: u32, baud: u32 },
    /// 启动时设备完全无响应
    #[error("No response from device")]
    NoDeviceResponse,
    /// 波特率同步成功但无法开始会话
    #[error("Session handshake failed")]
    HandshakeFailed,
    /// 尚未建立连接
    #[error("Link not connected")]
    NotConnected,
}

/// 驱动层使用的链路能力
///
/// 所有方法都在调用者线程上执行；`wait_frame` 是唯一会阻塞的接收操作，
/// 阻塞时长由链路自身的超时决定。
pub trait ArmLink {
    /// 设置下一次连接使用的端口与波特率
    fn set_com_params(&mut self, port: u32, baud: u32);
    fn port(&self) -> u32;
    fn baud(&self) -> u32;

    /// 打开端口、同步波特率并开始会话
    fn connect(&mut self) -> Result<(), LinkError>;
    /// 结束会话，设备回到等待自同步的状态
    fn disconnect(&mut self);
    /// 切换设备与主机的波特率，未处理的串口数据会丢失
    fn change_baud(&mut self, baud: u32) -> Result<(), LinkError>;

    /// 发送一次数据请求
    fn send_command(&mut self, request: ReportRequest) -> Result<(), LinkError>;
    /// 阻塞等待一帧完整数据
    fn wait_frame(&mut self) -> Result<FrameMeta, LinkError>;
    /// 非阻塞检查是否已有完整数据帧，`Ok(None)` 表示尚未到达
    fn poll_frame(&mut self, mode: PollMode) -> Result<Option<FrameMeta>, LinkError>;

    /// 让设备进入运动触发上报模式
    fn arm_motion_reporting(&mut self, config: &MotionReportConfig) -> Result<(), LinkError>;
    /// 取消运动触发上报；`discard_buffered` 为真时同时丢弃未解析的缓冲数据
    fn cancel_motion_reporting(&mut self, discard_buffered: bool);
    /// 清空主机接收缓冲区
    fn reset_com(&mut self);

    /// 告知设备当前处于机械原点
    fn go_home(&mut self) -> Result<(), LinkError>;

    fn read_device_strings(&mut self) -> Result<DeviceStrings, LinkError>;
    fn read_encoder_max_counts(&mut self) -> Result<[u32; NUM_DOF], LinkError>;
    fn read_calibration_block(&mut self) -> Result<Vec<u8>, LinkError>;
    fn read_extended_calibration_block(&mut self) -> Result<Vec<u8>, LinkError>;
}
