//! Mock 链路
//!
//! 用于测试的脚本化链路：测试预先排队响应（数据帧、超时、坏包、连接失败），
//! 并在之后检查驱动层实际发出的请求。

use crate::stream::{ByteStream, MemoryStream};
use crate::{ArmLink, LinkError};
use scribe_protocol::{
    ArmConstants, DeviceStrings, FrameMeta, LengthUnits, MotionReportConfig, NUM_DOF,
    PARAM_FORMAT_DH0_5, PollMode, ReportRequest,
};
use std::collections::VecDeque;
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

/// 模拟设备描述
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub strings: DeviceStrings,
    pub max_counts: [u32; NUM_DOF],
    pub calibration: Vec<u8>,
    pub extended: Vec<u8>,
}

impl MockDevice {
    /// 典型设备的编码器量程
    pub const STANDARD_MAX_COUNTS: [u32; NUM_DOF] = [16383, 16383, 8191, 8191, 4095, 16383];

    /// 一台常规 6 关节测量臂（英寸）
    pub fn standard() -> Self {
        let constants = ArmConstants::new(
            [0.0, -FRAC_PI_2, 0.0, -FRAC_PI_2, FRAC_PI_2, -FRAC_PI_2],
            [0.0, 0.0, 9.5, 0.0, 0.0, 0.0],
            [8.5, 0.0, 0.0, 9.5, 0.0, 3.5],
        );
        Self::with_constants(&constants)
    }

    /// 使用指定 DH 常量的设备
    pub fn with_constants(constants: &ArmConstants) -> Self {
        Self {
            strings: DeviceStrings {
                product_name: "MicroScribe3D".to_string(),
                model_name: "MSCR".to_string(),
                serial_number: "10001".to_string(),
                comment: "Standard".to_string(),
                param_format: PARAM_FORMAT_DH0_5.to_string(),
                firmware_version: "MSCR1-1C".to_string(),
            },
            max_counts: Self::STANDARD_MAX_COUNTS,
            calibration: constants.encode(LengthUnits::Inches).to_vec(),
            extended: Vec::new(),
        }
    }

    /// 附带 BETA 扩展参数
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.strings.comment = "Calibrated Beta".to_string();
        self.extended = ArmConstants::encode_extended(beta).to_vec();
        self
    }

    pub fn with_max_counts(mut self, max_counts: [u32; NUM_DOF]) -> Self {
        self.max_counts = max_counts;
        self
    }
}

/// 排队的一次接收结果
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// 一帧完整数据
    Frame(FrameMeta),
    /// 数据尚未到达（阻塞接收时视为超时）
    Pending,
    Timeout,
    BadPacket,
}

/// 脚本化链路
#[derive(Debug)]
pub struct MockLink {
    device: MockDevice,
    port: u32,
    baud: u32,
    connected: bool,
    motion_active: bool,
    connect_failures: VecDeque<LinkError>,
    send_failures: VecDeque<LinkError>,
    responses: VecDeque<MockResponse>,
    stream: MemoryStream,
    sent: Vec<ReportRequest>,
    motion_configs: Vec<MotionReportConfig>,
    cancellations: Vec<bool>,
    resets: usize,
    home_calls: usize,
}

impl MockLink {
    pub fn new(device: MockDevice) -> Self {
        Self {
            device,
            port: 1,
            baud: 9600,
            connected: false,
            motion_active: false,
            connect_failures: VecDeque::new(),
            send_failures: VecDeque::new(),
            responses: VecDeque::new(),
            stream: MemoryStream::new(),
            sent: Vec::new(),
            motion_configs: Vec::new(),
            cancellations: Vec::new(),
            resets: 0,
            home_calls: 0,
        }
    }

    /// 下一次 `connect` 以此错误失败
    pub fn fail_next_connect(&mut self, error: LinkError) {
        self.connect_failures.push_back(error);
    }

    /// 下一次发出请求（`send_command` 或 `arm_motion_reporting`）以此错误失败
    pub fn fail_next_send(&mut self, error: LinkError) {
        self.send_failures.push_back(error);
    }

    pub fn push_response(&mut self, response: MockResponse) {
        self.responses.push_back(response);
    }

    pub fn push_frame(&mut self, frame: FrameMeta) {
        self.push_response(MockResponse::Frame(frame));
    }

    /// 模拟串口缓冲区中尚未解析的字节
    pub fn buffer_raw(&mut self, bytes: &[u8]) {
        self.stream.feed(bytes);
    }

    /// 尚未消费的响应数
    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.stream.bytes_available()
    }

    pub fn sent_requests(&self) -> &[ReportRequest] {
        &self.sent
    }

    pub fn motion_configs(&self) -> &[MotionReportConfig] {
        &self.motion_configs
    }

    pub fn cancellations(&self) -> &[bool] {
        &self.cancellations
    }

    pub fn reset_count(&self) -> usize {
        self.resets
    }

    pub fn home_calls(&self) -> usize {
        self.home_calls
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_motion_active(&self) -> bool {
        self.motion_active
    }

    fn discard_buffered(&mut self) {
        self.responses.clear();
        self.stream.flush();
    }

    fn ensure_connected(&self) -> Result<(), LinkError> {
        if self.connected {
            Ok(())
        } else {
            Err(LinkError::NotConnected)
        }
    }
}

impl ArmLink for MockLink {
    fn set_com_params(&mut self, port: u32, baud: u32) {
        self.port = port;
        self.baud = baud;
    }

    fn port(&self) -> u32 {
        self.port
    }

    fn baud(&self) -> u32 {
        self.baud
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        if let Some(error) = self.connect_failures.pop_front() {
            debug!("Mock connect on port {} failed: {}", self.port, error);
            return Err(error);
        }
        self.connected = true;
        debug!("Mock connected on port {} at {} baud", self.port, self.baud);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.motion_active = false;
        self.discard_buffered();
    }

    fn change_baud(&mut self, baud: u32) -> Result<(), LinkError> {
        self.ensure_connected()?;
        self.baud = baud;
        self.discard_buffered();
        Ok(())
    }

    fn send_command(&mut self, request: ReportRequest) -> Result<(), LinkError> {
        self.ensure_connected()?;
        if let Some(error) = self.send_failures.pop_front() {
            return Err(error);
        }
        self.sent.push(request);
        Ok(())
    }

    fn wait_frame(&mut self) -> Result<FrameMeta, LinkError> {
        self.ensure_connected()?;
        match self.responses.pop_front() {
            Some(MockResponse::Frame(frame)) => Ok(frame),
            Some(MockResponse::BadPacket) => Err(LinkError::BadPacket),
            Some(MockResponse::Pending | MockResponse::Timeout) | None => Err(LinkError::Timeout),
        }
    }

    fn poll_frame(&mut self, _mode: PollMode) -> Result<Option<FrameMeta>, LinkError> {
        self.ensure_connected()?;
        match self.responses.pop_front() {
            Some(MockResponse::Frame(frame)) => Ok(Some(frame)),
            Some(MockResponse::Pending) | None => Ok(None),
            Some(MockResponse::Timeout) => Err(LinkError::Timeout),
            Some(MockResponse::BadPacket) => Err(LinkError::BadPacket),
        }
    }

    fn arm_motion_reporting(&mut self, config: &MotionReportConfig) -> Result<(), LinkError> {
        self.ensure_connected()?;
        if let Some(error) = self.send_failures.pop_front() {
            return Err(error);
        }
        self.motion_configs.push(*config);
        self.motion_active = true;
        Ok(())
    }

    fn cancel_motion_reporting(&mut self, discard_buffered: bool) {
        self.cancellations.push(discard_buffered);
        self.motion_active = false;
        if discard_buffered {
            self.discard_buffered();
        }
    }

    fn reset_com(&mut self) {
        self.resets += 1;
        self.discard_buffered();
    }

    fn go_home(&mut self) -> Result<(), LinkError> {
        self.ensure_connected()?;
        self.home_calls += 1;
        Ok(())
    }

    fn read_device_strings(&mut self) -> Result<DeviceStrings, LinkError> {
        self.ensure_connected()?;
        Ok(self.device.strings.clone())
    }

    fn read_encoder_max_counts(&mut self) -> Result<[u32; NUM_DOF], LinkError> {
        self.ensure_connected()?;
        Ok(self.device.max_counts)
    }

    fn read_calibration_block(&mut self) -> Result<Vec<u8>, LinkError> {
        self.ensure_connected()?;
        Ok(self.device.calibration.clone())
    }

    fn read_extended_calibration_block(&mut self) -> Result<Vec<u8>, LinkError> {
        self.ensure_connected()?;
        Ok(self.device.extended.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_protocol::JointSubset;

    fn request() -> ReportRequest {
        ReportRequest {
            timer: false,
            analog_count: 0,
            joints: JointSubset::Six,
        }
    }

    #[test]
    fn test_requires_connection() {
        let mut link = MockLink::new(MockDevice::standard());
        assert!(matches!(
            link.send_command(request()),
            Err(LinkError::NotConnected)
        ));
        link.connect().unwrap();
        link.send_command(request()).unwrap();
        assert_eq!(link.sent_requests().len(), 1);
    }

    #[test]
    fn test_scripted_send_failure() {
        let mut link = MockLink::new(MockDevice::standard());
        link.connect().unwrap();
        link.fail_next_send(LinkError::Timeout);
        assert!(matches!(link.send_command(request()), Err(LinkError::Timeout)));
        assert!(link.sent_requests().is_empty());
        link.send_command(request()).unwrap();
        assert_eq!(link.sent_requests().len(), 1);
    }

    #[test]
    fn test_scripted_connect_failure() {
        let mut link = MockLink::new(MockDevice::standard());
        link.fail_next_connect(LinkError::NoDeviceResponse);
        assert!(matches!(link.connect(), Err(LinkError::NoDeviceResponse)));
        assert!(link.connect().is_ok());
        assert!(link.is_connected());
    }

    #[test]
    fn test_poll_and_wait() {
        let mut link = MockLink::new(MockDevice::standard());
        link.connect().unwrap();
        link.push_response(MockResponse::Pending);
        link.push_frame(FrameMeta::with_encoders(JointSubset::Six, [1; 6], 0));
        link.push_response(MockResponse::BadPacket);

        assert!(link.poll_frame(PollMode::Background).unwrap().is_none());
        assert!(link.poll_frame(PollMode::Background).unwrap().is_some());
        assert!(matches!(link.wait_frame(), Err(LinkError::BadPacket)));
        // 队列为空时阻塞接收超时
        assert!(matches!(link.wait_frame(), Err(LinkError::Timeout)));
    }

    #[test]
    fn test_cancel_motion_discards() {
        let mut link = MockLink::new(MockDevice::standard());
        link.connect().unwrap();
        link.push_frame(FrameMeta::default());
        link.buffer_raw(&[0x10, 0x20]);

        link.cancel_motion_reporting(false);
        assert_eq!(link.pending_responses(), 1);
        assert_eq!(link.buffered_bytes(), 2);

        link.cancel_motion_reporting(true);
        assert_eq!(link.pending_responses(), 0);
        assert_eq!(link.buffered_bytes(), 0);
        assert_eq!(link.cancellations(), &[false, true]);
    }

    #[test]
    fn test_beta_device() {
        let device = MockDevice::standard().with_beta(0.01);
        assert!(device.strings.supports_beta());
        assert_eq!(device.extended.len(), 2);
        assert_eq!(device.calibration.len(), 36);
    }
}
