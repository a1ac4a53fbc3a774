//! 采集会话
//!
//! [`ArmSession`] 拥有链路、标定常量、关节状态和位姿，并按
//! [`AcquisitionMode`] 驱动三种取数方式：
//!
//! - 前台：发请求并阻塞等待一帧
//! - 后台：发请求后立即返回，由调用者轮询
//! - 运动触发：设备按运动阈值主动推送，由调用者轮询
//!
//! 会话是单线程对象，所有方法都在调用者线程上同步执行。

use crate::error::{DriverError, ResultCode};
use crate::handlers::{Directive, FailureHandlerRegistry, FailureKind};
use crate::joints::{EncoderScale, JointState};
use crate::kinematics::{Pose, StylusTip, TransformEngine, adjust_stylus_length};
use crate::mode::{AcquisitionMode, CalcStrategy};
use scribe_link::{ArmLink, LinkError};
use scribe_protocol::{
    AngleFormat, AngleUnits, ArmConstants, DeviceStrings, FrameMeta, JointSubset, LengthUnits,
    MotionReportConfig, NUM_ANALOGS, PollMode, ProtocolError, ReportRequest, TipOverrides,
    Vector3,
};
use tracing::{debug, info, trace, warn};

/// 一次取数的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// 收到完整数据，状态已更新
    Updated,
    /// 数据尚未到达
    NoPacketYet,
    /// 失败被处理器吞掉，附带处理器给出的结果码
    Suppressed(ResultCode),
}

impl Acquisition {
    fn suppressed(code: ResultCode) -> Self {
        match code {
            ResultCode::NoPacketYet => Acquisition::NoPacketYet,
            other => Acquisition::Suppressed(other),
        }
    }

    pub fn code(self) -> ResultCode {
        match self {
            Acquisition::Updated => ResultCode::Success,
            Acquisition::NoPacketYet => ResultCode::NoPacketYet,
            Acquisition::Suppressed(code) => code,
        }
    }

    pub fn is_updated(self) -> bool {
        self == Acquisition::Updated
    }
}

/// 处理器吞掉发送失败后尚未送达的请求，下次轮询时重发
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outgoing {
    Report(ReportRequest),
    Motion(MotionReportConfig),
}

/// 会话选项
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionOptions {
    pub length_units: LengthUnits,
    pub angle_units: AngleUnits,
    pub angle_format: AngleFormat,
    pub stylus_tip: StylusTip,
    /// 每帧附带设备计时器
    pub report_timer: bool,
    /// 每帧附带的模拟量数量
    pub analog_reports: u8,
}

/// 测量臂会话
pub struct ArmSession<L: ArmLink> {
    link: L,
    handlers: FailureHandlerRegistry,
    options: SessionOptions,
    overrides: TipOverrides,
    constants: ArmConstants,
    scale: EncoderScale,
    joints: JointState,
    engine: TransformEngine,
    device: Option<DeviceStrings>,
    calibration: Vec<u8>,
    beta: f64,
    mode: AcquisitionMode,
    unsent: Option<Outgoing>,
    last_frame: Option<FrameMeta>,
    connected: bool,
}

impl<L: ArmLink> ArmSession<L> {
    /// 使用默认选项创建未连接的会话（毫米、角度、XYZ 固定角、尖头测针）
    pub fn new(link: L) -> Self {
        Self::with_options(
            link,
            SessionOptions::default(),
            TipOverrides::default(),
            FailureHandlerRegistry::new(),
        )
    }

    pub fn with_options(
        link: L,
        options: SessionOptions,
        overrides: TipOverrides,
        handlers: FailureHandlerRegistry,
    ) -> Self {
        Self {
            link,
            handlers,
            options,
            overrides,
            constants: ArmConstants::default(),
            scale: EncoderScale::default(),
            joints: JointState::default(),
            engine: TransformEngine::new(),
            device: None,
            calibration: Vec::new(),
            beta: 0.0,
            mode: AcquisitionMode::Idle,
            unsent: None,
            last_frame: None,
            connected: false,
        }
    }

    // ==================== 连接 ====================

    /// 连接设备并读取标定常量
    ///
    /// 连接失败时按处理器指令重试（处理器可能已修改端口和波特率）。
    /// 连接成功后依次读取设备字符串、编码器量程、标定参数块，
    /// 设备注释中带 `Beta` 时再读取扩展参数块。
    ///
    /// # 错误
    ///
    /// - `DriverError::Aborted`: 处理器放弃
    /// - `DriverError::Protocol`: 参数块格式不受支持（结果码 `BadFormat`）
    pub fn connect(&mut self, port: u32, baud: u32) -> Result<(), DriverError> {
        if self.connected {
            self.disconnect();
        }

        info!("Connecting on port {} at {} baud", port, baud);
        self.link.set_com_params(port, baud);
        self.with_recovery(|link| {
            link.reset_com();
            link.connect()
        })?;

        if let Err(e) = self.load_constants() {
            warn!("Failed to load arm constants: {}", e);
            self.link.disconnect();
            return Err(e);
        }

        self.connected = true;
        info!(
            "Connected to {} (serial {}) on port {} at {} baud",
            self.device.as_ref().map_or("", |d| d.product_name.as_str()),
            self.device.as_ref().map_or("", |d| d.serial_number.as_str()),
            self.link.port(),
            self.link.baud()
        );
        Ok(())
    }

    /// 结束会话，设备回到等待自同步的状态
    pub fn disconnect(&mut self) {
        if self.mode.is_streaming() {
            self.link.cancel_motion_reporting(true);
        }
        self.link.disconnect();
        self.mode = AcquisitionMode::Idle;
        self.unsent = None;
        self.connected = false;
        info!("Disconnected from port {}", self.link.port());
    }

    /// 切换波特率，未处理的串口数据会丢失
    pub fn change_baud(&mut self, baud: u32) -> Result<(), DriverError> {
        self.ensure_connected()?;
        self.with_recovery(|link| link.change_baud(baud))?;
        self.mode = AcquisitionMode::Idle;
        self.unsent = None;
        info!("Baud rate changed to {}", baud);
        Ok(())
    }

    /// 告知设备当前处于机械原点
    ///
    /// 只能在机械臂实际位于原点时调用。不会更新会话中的关节角。
    pub fn home_position(&mut self) -> Result<(), DriverError> {
        self.ensure_connected()?;
        self.with_recovery(|link| link.go_home())
    }

    fn load_constants(&mut self) -> Result<(), DriverError> {
        let strings = self.with_recovery(|link| link.read_device_strings())?;
        let max_counts = self.with_recovery(|link| link.read_encoder_max_counts())?;
        let block = self.with_recovery(|link| link.read_calibration_block())?;

        let beta = if strings.supports_beta() {
            let extended = self.with_recovery(|link| link.read_extended_calibration_block())?;
            ArmConstants::decode_extended(&extended, &strings.comment).unwrap_or(0.0)
        } else {
            0.0
        };

        self.constants = self.derive_constants(&block, &strings.param_format, beta)?;
        self.scale = EncoderScale::from_max_counts(max_counts);
        self.calibration = block;
        self.beta = beta;
        self.joints = JointState::default();
        self.engine = TransformEngine::new();
        self.last_frame = None;
        self.mode = AcquisitionMode::Idle;
        self.unsent = None;
        debug!(
            "Loaded constants: format {:?}, beta {}, max counts {:?}",
            strings.param_format, beta, max_counts
        );
        self.device = Some(strings);
        Ok(())
    }

    /// 由原始参数块推导当前单位下的常量，并应用覆盖值与测针类型
    fn derive_constants(
        &self,
        block: &[u8],
        format: &str,
        beta: f64,
    ) -> Result<ArmConstants, ProtocolError> {
        let units = self.options.length_units;
        let mut constants = ArmConstants::decode(block, format, units)?;
        constants.beta = beta;
        constants.apply_tip_overrides(&self.overrides, units);
        adjust_stylus_length(&mut constants, self.options.stylus_tip, units);
        Ok(constants)
    }

    fn rebuild_constants(&mut self) -> Result<(), DriverError> {
        let Some(device) = self.device.as_ref() else {
            return Ok(());
        };
        self.constants = self.derive_constants(&self.calibration, &device.param_format, self.beta)?;
        Ok(())
    }

    // ==================== 取数 ====================

    /// 前台取数：发请求并阻塞等待一帧
    pub fn request_foreground(&mut self, strategy: CalcStrategy) -> Result<Acquisition, DriverError> {
        self.ensure_connected()?;
        if self.mode.is_streaming() {
            return Err(DriverError::InvalidMode {
                expected: "no motion stream",
                actual: self.mode,
            });
        }

        self.mode = AcquisitionMode::ForegroundPending;
        self.unsent = None;
        let result = self.foreground_exchange(strategy);
        self.mode = AcquisitionMode::Idle;
        result
    }

    fn foreground_exchange(&mut self, strategy: CalcStrategy) -> Result<Acquisition, DriverError> {
        let request = self.report_request(strategy.request_joints());
        loop {
            if let Some(code) = self.issue(Outgoing::Report(request))? {
                return Ok(Acquisition::suppressed(code));
            }
            match self.link.wait_frame() {
                Ok(frame) => {
                    self.apply_frame(frame, strategy);
                    return Ok(Acquisition::Updated);
                },
                Err(e) => match self.recover(e)? {
                    Directive::Retry => continue,
                    Directive::Abort(code) => return Err(DriverError::Aborted(code)),
                    Directive::Suppress(code) => return Ok(Acquisition::suppressed(code)),
                },
            }
        }
    }

    /// 后台取数：发请求后立即返回
    ///
    /// 之后用 [`poll_background`](Self::poll_background) 检查数据；
    /// 挂起的策略一直保留，直到发出新的请求。
    pub fn request_background(&mut self, strategy: CalcStrategy) -> Result<(), DriverError> {
        self.ensure_connected()?;
        if self.mode.is_streaming() {
            return Err(DriverError::InvalidMode {
                expected: "no motion stream",
                actual: self.mode,
            });
        }

        let request = Outgoing::Report(self.report_request(strategy.request_joints()));
        self.unsent = None;
        self.send_or_defer(request)?;
        self.mode = AcquisitionMode::BackgroundPending(strategy);
        Ok(())
    }

    /// 检查后台请求的数据
    pub fn poll_background(&mut self) -> Result<Acquisition, DriverError> {
        let AcquisitionMode::BackgroundPending(strategy) = self.mode else {
            return Err(DriverError::InvalidMode {
                expected: "background request pending",
                actual: self.mode,
            });
        };
        if !self.resend_unsent()? {
            return Ok(Acquisition::NoPacketYet);
        }

        match self.link.poll_frame(PollMode::Background) {
            Ok(Some(frame)) => {
                self.apply_frame(frame, strategy);
                Ok(Acquisition::Updated)
            },
            Ok(None) => Ok(Acquisition::NoPacketYet),
            Err(e) => match self.recover(e)? {
                Directive::Retry => {
                    // 原请求的响应已丢失，重发
                    let request = Outgoing::Report(self.report_request(strategy.request_joints()));
                    self.send_or_defer(request)?;
                    Ok(Acquisition::NoPacketYet)
                },
                Directive::Abort(code) => Err(DriverError::Aborted(code)),
                Directive::Suppress(code) => Ok(Acquisition::suppressed(code)),
            },
        }
    }

    /// 开始运动触发流，使用策略对应的关节子集
    pub fn start_motion(
        &mut self,
        strategy: CalcStrategy,
        motion_threshold: u32,
        min_interval_ms: u32,
        buttons_active: bool,
    ) -> Result<(), DriverError> {
        self.start_motion_stream(
            strategy,
            strategy.motion_joints(),
            motion_threshold,
            min_interval_ms,
            buttons_active,
        )
    }

    /// 开始运动触发流
    ///
    /// - `motion_threshold`: 任一编码器变化多少脉冲触发新帧，0 表示运动不触发
    /// - `min_interval_ms`: 两帧之间的最小间隔
    /// - `buttons_active`: 按键状态变化是否触发新帧
    pub fn start_motion_stream(
        &mut self,
        strategy: CalcStrategy,
        joints: JointSubset,
        motion_threshold: u32,
        min_interval_ms: u32,
        buttons_active: bool,
    ) -> Result<(), DriverError> {
        self.ensure_connected()?;
        if self.mode.is_streaming() {
            self.end_motion_stream();
        }

        let config = MotionReportConfig::uniform(
            self.report_request(joints),
            motion_threshold,
            min_interval_ms,
            buttons_active,
        );
        self.unsent = None;
        self.send_or_defer(Outgoing::Motion(config))?;
        self.mode = AcquisitionMode::MotionStreaming(strategy);
        info!(
            "Motion stream started: {:?}, {} joints, threshold {}, interval {} ms",
            strategy,
            joints.count(),
            motion_threshold,
            min_interval_ms
        );
        Ok(())
    }

    /// 检查运动触发流中的数据
    pub fn poll_motion(&mut self) -> Result<Acquisition, DriverError> {
        let AcquisitionMode::MotionStreaming(strategy) = self.mode else {
            return Err(DriverError::InvalidMode {
                expected: "motion stream",
                actual: self.mode,
            });
        };
        if !self.resend_unsent()? {
            return Ok(Acquisition::NoPacketYet);
        }

        match self.link.poll_frame(PollMode::Motion) {
            Ok(Some(frame)) => {
                self.apply_frame(frame, strategy);
                Ok(Acquisition::Updated)
            },
            Ok(None) => Ok(Acquisition::NoPacketYet),
            Err(e) => match self.recover(e)? {
                Directive::Retry => Ok(Acquisition::NoPacketYet),
                Directive::Abort(code) => Err(DriverError::Aborted(code)),
                Directive::Suppress(code) => Ok(Acquisition::suppressed(code)),
            },
        }
    }

    /// 取消运动触发流并丢弃未解析的数据
    pub fn end_motion_stream(&mut self) {
        self.link.cancel_motion_reporting(true);
        if self.mode.is_streaming() {
            info!("Motion stream ended");
        }
        self.mode = AcquisitionMode::Idle;
        self.unsent = None;
    }

    fn apply_frame(&mut self, frame: FrameMeta, strategy: CalcStrategy) {
        match frame.joint_subset() {
            Some(subset) => {
                self.joints.decode(&frame.encoders, subset, &self.scale);
                self.engine.update(
                    strategy,
                    &self.joints,
                    subset,
                    &self.constants,
                    self.options.angle_format,
                    self.options.angle_units,
                );
            },
            None => trace!("Frame without joint updates, buttons {:#04b}", frame.buttons),
        }
        self.handlers.notify_success();
        self.last_frame = Some(frame);
    }

    fn report_request(&self, joints: JointSubset) -> ReportRequest {
        ReportRequest {
            timer: self.options.report_timer,
            analog_count: self.options.analog_reports,
            joints,
        }
    }

    // ==================== 失败处理 ====================

    fn recover(&mut self, error: LinkError) -> Result<Directive, DriverError> {
        let Some(kind) = FailureKind::from_link_error(&error) else {
            return Err(error.into());
        };
        debug!("Link failure ({:?}): {}", kind, error);
        let directive = self.handlers.dispatch(kind, &mut self.link);
        if let Directive::Abort(code) = directive {
            warn!("{:?} failure aborted with {}", kind, code);
        }
        Ok(directive)
    }

    /// 执行链路操作，失败时按处理器指令重试或终止
    ///
    /// 被吞掉的失败视为暂时性的，操作会重新执行，直到成功或处理器放弃。
    fn with_recovery<T>(
        &mut self,
        mut op: impl FnMut(&mut L) -> Result<T, LinkError>,
    ) -> Result<T, DriverError> {
        loop {
            match op(&mut self.link) {
                Ok(value) => return Ok(value),
                Err(e) => match self.recover(e)? {
                    Directive::Retry => continue,
                    Directive::Suppress(code) => {
                        trace!("Suppressed link failure ({}), retrying", code);
                        continue;
                    },
                    Directive::Abort(code) => return Err(DriverError::Aborted(code)),
                },
            }
        }
    }

    /// 发出请求
    ///
    /// 处理器吞掉失败时返回其结果码，请求没有送达。
    fn issue(&mut self, outgoing: Outgoing) -> Result<Option<ResultCode>, DriverError> {
        loop {
            let sent = match outgoing {
                Outgoing::Report(request) => self.link.send_command(request),
                Outgoing::Motion(config) => self.link.arm_motion_reporting(&config),
            };
            match sent {
                Ok(()) => return Ok(None),
                Err(e) => match self.recover(e)? {
                    Directive::Retry => continue,
                    Directive::Abort(code) => return Err(DriverError::Aborted(code)),
                    Directive::Suppress(code) => return Ok(Some(code)),
                },
            }
        }
    }

    /// 发出请求，被吞掉时留到下次轮询重发
    fn send_or_defer(&mut self, outgoing: Outgoing) -> Result<(), DriverError> {
        if let Some(code) = self.issue(outgoing)? {
            debug!("Request deferred after suppressed failure ({})", code);
            self.unsent = Some(outgoing);
        }
        Ok(())
    }

    /// 重发被推迟的请求；返回 `false` 表示仍未送达
    fn resend_unsent(&mut self) -> Result<bool, DriverError> {
        let Some(outgoing) = self.unsent.take() else {
            return Ok(true);
        };
        self.send_or_defer(outgoing)?;
        Ok(self.unsent.is_none())
    }

    fn ensure_connected(&self) -> Result<(), DriverError> {
        if self.connected {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }

    // ==================== 选项 ====================

    /// 切换长度单位
    ///
    /// 由保存的原始参数块重新推导常量，覆盖值和测针类型随之重新应用。
    /// 自定义测针增量按新单位换算。已有的位姿要到下一帧才会更新。
    pub fn set_length_units(&mut self, units: LengthUnits) -> Result<(), DriverError> {
        let previous = self.options.length_units;
        if units == previous {
            return Ok(());
        }
        if let StylusTip::Custom(delta) = self.options.stylus_tip {
            self.options.stylus_tip = StylusTip::Custom(delta / previous.factor() * units.factor());
        }
        self.options.length_units = units;
        self.rebuild_constants()
    }

    pub fn set_angle_units(&mut self, units: AngleUnits) {
        self.options.angle_units = units;
    }

    pub fn set_angle_format(&mut self, format: AngleFormat) {
        self.options.angle_format = format;
    }

    /// 切换测针类型
    pub fn set_stylus_tip(&mut self, tip: StylusTip) {
        self.options.stylus_tip = tip;
        adjust_stylus_length(&mut self.constants, tip, self.options.length_units);
    }

    /// 替换测针标定覆盖值
    pub fn set_tip_overrides(&mut self, overrides: TipOverrides) -> Result<(), DriverError> {
        self.overrides = overrides;
        self.rebuild_constants()
    }

    /// 之后的请求附带（或不附带）设备计时器
    pub fn report_timer(&mut self, enabled: bool) {
        self.options.report_timer = enabled;
    }

    pub fn skip_timer(&mut self) {
        self.report_timer(false);
    }

    /// 之后的请求附带的模拟量数量，0 表示不附带
    pub fn report_analog(&mut self, count: u8) {
        self.options.analog_reports = count.min(NUM_ANALOGS as u8);
    }

    pub fn skip_analog(&mut self) {
        self.report_analog(0);
    }

    // ==================== 访问器 ====================

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn handlers(&self) -> &FailureHandlerRegistry {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut FailureHandlerRegistry {
        &mut self.handlers
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn tip_overrides(&self) -> &TipOverrides {
        &self.overrides
    }

    pub fn constants(&self) -> &ArmConstants {
        &self.constants
    }

    pub fn encoder_scale(&self) -> &EncoderScale {
        &self.scale
    }

    pub fn device_strings(&self) -> Option<&DeviceStrings> {
        self.device.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    pub fn joints(&self) -> &JointState {
        &self.joints
    }

    pub fn pose(&self) -> &Pose {
        self.engine.pose()
    }

    /// 测针尖位置（当前长度单位）
    pub fn tip_position(&self) -> Vector3 {
        self.engine.pose().position
    }

    /// 测针姿态角（当前角度单位与格式）
    pub fn tip_orientation(&self) -> Vector3 {
        self.engine.pose().orientation
    }

    /// 最近一帧的元信息
    pub fn last_frame(&self) -> Option<&FrameMeta> {
        self.last_frame.as_ref()
    }

    /// 最近一帧的踏板/按键位图
    pub fn buttons(&self) -> u8 {
        self.last_frame.as_ref().map_or(0, |frame| frame.buttons)
    }

    /// 最近一帧的设备计时器（仅在请求了计时器时存在）
    pub fn timer(&self) -> Option<u32> {
        self.last_frame.as_ref().and_then(|frame| frame.timer)
    }

    /// 最近一帧的模拟量读数
    pub fn analogs(&self) -> &[u16] {
        match &self.last_frame {
            Some(frame) => &frame.analogs,
            None => &[],
        }
    }
}

impl<L: ArmLink + std::fmt::Debug> std::fmt::Debug for ArmSession<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmSession")
            .field("link", &self.link)
            .field("connected", &self.connected)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
