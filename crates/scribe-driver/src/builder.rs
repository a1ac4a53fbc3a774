//! Builder 模式实现
//!
//! 提供链式构造 `ArmSession` 实例的便捷方式。

use crate::error::DriverError;
use crate::handlers::{FailureHandlerRegistry, RecoveryPrompt};
use crate::kinematics::StylusTip;
use crate::session::{ArmSession, SessionOptions};
use scribe_link::ArmLink;
use scribe_protocol::{AngleFormat, AngleUnits, LengthUnits, TipOverrideSource, TipOverrides};
use std::sync::Arc;

/// ArmSession Builder（链式构造）
///
/// # Example
///
/// ```
/// use scribe_driver::{ArmSessionBuilder, NonInteractive, StylusTip};
/// use scribe_link::{MockDevice, MockLink};
/// use scribe_protocol::LengthUnits;
/// use std::sync::Arc;
///
/// let session = ArmSessionBuilder::new(MockLink::new(MockDevice::standard()))
///     .length_units(LengthUnits::Inches)
///     .stylus_tip(StylusTip::Ball)
///     .simple_handlers(Arc::new(NonInteractive))
///     .connect(1, 9600)
///     .unwrap();
/// assert!(session.is_connected());
/// ```
pub struct ArmSessionBuilder<L: ArmLink> {
    link: L,
    options: SessionOptions,
    overrides: TipOverrides,
    handlers: FailureHandlerRegistry,
}

impl<L: ArmLink> ArmSessionBuilder<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            options: SessionOptions::default(),
            overrides: TipOverrides::default(),
            handlers: FailureHandlerRegistry::new(),
        }
    }

    /// 一次性设置全部选项
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn length_units(mut self, units: LengthUnits) -> Self {
        self.options.length_units = units;
        self
    }

    pub fn angle_units(mut self, units: AngleUnits) -> Self {
        self.options.angle_units = units;
        self
    }

    pub fn angle_format(mut self, format: AngleFormat) -> Self {
        self.options.angle_format = format;
        self
    }

    pub fn stylus_tip(mut self, tip: StylusTip) -> Self {
        self.options.stylus_tip = tip;
        self
    }

    pub fn report_timer(mut self, enabled: bool) -> Self {
        self.options.report_timer = enabled;
        self
    }

    pub fn analog_reports(mut self, count: u8) -> Self {
        self.options.analog_reports = count;
        self
    }

    pub fn tip_overrides(mut self, overrides: TipOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// 从键值来源读取测针覆盖值（如覆盖值文件）
    pub fn tip_override_source(mut self, source: &dyn TipOverrideSource) -> Self {
        self.overrides = TipOverrides::from_source(source);
        self
    }

    pub fn handlers(mut self, handlers: FailureHandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// 为全部失败类别安装简单处理器
    pub fn simple_handlers(mut self, prompt: Arc<dyn RecoveryPrompt>) -> Self {
        self.handlers.install_simple(prompt);
        self
    }

    /// 构造未连接的会话
    pub fn build(self) -> ArmSession<L> {
        let mut session =
            ArmSession::with_options(self.link, self.options, self.overrides, self.handlers);
        session.report_analog(self.options.analog_reports);
        session
    }

    /// 构造会话并立即连接
    pub fn connect(self, port: u32, baud: u32) -> Result<ArmSession<L>, DriverError> {
        let mut session = self.build();
        session.connect(port, baud)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultCode;
    use approx::assert_abs_diff_eq;
    use scribe_link::{LinkError, MockDevice, MockLink};
    use scribe_protocol::STYLUS;
    use std::collections::HashMap;

    #[test]
    fn test_builder_defaults() {
        let session = ArmSessionBuilder::new(MockLink::new(MockDevice::standard())).build();
        let options = session.options();
        assert_eq!(options.length_units, LengthUnits::Millimeters);
        assert_eq!(options.angle_units, AngleUnits::Degrees);
        assert_eq!(options.angle_format, AngleFormat::XyzFixed);
        assert_eq!(options.stylus_tip, StylusTip::Point);
        assert!(!options.report_timer);
        assert!(session.handlers().is_empty());
        assert!(!session.is_connected());
    }

    #[test]
    fn test_builder_connect_with_overrides() {
        let mut source = HashMap::new();
        source.insert("D5Delta".to_string(), 0.5);
        let session = ArmSessionBuilder::new(MockLink::new(MockDevice::standard()))
            .length_units(LengthUnits::Inches)
            .tip_override_source(&source)
            .stylus_tip(StylusTip::Ball)
            .connect(1, 9600)
            .unwrap();
        assert_abs_diff_eq!(session.constants().d5_point, 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(session.constants().d[STYLUS], 4.242, epsilon = 1e-9);
    }

    #[test]
    fn test_builder_connect_failure() {
        let mut link = MockLink::new(MockDevice::standard());
        link.fail_next_connect(LinkError::HandshakeFailed);
        let err = ArmSessionBuilder::new(link).connect(1, 9600).unwrap_err();
        assert_eq!(err.code(), ResultCode::HandshakeFailed);
    }

    #[test]
    fn test_builder_clamps_analogs() {
        let session = ArmSessionBuilder::new(MockLink::new(MockDevice::standard()))
            .analog_reports(42)
            .build();
        assert_eq!(session.options().analog_reports, 8);
    }
}
