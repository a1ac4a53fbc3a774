//! 文件配置到会话构建器的映射

use crate::SdkError;
use scribe_driver::{ArmSession, ArmSessionBuilder, RecoveryPrompt, StylusTip};
use scribe_link::ArmLink;
use scribe_tools::{SessionConfig, TipConfig};
use std::sync::Arc;
use tracing::{debug, info};

/// 配置中的测针类型对应的测针策略
pub fn stylus_tip(tip: TipConfig) -> StylusTip {
    match tip {
        TipConfig::Point => StylusTip::Point,
        TipConfig::Ball => StylusTip::Ball,
        TipConfig::Custom { delta } => StylusTip::Custom(delta),
    }
}

/// 把 [`SessionConfig`] 应用到会话构建器
pub trait ApplyConfig: Sized {
    /// 设置单位、姿态角格式、测针、报告标志，并读取测针覆盖值文件
    ///
    /// 串口号和波特率不在这里使用，连接时由调用方传入。
    fn apply_config(self, config: &SessionConfig) -> Result<Self, SdkError>;
}

impl<L: ArmLink> ApplyConfig for ArmSessionBuilder<L> {
    fn apply_config(self, config: &SessionConfig) -> Result<Self, SdkError> {
        config.validate()?;
        let analogs = u8::try_from(config.analog_reports).map_err(|_| {
            scribe_tools::ConfigError::InvalidValue {
                field: "analog_reports".to_string(),
                value: config.analog_reports.to_string(),
            }
        })?;

        let mut builder = self
            .length_units(config.length_units()?)
            .angle_units(config.angle_units()?)
            .angle_format(config.angle_format()?)
            .stylus_tip(stylus_tip(config.tip))
            .report_timer(config.report_timer)
            .analog_reports(analogs);

        if let Some(file) = config.load_tip_overrides()? {
            debug!("Tip overrides from file: {:?}", file.overrides());
            builder = builder.tip_override_source(&file);
        }
        Ok(builder)
    }
}

/// 按配置构造会话并连接到配置的串口
pub fn connect_from_config<L: ArmLink>(
    link: L,
    config: &SessionConfig,
    prompt: Arc<dyn RecoveryPrompt>,
) -> Result<ArmSession<L>, SdkError> {
    let session = ArmSessionBuilder::new(link)
        .apply_config(config)?
        .simple_handlers(prompt)
        .connect(config.port, config.baud)?;
    info!(
        "Connected from config: port {}, baud {}, {}",
        session.link().port(),
        session.link().baud(),
        session.options().length_units
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use scribe_driver::NonInteractive;
    use scribe_link::{MockDevice, MockLink};
    use scribe_protocol::{AngleFormat, AngleUnits, LengthUnits, STYLUS};

    #[test]
    fn test_tip_mapping() {
        assert_eq!(stylus_tip(TipConfig::Point), StylusTip::Point);
        assert_eq!(stylus_tip(TipConfig::Ball), StylusTip::Ball);
        assert_eq!(
            stylus_tip(TipConfig::Custom { delta: 2.0 }),
            StylusTip::Custom(2.0)
        );
    }

    #[test]
    fn test_apply_config_sets_options() {
        let config = SessionConfig::from_toml_str(
            "length_units = \"inches\"\nangle_units = \"radians\"\nangle_format = \"zxy_euler\"\nreport_timer = true\nanalog_reports = 2\n",
        )
        .unwrap();
        let session = ArmSessionBuilder::new(MockLink::new(MockDevice::standard()))
            .apply_config(&config)
            .unwrap()
            .build();
        let options = session.options();
        assert_eq!(options.length_units, LengthUnits::Inches);
        assert_eq!(options.angle_units, AngleUnits::Radians);
        assert_eq!(options.angle_format, AngleFormat::ZxyEuler);
        assert!(options.report_timer);
        assert_eq!(options.analog_reports, 2);
    }

    #[test]
    fn test_connect_from_config_custom_tip() {
        let config = SessionConfig {
            length_units: "inches".to_string(),
            tip: TipConfig::Custom { delta: 0.5 },
            ..Default::default()
        };
        let session = connect_from_config(
            MockLink::new(MockDevice::standard()),
            &config,
            Arc::new(NonInteractive),
        )
        .unwrap();
        assert!(session.is_connected());
        assert_abs_diff_eq!(session.constants().d[STYLUS], 4.0, epsilon = 1e-9);
        assert_eq!(session.handlers().len(), 6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SessionConfig {
            angle_units: "gradians".to_string(),
            ..Default::default()
        };
        let result = ArmSessionBuilder::new(MockLink::new(MockDevice::standard()))
            .apply_config(&config);
        assert!(matches!(result, Err(SdkError::Config(_))));
    }
}
