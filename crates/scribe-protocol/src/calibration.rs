//! 标定参数块解析
//!
//! 设备在连接时上传一个 36 字节的参数块（格式 `Format DH0.5`），其中依次为
//! 6 个 ALPHA、6 个 A、6 个 D，每个都是大端 16 位有符号定点数：
//!
//! - 角度：`value / 32768 * π`
//! - 长度：`value / 1000`（英寸），再乘以当前长度单位的系数
//!
//! 部分设备还提供扩展参数块，前两个字节为肘关节的额外扭转角 BETA。

use crate::constants::*;
use crate::units::LengthUnits;
use crate::{ProtocolError, bytes_to_i16_be, i16_to_bytes_be};
use std::f64::consts::PI;

/// 外部注入的测针标定覆盖值来源
///
/// 以键值方式查询，缺失的键视为 0。
pub trait TipOverrideSource {
    fn lookup(&self, key: &str) -> Option<f64>;
}

/// 没有任何覆盖值的来源
impl TipOverrideSource for () {
    fn lookup(&self, _key: &str) -> Option<f64> {
        None
    }
}

impl TipOverrideSource for std::collections::HashMap<String, f64> {
    fn lookup(&self, key: &str) -> Option<f64> {
        self.get(key).copied()
    }
}

/// 测针标定覆盖值（英寸）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TipOverrides {
    /// 测针长度增量，加到 `D[5]`
    pub stylus_length: f64,
    /// 倒数第二节偏移增量，从 `D[4]` 中减去
    pub penultimate_link: f64,
    /// 末节连杆长度增量，加到 `A[5]`
    pub final_link_offset: f64,
}

impl TipOverrides {
    pub const STYLUS_LENGTH_KEY: &'static str = "D5Delta";
    pub const PENULTIMATE_LINK_KEY: &'static str = "D4Delta";
    pub const FINAL_LINK_OFFSET_KEY: &'static str = "A5Delta";

    /// 从键值来源读取三个覆盖值
    pub fn from_source(source: &dyn TipOverrideSource) -> Self {
        Self {
            stylus_length: source.lookup(Self::STYLUS_LENGTH_KEY).unwrap_or(0.0),
            penultimate_link: source.lookup(Self::PENULTIMATE_LINK_KEY).unwrap_or(0.0),
            final_link_offset: source.lookup(Self::FINAL_LINK_OFFSET_KEY).unwrap_or(0.0),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.stylus_length == 0.0 && self.penultimate_link == 0.0 && self.final_link_offset == 0.0
    }
}

/// 单台机械臂的 Denavit–Hartenberg 常量
///
/// 连接后由参数块解析得到。长度使用解析时指定的长度单位，角度为弧度。
#[derive(Debug, Clone, PartialEq)]
pub struct ArmConstants {
    /// 连杆长度 `A[i]`
    pub a: [f64; NUM_DOF],
    /// 关节偏移 `D[i]`
    pub d: [f64; NUM_DOF],
    /// 连杆扭转角 `ALPHA[i]`
    pub alpha: [f64; NUM_DOF],
    /// 肘关节（索引 2）的额外扭转角
    pub beta: f64,
    /// 标准尖头测针对应的 `D[5]`
    pub d5_point: f64,
    cos_alpha: [f64; NUM_DOF],
    sin_alpha: [f64; NUM_DOF],
}

impl Default for ArmConstants {
    fn default() -> Self {
        Self::new([0.0; NUM_DOF], [0.0; NUM_DOF], [0.0; NUM_DOF])
    }
}

impl ArmConstants {
    /// 由三组 DH 参数构造，BETA 为 0
    pub fn new(alpha: [f64; NUM_DOF], a: [f64; NUM_DOF], d: [f64; NUM_DOF]) -> Self {
        let mut constants = Self {
            a,
            d,
            alpha,
            beta: 0.0,
            d5_point: d[STYLUS],
            cos_alpha: [1.0; NUM_DOF],
            sin_alpha: [0.0; NUM_DOF],
        };
        constants.recompute_trig();
        constants
    }

    /// 解析标定参数块
    ///
    /// # 错误
    ///
    /// - `ProtocolError::BadFormat`: 格式标签不受支持，或块长度与格式不符
    pub fn decode(
        block: &[u8],
        format_tag: &str,
        units: LengthUnits,
    ) -> Result<Self, ProtocolError> {
        if format_tag.trim() != PARAM_FORMAT_DH0_5 || block.len() != CALIBRATION_BLOCK_LEN {
            return Err(ProtocolError::BadFormat {
                format: format_tag.to_string(),
                len: block.len(),
            });
        }

        let factor = units.factor();
        let word = |i: usize| f64::from(bytes_to_i16_be([block[2 * i], block[2 * i + 1]]));

        let mut alpha = [0.0; NUM_DOF];
        let mut a = [0.0; NUM_DOF];
        let mut d = [0.0; NUM_DOF];
        for i in 0..NUM_DOF {
            alpha[i] = word(i) / ANGLE_FIXED_POINT_SCALE * PI;
            a[i] = word(NUM_DOF + i) / LENGTH_FIXED_POINT_SCALE * factor;
            d[i] = word(2 * NUM_DOF + i) / LENGTH_FIXED_POINT_SCALE * factor;
        }

        Ok(Self::new(alpha, a, d))
    }

    /// 解析扩展参数块中的 BETA
    ///
    /// 只有设备注释中包含 `"Beta"` 且块长度至少为 2 时才返回值。
    pub fn decode_extended(block: &[u8], comment: &str) -> Option<f64> {
        if !comment.contains(BETA_COMMENT_MARKER) || block.len() < 2 {
            return None;
        }
        let raw = bytes_to_i16_be([block[0], block[1]]);
        Some(f64::from(raw) / ANGLE_FIXED_POINT_SCALE * PI)
    }

    /// 应用测针标定覆盖值
    ///
    /// 覆盖值以英寸给出，按 `units` 缩放。`D[5]` 的增量同时计入 `d5_point`，
    /// 这样之后切换测针类型不会丢失标定。
    pub fn apply_tip_overrides(&mut self, overrides: &TipOverrides, units: LengthUnits) {
        if overrides.is_zero() {
            return;
        }
        let factor = units.factor();
        self.d[STYLUS] += overrides.stylus_length * factor;
        self.d5_point += overrides.stylus_length * factor;
        self.d[WRIST] -= overrides.penultimate_link * factor;
        self.a[STYLUS] += overrides.final_link_offset * factor;
        self.recompute_trig();
    }

    /// 重新计算 ALPHA 的正余弦缓存
    pub fn recompute_trig(&mut self) {
        for i in 0..NUM_DOF {
            self.cos_alpha[i] = self.alpha[i].cos();
            self.sin_alpha[i] = self.alpha[i].sin();
        }
    }

    #[inline]
    pub fn cos_alpha(&self, joint: usize) -> f64 {
        self.cos_alpha[joint]
    }

    #[inline]
    pub fn sin_alpha(&self, joint: usize) -> f64 {
        self.sin_alpha[joint]
    }

    /// 编码为 `Format DH0.5` 参数块
    ///
    /// 用于模拟设备。超出 16 位定点范围的值会被截断到边界。
    pub fn encode(&self, units: LengthUnits) -> [u8; CALIBRATION_BLOCK_LEN] {
        let factor = units.factor();
        let to_fixed = |value: f64| -> i16 {
            value
                .round()
                .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
        };

        let mut block = [0u8; CALIBRATION_BLOCK_LEN];
        for i in 0..NUM_DOF {
            let words = [
                (i, to_fixed(self.alpha[i] / PI * ANGLE_FIXED_POINT_SCALE)),
                (
                    NUM_DOF + i,
                    to_fixed(self.a[i] / factor * LENGTH_FIXED_POINT_SCALE),
                ),
                (
                    2 * NUM_DOF + i,
                    to_fixed(self.d[i] / factor * LENGTH_FIXED_POINT_SCALE),
                ),
            ];
            for (slot, value) in words {
                block[2 * slot..2 * slot + 2].copy_from_slice(&i16_to_bytes_be(value));
            }
        }
        block
    }

    /// 将 BETA 编码为扩展参数块
    pub fn encode_extended(beta: f64) -> [u8; 2] {
        let raw = (beta / PI * ANGLE_FIXED_POINT_SCALE)
            .round()
            .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
        i16_to_bytes_be(raw)
    }
}
