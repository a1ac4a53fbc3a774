//! 单位与姿态角约定
//!
//! 长度单位、角度单位和六种姿态角格式。姿态角格式两两对应同一套提取公式
//! （固定角与欧拉角互为逆序），因此实际只有三种数值上不同的公式。

use crate::ProtocolError;
use crate::constants::MM_PER_INCH;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// 长度单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LengthUnits {
    /// 英寸（设备原生单位）
    Inches,
    /// 毫米
    #[default]
    Millimeters,
}

impl LengthUnits {
    /// 相对英寸的缩放系数
    pub fn factor(self) -> f64 {
        match self {
            LengthUnits::Inches => 1.0,
            LengthUnits::Millimeters => MM_PER_INCH,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LengthUnits::Inches => "inches",
            LengthUnits::Millimeters => "mm",
        }
    }
}

impl fmt::Display for LengthUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LengthUnits {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inches" | "inch" | "in" => Ok(LengthUnits::Inches),
            "mm" | "millimeters" | "millimetres" => Ok(LengthUnits::Millimeters),
            other => Err(ProtocolError::InvalidValue {
                field: "length_units".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// 角度单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AngleUnits {
    Radians,
    #[default]
    Degrees,
}

impl AngleUnits {
    pub fn label(self) -> &'static str {
        match self {
            AngleUnits::Radians => "radians",
            AngleUnits::Degrees => "degrees",
        }
    }
}

impl fmt::Display for AngleUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AngleUnits {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "radians" | "rad" => Ok(AngleUnits::Radians),
            "degrees" | "deg" => Ok(AngleUnits::Degrees),
            other => Err(ProtocolError::InvalidValue {
                field: "angle_units".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// 姿态角格式
///
/// 固定角 `XYZ` 与欧拉角 `ZYX` 描述的是同一组旋转，只是解释顺序相反，
/// 因此二者共用同一套提取公式，见 [`AngleFormat::formula`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AngleFormat {
    #[default]
    XyzFixed,
    ZyxFixed,
    YxzFixed,
    ZyxEuler,
    XyzEuler,
    ZxyEuler,
}

/// 姿态提取公式
///
/// - `A`: {XYZ 固定角, ZYX 欧拉角}
/// - `B`: {YXZ 固定角, ZXY 欧拉角}
/// - `C`: {ZYX 固定角, XYZ 欧拉角}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationFormula {
    A,
    B,
    C,
}

impl AngleFormat {
    /// 全部六种格式
    pub const ALL: [AngleFormat; 6] = [
        AngleFormat::XyzFixed,
        AngleFormat::ZyxFixed,
        AngleFormat::YxzFixed,
        AngleFormat::ZyxEuler,
        AngleFormat::XyzEuler,
        AngleFormat::ZxyEuler,
    ];

    /// 该格式对应的提取公式
    pub fn formula(self) -> OrientationFormula {
        match self {
            AngleFormat::XyzFixed | AngleFormat::ZyxEuler => OrientationFormula::A,
            AngleFormat::YxzFixed | AngleFormat::ZxyEuler => OrientationFormula::B,
            AngleFormat::ZyxFixed | AngleFormat::XyzEuler => OrientationFormula::C,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AngleFormat::XyzFixed => "xyz fixed",
            AngleFormat::ZyxFixed => "zyx fixed",
            AngleFormat::YxzFixed => "yxz fixed",
            AngleFormat::ZyxEuler => "zyx Euler",
            AngleFormat::XyzEuler => "xyz Euler",
            AngleFormat::ZxyEuler => "zxy Euler",
        }
    }
}

impl fmt::Display for AngleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AngleFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "xyz_fixed" => Ok(AngleFormat::XyzFixed),
            "zyx_fixed" => Ok(AngleFormat::ZyxFixed),
            "yxz_fixed" => Ok(AngleFormat::YxzFixed),
            "zyx_euler" => Ok(AngleFormat::ZyxEuler),
            "xyz_euler" => Ok(AngleFormat::XyzEuler),
            "zxy_euler" => Ok(AngleFormat::ZxyEuler),
            _ => Err(ProtocolError::InvalidValue {
                field: "angle_format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// 三维向量
///
/// 位置（当前长度单位）和姿态角（当前角度单位）共用此类型。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// 零向量
    pub const ZERO: Self = Vector3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }

    /// 向量长度
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// 到另一点的欧氏距离
    pub fn distance_to(&self, other: &Vector3) -> f64 {
        (*self - *other).norm()
    }
}

impl Add for Vector3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}
