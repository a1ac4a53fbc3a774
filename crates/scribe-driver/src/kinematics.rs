//! 正运动学
//!
//! 按 Denavit–Hartenberg 约定把关节角变换为测针尖的位置与姿态。
//! 每个关节的变换矩阵 `M[i]` 由关节角 θ 和常量 (A, D, ALPHA) 给出；
//! 肘关节（索引 2）额外叠加一个绕 y 轴的扭转角 BETA。
//!
//! 累积变换 `T[k] = T[k-1] · M[k]`，最终的 `T` 即基座到测针尖的变换，
//! 其平移列为测针尖位置，旋转部分按 [`AngleFormat`] 提取姿态角。

use crate::joints::JointState;
use crate::mode::CalcStrategy;
use nalgebra::Matrix4;
use scribe_protocol::{
    AngleFormat, AngleUnits, ArmConstants, BALL_TIP_OFFSET_INCHES, ELBOW, JointSubset,
    LengthUnits, NUM_DOF, OrientationFormula, STYLUS, Vector3,
};
use tracing::trace;

/// 关节角正余弦缓存
///
/// 只重新计算本帧更新的关节，其余关节沿用上一次的值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrigCache {
    sin: [f64; NUM_DOF],
    cos: [f64; NUM_DOF],
}

impl Default for TrigCache {
    fn default() -> Self {
        Self {
            sin: [0.0; NUM_DOF],
            cos: [1.0; NUM_DOF],
        }
    }
}

impl TrigCache {
    pub fn update(&mut self, rad: &[f64; NUM_DOF], subset: JointSubset) {
        for i in 0..subset.count() {
            let (s, c) = rad[i].sin_cos();
            self.sin[i] = s;
            self.cos[i] = c;
        }
    }

    #[inline]
    pub fn sin(&self, joint: usize) -> f64 {
        self.sin[joint]
    }

    #[inline]
    pub fn cos(&self, joint: usize) -> f64 {
        self.cos[joint]
    }
}

/// 单个关节的 DH 变换矩阵
pub fn link_transform(joint: usize, trig: &TrigCache, constants: &ArmConstants) -> Matrix4<f64> {
    let (s, c) = (trig.sin(joint), trig.cos(joint));
    let (sa, ca) = (constants.sin_alpha(joint), constants.cos_alpha(joint));
    let a = constants.a[joint];
    let d = constants.d[joint];

    if joint == ELBOW {
        let (sb, cb) = constants.beta.sin_cos();
        Matrix4::new(
            c * cb,
            -s * cb,
            sb,
            sb * d + a,
            s * ca + sa * sb * c,
            c * ca - sa * sb * s,
            -sa * cb,
            -sa * cb * d,
            s * sa - ca * sb * c,
            c * sa + s * sb * ca,
            ca * cb,
            cb * ca * d,
            0.0,
            0.0,
            0.0,
            1.0,
        )
    } else {
        Matrix4::new(
            c,
            -s,
            0.0,
            a,
            s * ca,
            c * ca,
            -sa,
            -sa * d,
            s * sa,
            c * sa,
            ca,
            ca * d,
            0.0,
            0.0,
            0.0,
            1.0,
        )
    }
}

/// 齐次变换的平移部分
#[inline]
pub fn translation(t: &Matrix4<f64>) -> Vector3 {
    Vector3::new(t[(0, 3)], t[(1, 3)], t[(2, 3)])
}

/// 从累积变换中提取姿态角
///
/// 奇异位形下 `atan2(0, 0)` 返回 0，不做特殊处理。
pub fn orientation(t: &Matrix4<f64>, format: AngleFormat, units: AngleUnits) -> Vector3 {
    let r = |row: usize, col: usize| t[(row, col)];
    let (x, y, z) = match format.formula() {
        OrientationFormula::A => (
            r(2, 1).atan2(r(2, 2)),
            (-r(2, 0)).atan2(r(0, 0).hypot(r(1, 0))),
            r(1, 0).atan2(r(0, 0)),
        ),
        OrientationFormula::B => (
            (-r(1, 2)).atan2(r(0, 2).hypot(r(2, 2))),
            r(0, 2).atan2(r(2, 2)),
            r(1, 0).atan2(r(1, 1)),
        ),
        OrientationFormula::C => (
            (-r(1, 2)).atan2(r(2, 2)),
            r(0, 2).atan2(r(1, 2).hypot(r(2, 2))),
            (-r(0, 1)).atan2(r(0, 0)),
        ),
    };
    let angles = Vector3::new(x, y, z);
    match units {
        AngleUnits::Radians => angles,
        AngleUnits::Degrees => Vector3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()),
    }
}

/// 测针类型
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StylusTip {
    /// 标准尖头
    #[default]
    Point,
    /// 0.242 英寸球头
    Ball,
    /// 自定义长度增量（当前长度单位）
    Custom(f64),
}

/// 按测针类型设置 `D[5]`
///
/// 始终以 `d5_point` 为基准，重复调用不会累积。
pub fn adjust_stylus_length(constants: &mut ArmConstants, tip: StylusTip, units: LengthUnits) {
    constants.d[STYLUS] = match tip {
        StylusTip::Point => constants.d5_point,
        StylusTip::Ball => constants.d5_point + BALL_TIP_OFFSET_INCHES * units.factor(),
        StylusTip::Custom(delta) => constants.d5_point + delta,
    };
}

/// 一次计算得到的位姿
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// 各关节的 DH 变换
    pub links: [Matrix4<f64>; NUM_DOF],
    /// 基座到测针尖的累积变换
    pub transform: Matrix4<f64>,
    /// 每个连杆末端在基座坐标系中的位置
    pub endpoints: [Vector3; NUM_DOF],
    pub position: Vector3,
    pub orientation: Vector3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            links: [Matrix4::identity(); NUM_DOF],
            transform: Matrix4::identity(),
            endpoints: [Vector3::ZERO; NUM_DOF],
            position: Vector3::ZERO,
            orientation: Vector3::ZERO,
        }
    }
}

/// 变换引擎
///
/// 持有正余弦缓存和最近一次的位姿。同一组输入重复计算的结果逐位相同。
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    trig: TrigCache,
    pose: Pose,
}

impl TransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn trig(&self) -> &TrigCache {
        &self.trig
    }

    /// 刷新正余弦缓存
    pub fn compute_trig(&mut self, joints: &JointState, subset: JointSubset) {
        self.trig.update(&joints.rad, subset);
    }

    /// 由当前缓存计算全部 `M[i]`
    pub fn compute_link_transforms(&mut self, constants: &ArmConstants) {
        for i in 0..NUM_DOF {
            self.pose.links[i] = link_transform(i, &self.trig, constants);
        }
    }

    /// 串联 `M[i]` 得到累积变换与各连杆端点
    pub fn compose_chain(&mut self) {
        let mut t = self.pose.links[0];
        self.pose.endpoints[0] = translation(&t);
        for i in 1..NUM_DOF {
            t *= self.pose.links[i];
            self.pose.endpoints[i] = translation(&t);
        }
        self.pose.transform = t;
        self.pose.position = translation(&t);
    }

    /// 按策略完成一帧的计算
    ///
    /// 关节角已由调用者解析；`subset` 是本帧实际更新的关节。
    pub fn update(
        &mut self,
        strategy: CalcStrategy,
        joints: &JointState,
        subset: JointSubset,
        constants: &ArmConstants,
        format: AngleFormat,
        units: AngleUnits,
    ) {
        if !strategy.computes_position() {
            return;
        }
        self.compute_trig(joints, subset);
        self.compute_link_transforms(constants);
        self.compose_chain();
        if strategy.computes_orientation() {
            self.pose.orientation = orientation(&self.pose.transform, format, units);
        }
        trace!(
            "Pose updated ({:?}): position {}, orientation {}",
            strategy, self.pose.position, self.pose.orientation
        );
    }
}
