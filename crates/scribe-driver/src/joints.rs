//! 关节角解析
//!
//! 编码器原始计数先按量程屏蔽，再换算为弧度和角度：
//!
//! ```text
//! hex = raw & max[i]
//! rad = hex * 2π / (max[i] + 1)
//! deg = hex * 360 / (max[i] + 1)
//! ```

use scribe_protocol::{JointSubset, NUM_DOF};
use std::f64::consts::TAU;

/// 编码器量程与换算系数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderScale {
    max_counts: [u32; NUM_DOF],
    radians_per_count: [f64; NUM_DOF],
    degrees_per_count: [f64; NUM_DOF],
}

impl Default for EncoderScale {
    fn default() -> Self {
        Self::from_max_counts([0; NUM_DOF])
    }
}

impl EncoderScale {
    /// 由设备上报的每个关节最大计数构造
    pub fn from_max_counts(max_counts: [u32; NUM_DOF]) -> Self {
        let mut radians_per_count = [0.0; NUM_DOF];
        let mut degrees_per_count = [0.0; NUM_DOF];
        for i in 0..NUM_DOF {
            let counts_per_rev = f64::from(max_counts[i]) + 1.0;
            radians_per_count[i] = TAU / counts_per_rev;
            degrees_per_count[i] = 360.0 / counts_per_rev;
        }
        Self {
            max_counts,
            radians_per_count,
            degrees_per_count,
        }
    }

    pub fn max_counts(&self) -> &[u32; NUM_DOF] {
        &self.max_counts
    }

    /// 屏蔽后的计数
    #[inline]
    pub fn mask(&self, joint: usize, raw: u32) -> u32 {
        raw & self.max_counts[joint]
    }
}

/// 当前关节角
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointState {
    pub rad: [f64; NUM_DOF],
    pub deg: [f64; NUM_DOF],
}

impl JointState {
    /// 解析本帧更新的关节
    ///
    /// 只改写 `subset` 覆盖的关节，其余关节保持上一次的值。
    pub fn decode(&mut self, raw: &[u32; NUM_DOF], subset: JointSubset, scale: &EncoderScale) {
        for i in 0..subset.count() {
            let hex = f64::from(scale.mask(i, raw[i]));
            self.rad[i] = hex * scale.radians_per_count[i];
            self.deg[i] = hex * scale.degrees_per_count[i];
        }
    }
}
