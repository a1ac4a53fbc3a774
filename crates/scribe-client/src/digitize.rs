//! 逐点采集
//!
//! 基于前台取数的踏板边沿检测。踏板按住期间只在按下的那一刻报告一次，
//! 松开后再次按下才会再报告。
//!
//! 按距离采集时，左踏板按住并移动测针，每当测针尖离上一个采样点的距离
//! 达到阈值就采一个点；右踏板只做消抖、不受距离限制，因此总能用来结束
//! 一段采集。

use scribe_driver::{ArmSession, CalcStrategy, DriverError};
use scribe_link::ArmLink;
use scribe_protocol::{LEFT_PEDAL, RIGHT_PEDAL, Vector3};
use tracing::debug;

/// 一次采样报告的踏板事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PedalEvent {
    #[default]
    None,
    Right,
    Left,
}

impl PedalEvent {
    /// 设备 SDK 的踏板编码：0 / `RIGHT_PEDAL` / `LEFT_PEDAL`
    pub fn code(self) -> u8 {
        match self {
            PedalEvent::None => 0,
            PedalEvent::Right => RIGHT_PEDAL,
            PedalEvent::Left => LEFT_PEDAL,
        }
    }

    pub fn is_press(self) -> bool {
        self != PedalEvent::None
    }
}

impl From<PedalEvent> for u8 {
    fn from(event: PedalEvent) -> Self {
        event.code()
    }
}

/// 踏板消抖状态
///
/// 每个采集会话各自持有一份，互不影响。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PedalDebounceState {
    /// 逐点采集：任一踏板可报告
    press_armed: bool,
    /// 按距离采集：左踏板下一次按下视为新起点
    left_armed: bool,
    right_armed: bool,
    last_point: Vector3,
    last_distance: f64,
}

impl Default for PedalDebounceState {
    fn default() -> Self {
        Self {
            press_armed: true,
            left_armed: true,
            right_armed: true,
            last_point: Vector3::ZERO,
            last_distance: 0.0,
        }
    }
}

impl PedalDebounceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 逐点采集的边沿检测
    ///
    /// 只有单独按下左或右踏板才算按下；两个同时按下等同于松开。
    pub fn on_sample(&mut self, buttons: u8) -> PedalEvent {
        let event = match buttons {
            LEFT_PEDAL => PedalEvent::Left,
            RIGHT_PEDAL => PedalEvent::Right,
            _ => {
                self.press_armed = true;
                return PedalEvent::None;
            },
        };
        if self.press_armed {
            self.press_armed = false;
            event
        } else {
            PedalEvent::None
        }
    }

    /// 按距离采集的边沿检测
    ///
    /// - 左踏板：新起点直接采样；之后仅当离上一个采样点不小于 `min_distance` 时采样
    /// - 右踏板：消抖后总是报告，并让左踏板的下一次按下成为新起点
    /// - 其他状态：只重新允许右踏板
    ///
    /// 松开左踏板不会重置起点，再次按下时仍按距离判断。
    pub fn on_sample_at_min_distance(
        &mut self,
        buttons: u8,
        tip: Vector3,
        min_distance: f64,
    ) -> PedalEvent {
        self.last_distance = 0.0;
        match buttons {
            LEFT_PEDAL => {
                if self.left_armed {
                    self.left_armed = false;
                    self.last_point = tip;
                    return PedalEvent::Left;
                }
                self.last_distance = tip.distance_to(&self.last_point);
                if self.last_distance >= min_distance {
                    self.last_point = tip;
                    PedalEvent::Left
                } else {
                    PedalEvent::None
                }
            },
            RIGHT_PEDAL => {
                self.left_armed = true;
                if self.right_armed {
                    self.right_armed = false;
                    PedalEvent::Right
                } else {
                    PedalEvent::None
                }
            },
            _ => {
                self.right_armed = true;
                PedalEvent::None
            },
        }
    }

    /// 上一个采样点
    pub fn last_point(&self) -> Vector3 {
        self.last_point
    }

    /// 替换上一个采样点（撤销最后一个点时使用）
    pub fn set_last_point(&mut self, point: Vector3) {
        self.last_point = point;
    }

    /// 最近一次按距离采集时测得的点间距离，没有测量时为 0
    pub fn last_distance(&self) -> f64 {
        self.last_distance
    }
}

/// 采集会话
///
/// 持有测量臂会话和各自的消抖状态。
pub struct DigitizingSession<L: ArmLink> {
    arm: ArmSession<L>,
    debounce: PedalDebounceState,
}

impl<L: ArmLink> DigitizingSession<L> {
    pub fn new(arm: ArmSession<L>) -> Self {
        Self {
            arm,
            debounce: PedalDebounceState::new(),
        }
    }

    pub fn arm(&self) -> &ArmSession<L> {
        &self.arm
    }

    pub fn arm_mut(&mut self) -> &mut ArmSession<L> {
        &mut self.arm
    }

    pub fn into_inner(self) -> ArmSession<L> {
        self.arm
    }

    pub fn debounce(&self) -> &PedalDebounceState {
        &self.debounce
    }

    /// 测针尖位置（最近一次采样）
    pub fn tip_position(&self) -> Vector3 {
        self.arm.tip_position()
    }

    /// 采一个点并报告踏板按下边沿
    ///
    /// 取数没有得到新数据（被处理器吞掉的失败）时报告 `PedalEvent::None`。
    pub fn sample_point(&mut self) -> Result<PedalEvent, DriverError> {
        if !self.arm.request_foreground(CalcStrategy::Tip3Dof)?.is_updated() {
            return Ok(PedalEvent::None);
        }
        let event = self.debounce.on_sample(self.arm.buttons());
        if event.is_press() {
            debug!("{:?} pedal at {}", event, self.arm.tip_position());
        }
        Ok(event)
    }

    /// 采一个点，左踏板按距离阈值采样
    ///
    /// `min_distance` 使用会话当前的长度单位。
    pub fn sample_point_at_min_distance(
        &mut self,
        min_distance: f64,
    ) -> Result<PedalEvent, DriverError> {
        if !self.arm.request_foreground(CalcStrategy::Tip3Dof)?.is_updated() {
            return Ok(PedalEvent::None);
        }
        let tip = self.arm.tip_position();
        let event = self
            .debounce
            .on_sample_at_min_distance(self.arm.buttons(), tip, min_distance);
        if event.is_press() {
            debug!(
                "{:?} pedal at {} ({:.3} from previous)",
                event,
                tip,
                self.debounce.last_distance()
            );
        }
        Ok(event)
    }

    /// 撤销最后一个采样点后，把上一个采样点改回 `point`
    pub fn undo(&mut self, point: Vector3) {
        self.debounce.set_last_point(point);
    }

    pub fn last_point(&self) -> Vector3 {
        self.debounce.last_point()
    }

    pub fn last_distance(&self) -> f64 {
        self.debounce.last_distance()
    }
}
