//! 折线采集
//!
//! 把踏板事件整理成折线：左踏板开始或延长当前折线，右踏板追加当前点并结束。

use crate::digitize::PedalEvent;
use scribe_protocol::Vector3;

/// 一条折线
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polyline {
    pub points: Vec<Vector3>,
}

impl Polyline {
    /// 各段长度之和
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// 折线收集器
#[derive(Debug, Clone, Default)]
pub struct PolylineCollector {
    current: Option<Polyline>,
    finished: Vec<Polyline>,
}

impl PolylineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 处理一次采样结果
    ///
    /// 右踏板结束当前折线时返回这条折线；没有进行中的折线时右踏板被忽略。
    pub fn feed(&mut self, event: PedalEvent, point: Vector3) -> Option<&Polyline> {
        match event {
            PedalEvent::None => None,
            PedalEvent::Left => {
                self.current
                    .get_or_insert_with(Polyline::default)
                    .points
                    .push(point);
                None
            },
            PedalEvent::Right => {
                let mut polyline = self.current.take()?;
                polyline.points.push(point);
                self.finished.push(polyline);
                self.finished.last()
            },
        }
    }

    /// 撤销当前折线的最后一个点
    ///
    /// 返回撤销后的最后一个点，可以用它更新采集会话的上一个采样点。
    pub fn undo_last(&mut self) -> Option<Vector3> {
        let current = self.current.as_mut()?;
        current.points.pop();
        let last = current.points.last().copied();
        if current.points.is_empty() {
            self.current = None;
        }
        last
    }

    /// 进行中的折线
    pub fn current(&self) -> Option<&Polyline> {
        self.current.as_ref()
    }

    pub fn finished(&self) -> &[Polyline] {
        &self.finished
    }

    /// 取走所有已完成的折线
    pub fn take_finished(&mut self) -> Vec<Polyline> {
        std::mem::take(&mut self.finished)
    }
}
