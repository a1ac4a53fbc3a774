//! 客户端接口模块
//!
//! 本模块在采集会话之上提供数字化采集的便捷接口：
//! - 踏板边沿检测（按住只报告一次）
//! - 按距离阈值自动采样
//! - 折线收集
//!
//! 消抖状态由每个 [`DigitizingSession`] 自己持有，多个会话互不影响。

pub mod digitize;
pub mod polyline;

pub use digitize::{DigitizingSession, PedalDebounceState, PedalEvent};
pub use polyline::{Polyline, PolylineCollector};
