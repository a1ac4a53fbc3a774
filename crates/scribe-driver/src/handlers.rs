//! 失败处理器
//!
//! 链路层每报告一个可恢复的失败，驱动层就查询 [`FailureHandlerRegistry`]，
//! 由对应类别的处理器给出 [`Directive`]：
//!
//! - `Retry`: 重试（处理器可能已修改端口或波特率）
//! - `Abort(code)`: 以该结果码终止本次操作
//! - `Suppress(code)`: 吞掉失败，本次操作以该结果码返回
//!
//! 没有安装处理器的类别直接以自身结果码终止。
//!
//! # 示例
//!
//! ```rust
//! use scribe_driver::handlers::{FailureHandlerRegistry, FailureKind, NonInteractive, TolerateTimeouts};
//! use std::sync::Arc;
//!
//! let mut registry = FailureHandlerRegistry::simple(Arc::new(NonInteractive));
//! let fallback = registry.handler(FailureKind::Timeout).unwrap();
//! registry.set_handler(FailureKind::Timeout, Arc::new(TolerateTimeouts::new(3, fallback)));
//! ```

use crate::error::ResultCode;
use scribe_link::{ArmLink, LinkError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{info, warn};

/// 可恢复失败的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    BadPort,
    BadPacket,
    /// 启动时设备无响应
    NoDeviceResponse,
    /// 无法开始会话
    HandshakeFailed,
    CantOpenPort,
}

impl FailureKind {
    pub const ALL: [FailureKind; 6] = [
        FailureKind::Timeout,
        FailureKind::BadPort,
        FailureKind::BadPacket,
        FailureKind::NoDeviceResponse,
        FailureKind::HandshakeFailed,
        FailureKind::CantOpenPort,
    ];

    /// 该类别的默认结果码
    pub fn code(self) -> ResultCode {
        match self {
            FailureKind::Timeout => ResultCode::Timeout,
            FailureKind::BadPort => ResultCode::BadPort,
            FailureKind::BadPacket => ResultCode::BadPacket,
            FailureKind::NoDeviceResponse => ResultCode::NoDeviceResponse,
            FailureKind::HandshakeFailed => ResultCode::HandshakeFailed,
            FailureKind::CantOpenPort => ResultCode::CantOpenPort,
        }
    }

    /// 链路错误对应的类别；IO 错误和未连接不可恢复，返回 `None`
    pub fn from_link_error(error: &LinkError) -> Option<Self> {
        match error {
            LinkError::Timeout => Some(FailureKind::Timeout),
            LinkError::BadPort(_) => Some(FailureKind::BadPort),
            LinkError::BadPacket => Some(FailureKind::BadPacket),
            LinkError::NoDeviceResponse => Some(FailureKind::NoDeviceResponse),
            LinkError::HandshakeFailed => Some(FailureKind::HandshakeFailed),
            LinkError::CantOpenPort { .. } => Some(FailureKind::CantOpenPort),
            LinkError::Io(_) | LinkError::NotConnected => None,
        }
    }
}

/// 处理器给出的指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Retry,
    Abort(ResultCode),
    Suppress(ResultCode),
}

/// 失败处理器
///
/// 处理器在失败发生的调用栈上同步执行，可以通过 `link` 重置串口、
/// 修改端口参数或取消运动流。
pub trait FailureHandler: Send + Sync {
    fn handle(&self, kind: FailureKind, link: &mut dyn ArmLink) -> Directive;

    /// 收到一帧完整数据后调用（可选）
    fn on_success(&self) {}
}

/// 交互式恢复能力
///
/// 简单处理器通过它询问用户如何恢复。
pub trait RecoveryPrompt: Send + Sync {
    /// 端口无效时询问新的端口号，`None` 表示放弃
    fn replacement_port(&self, port: u32, baud: u32) -> Option<u32>;

    /// 坏包后是否取消运动流并清空缓冲区
    fn flush_after_bad_packet(&self, port: u32, baud: u32) -> bool;

    /// 启动失败（无响应/无法打开端口）时的选择
    fn startup_choice(&self, kind: FailureKind, port: u32, baud: u32) -> StartupChoice;

    /// 无法开始会话时是否断开重连
    fn confirm_restart(&self, port: u32, baud: u32) -> bool;
}

/// 启动失败时的恢复选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupChoice {
    Abort,
    Retry,
    /// 换用新的端口和波特率后重试
    Reconfigure { port: u32, baud: u32 },
}

/// 无人值守的恢复策略：不修改端口，坏包时清空缓冲区，其余一律放弃
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl RecoveryPrompt for NonInteractive {
    fn replacement_port(&self, _port: u32, _baud: u32) -> Option<u32> {
        None
    }

    fn flush_after_bad_packet(&self, _port: u32, _baud: u32) -> bool {
        true
    }

    fn startup_choice(&self, _kind: FailureKind, _port: u32, _baud: u32) -> StartupChoice {
        StartupChoice::Abort
    }

    fn confirm_restart(&self, _port: u32, _baud: u32) -> bool {
        false
    }
}

/// 覆盖全部六类失败的简单处理器
pub struct SimpleHandler {
    prompt: Arc<dyn RecoveryPrompt>,
}

impl SimpleHandler {
    pub fn new(prompt: Arc<dyn RecoveryPrompt>) -> Self {
        Self { prompt }
    }

    fn startup(&self, kind: FailureKind, link: &mut dyn ArmLink) -> Directive {
        match self.prompt.startup_choice(kind, link.port(), link.baud()) {
            StartupChoice::Abort => Directive::Abort(kind.code()),
            StartupChoice::Retry => Directive::Retry,
            StartupChoice::Reconfigure { port, baud } => {
                info!("Retrying on port {} at {} baud", port, baud);
                link.disconnect();
                link.set_com_params(port, baud);
                Directive::Retry
            },
        }
    }
}

impl FailureHandler for SimpleHandler {
    fn handle(&self, kind: FailureKind, link: &mut dyn ArmLink) -> Directive {
        let (port, baud) = (link.port(), link.baud());
        match kind {
            FailureKind::Timeout => {
                link.reset_com();
                warn!("Timed out on port {} at {} baud", port, baud);
                Directive::Abort(ResultCode::Timeout)
            },
            FailureKind::BadPort => match self.prompt.replacement_port(port, baud) {
                Some(new_port) => {
                    info!("Switching from port {} to port {}", port, new_port);
                    link.set_com_params(new_port, baud);
                    Directive::Retry
                },
                None => Directive::Abort(ResultCode::BadPort),
            },
            FailureKind::BadPacket => {
                if self.prompt.flush_after_bad_packet(port, baud) {
                    link.cancel_motion_reporting(true);
                }
                warn!("Bad packet on port {}", port);
                Directive::Abort(ResultCode::BadPacket)
            },
            FailureKind::NoDeviceResponse | FailureKind::CantOpenPort => self.startup(kind, link),
            FailureKind::HandshakeFailed => {
                if self.prompt.confirm_restart(port, baud) {
                    link.disconnect();
                    Directive::Retry
                } else {
                    Directive::Abort(ResultCode::HandshakeFailed)
                }
            },
        }
    }
}

/// 容忍连续超时的处理器
///
/// 连续超时不超过 `max_timeouts` 次时按“数据尚未到达”处理，
/// 超过后交给 `fallback`。收到完整数据后计数清零。
pub struct TolerateTimeouts {
    max_timeouts: u32,
    count: AtomicU32,
    fallback: Arc<dyn FailureHandler>,
}

impl TolerateTimeouts {
    pub fn new(max_timeouts: u32, fallback: Arc<dyn FailureHandler>) -> Self {
        Self {
            max_timeouts,
            count: AtomicU32::new(0),
            fallback,
        }
    }

    /// 当前连续超时次数
    pub fn consecutive_timeouts(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}

impl FailureHandler for TolerateTimeouts {
    fn handle(&self, kind: FailureKind, link: &mut dyn ArmLink) -> Directive {
        if kind != FailureKind::Timeout {
            return self.fallback.handle(kind, link);
        }
        let seen = self.count.fetch_add(1, Ordering::Relaxed);
        if seen < self.max_timeouts {
            Directive::Suppress(ResultCode::NoPacketYet)
        } else {
            self.count.store(0, Ordering::Relaxed);
            self.fallback.handle(kind, link)
        }
    }

    fn on_success(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

/// 按失败类别管理处理器
#[derive(Default, Clone)]
pub struct FailureHandlerRegistry {
    handlers: HashMap<FailureKind, Arc<dyn FailureHandler>>,
}

impl FailureHandlerRegistry {
    /// 不含任何处理器：所有失败都以自身结果码终止
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 为全部六类失败安装简单处理器
    #[must_use]
    pub fn simple(prompt: Arc<dyn RecoveryPrompt>) -> Self {
        let mut registry = Self::new();
        registry.install_simple(prompt);
        registry
    }

    pub fn install_simple(&mut self, prompt: Arc<dyn RecoveryPrompt>) {
        let handler: Arc<dyn FailureHandler> = Arc::new(SimpleHandler::new(prompt));
        for kind in FailureKind::ALL {
            self.handlers.insert(kind, Arc::clone(&handler));
        }
    }

    /// 安装或替换某一类别的处理器，返回被替换的处理器
    pub fn set_handler(
        &mut self,
        kind: FailureKind,
        handler: Arc<dyn FailureHandler>,
    ) -> Option<Arc<dyn FailureHandler>> {
        self.handlers.insert(kind, handler)
    }

    pub fn remove_handler(&mut self, kind: FailureKind) -> Option<Arc<dyn FailureHandler>> {
        self.handlers.remove(&kind)
    }

    pub fn handler(&self, kind: FailureKind) -> Option<Arc<dyn FailureHandler>> {
        self.handlers.get(&kind).cloned()
    }

    /// 分派一次失败
    pub fn dispatch(&self, kind: FailureKind, link: &mut dyn ArmLink) -> Directive {
        match self.handlers.get(&kind) {
            Some(handler) => handler.handle(kind, link),
            None => Directive::Abort(kind.code()),
        }
    }

    /// 通知所有处理器收到了完整数据
    pub fn notify_success(&self) {
        for handler in self.handlers.values() {
            handler.on_success();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for FailureHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort_by_key(|kind| kind.code() as u8);
        f.debug_struct("FailureHandlerRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_link::{MockDevice, MockLink};
    use std::sync::Mutex;

    /// 按脚本回答的恢复能力
    #[derive(Default)]
    struct ScriptedPrompt {
        port: Option<u32>,
        flush: bool,
        startup: Mutex<Vec<StartupChoice>>,
        restart: bool,
    }

    impl RecoveryPrompt for ScriptedPrompt {
        fn replacement_port(&self, _port: u32, _baud: u32) -> Option<u32> {
            self.port
        }

        fn flush_after_bad_packet(&self, _port: u32, _baud: u32) -> bool {
            self.flush
        }

        fn startup_choice(&self, _kind: FailureKind, _port: u32, _baud: u32) -> StartupChoice {
            self.startup.lock().unwrap().pop().unwrap_or(StartupChoice::Abort)
        }

        fn confirm_restart(&self, _port: u32, _baud: u32) -> bool {
            self.restart
        }
    }

    fn link() -> MockLink {
        let mut link = MockLink::new(MockDevice::standard());
        link.connect().unwrap();
        link
    }

    #[test]
    fn test_empty_registry_aborts_with_kind_code() {
        let registry = FailureHandlerRegistry::new();
        let mut link = link();
        for kind in FailureKind::ALL {
            assert_eq!(registry.dispatch(kind, &mut link), Directive::Abort(kind.code()));
        }
    }

    #[test]
    fn test_from_link_error() {
        assert_eq!(
            FailureKind::from_link_error(&LinkError::Timeout),
            Some(FailureKind::Timeout)
        );
        assert_eq!(
            FailureKind::from_link_error(&LinkError::CantOpenPort { port: 1, baud: 9600 }),
            Some(FailureKind::CantOpenPort)
        );
        assert_eq!(FailureKind::from_link_error(&LinkError::NotConnected), None);
    }

    #[test]
    fn test_simple_timeout_resets_com() {
        let registry = FailureHandlerRegistry::simple(Arc::new(NonInteractive));
        let mut link = link();
        link.buffer_raw(&[1, 2, 3]);
        let directive = registry.dispatch(FailureKind::Timeout, &mut link);
        assert_eq!(directive, Directive::Abort(ResultCode::Timeout));
        assert_eq!(link.reset_count(), 1);
        assert_eq!(link.buffered_bytes(), 0);
    }

    #[test]
    fn test_simple_bad_port() {
        let prompt = ScriptedPrompt {
            port: Some(4),
            ..Default::default()
        };
        let registry = FailureHandlerRegistry::simple(Arc::new(prompt));
        let mut link = link();
        assert_eq!(registry.dispatch(FailureKind::BadPort, &mut link), Directive::Retry);
        assert_eq!(link.port(), 4);

        let registry = FailureHandlerRegistry::simple(Arc::new(NonInteractive));
        assert_eq!(
            registry.dispatch(FailureKind::BadPort, &mut link),
            Directive::Abort(ResultCode::BadPort)
        );
    }

    #[test]
    fn test_simple_bad_packet_flush() {
        let prompt = ScriptedPrompt {
            flush: true,
            ..Default::default()
        };
        let registry = FailureHandlerRegistry::simple(Arc::new(prompt));
        let mut link = link();
        link.buffer_raw(&[0xFF; 8]);
        assert_eq!(
            registry.dispatch(FailureKind::BadPacket, &mut link),
            Directive::Abort(ResultCode::BadPacket)
        );
        assert_eq!(link.cancellations(), &[true]);
        assert_eq!(link.buffered_bytes(), 0);

        let registry = FailureHandlerRegistry::simple(Arc::new(ScriptedPrompt::default()));
        registry.dispatch(FailureKind::BadPacket, &mut link);
        assert_eq!(link.cancellations().len(), 1);
    }

    #[test]
    fn test_simple_startup_choices() {
        let prompt = ScriptedPrompt {
            startup: Mutex::new(vec![
                StartupChoice::Abort,
                StartupChoice::Retry,
                StartupChoice::Reconfigure {
                    port: 2,
                    baud: 38400,
                },
            ]),
            ..Default::default()
        };
        let registry = FailureHandlerRegistry::simple(Arc::new(prompt));
        let mut link = link();

        assert_eq!(
            registry.dispatch(FailureKind::NoDeviceResponse, &mut link),
            Directive::Retry
        );
        assert_eq!((link.port(), link.baud()), (2, 38400));
        assert!(!link.is_connected());

        assert_eq!(
            registry.dispatch(FailureKind::CantOpenPort, &mut link),
            Directive::Retry
        );
        assert_eq!(
            registry.dispatch(FailureKind::CantOpenPort, &mut link),
            Directive::Abort(ResultCode::CantOpenPort)
        );
    }

    #[test]
    fn test_simple_handshake() {
        let prompt = ScriptedPrompt {
            restart: true,
            ..Default::default()
        };
        let registry = FailureHandlerRegistry::simple(Arc::new(prompt));
        let mut link = link();
        assert_eq!(
            registry.dispatch(FailureKind::HandshakeFailed, &mut link),
            Directive::Retry
        );
        // 只允许断开重连，不修改端口参数
        assert_eq!((link.port(), link.baud()), (1, 9600));
        assert!(!link.is_connected());

        let registry = FailureHandlerRegistry::simple(Arc::new(NonInteractive));
        assert_eq!(
            registry.dispatch(FailureKind::HandshakeFailed, &mut link),
            Directive::Abort(ResultCode::HandshakeFailed)
        );
    }

    #[test]
    fn test_tolerate_timeouts() {
        let mut registry = FailureHandlerRegistry::simple(Arc::new(NonInteractive));
        let fallback = registry.handler(FailureKind::Timeout).unwrap();
        let tolerant = Arc::new(TolerateTimeouts::new(2, fallback));
        registry.set_handler(FailureKind::Timeout, tolerant.clone());
        let mut link = link();

        let suppressed = Directive::Suppress(ResultCode::NoPacketYet);
        assert_eq!(registry.dispatch(FailureKind::Timeout, &mut link), suppressed);
        assert_eq!(registry.dispatch(FailureKind::Timeout, &mut link), suppressed);
        assert_eq!(tolerant.consecutive_timeouts(), 2);
        assert_eq!(
            registry.dispatch(FailureKind::Timeout, &mut link),
            Directive::Abort(ResultCode::Timeout)
        );

        // 成功后重新计数
        registry.dispatch(FailureKind::Timeout, &mut link);
        registry.notify_success();
        assert_eq!(tolerant.consecutive_timeouts(), 0);
        assert_eq!(registry.dispatch(FailureKind::Timeout, &mut link), suppressed);
    }

    #[test]
    fn test_set_and_remove_handler() {
        let mut registry = FailureHandlerRegistry::simple(Arc::new(NonInteractive));
        assert_eq!(registry.len(), 6);
        assert!(registry.remove_handler(FailureKind::BadPort).is_some());
        assert_eq!(registry.len(), 5);
        let mut link = link();
        assert_eq!(
            registry.dispatch(FailureKind::BadPort, &mut link),
            Directive::Abort(ResultCode::BadPort)
        );
    }
}
