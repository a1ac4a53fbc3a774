//! 日志初始化
//!
//! 安装 `tracing-subscriber` 的 fmt 订阅者，过滤规则取自 `RUST_LOG`，
//! 未设置时使用默认规则；`log` crate 的记录经 `tracing-log` 转发。

use crate::SdkError;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// 默认过滤规则
pub const DEFAULT_DIRECTIVE: &str = "scribe=info";

static INIT: Once = Once::new();

/// 使用默认规则初始化日志
///
/// 重复调用不做任何事。返回本次调用是否安装了订阅者。
pub fn init_logging() -> bool {
    init_logging_with(DEFAULT_DIRECTIVE)
}

/// 使用指定的默认规则初始化日志（`RUST_LOG` 优先）
pub fn init_logging_with(default_directive: &str) -> bool {
    let mut installed = false;
    INIT.call_once(|| {
        // 进程里已有全局订阅者时保留它
        installed = install(default_directive).is_ok();
    });
    installed
}

fn install(default_directive: &str) -> Result<(), SdkError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|err| SdkError::Logging(err.to_string()))?;
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| SdkError::Logging(err.to_string()))?;

    // 订阅者已安装；`log` 转发失败（已有别的 logger）不影响结果
    match tracing_log::LogTracer::init() {
        Ok(()) => log::debug!("log records bridged to tracing"),
        Err(err) => tracing::debug!("log records not bridged: {}", err),
    }
    Ok(())
}
