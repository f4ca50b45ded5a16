// src/expire.rs

//! 过期策略：
//! - 统一的毫秒时钟 `now_ms`
//! - `ex` / `px` 单位解析与过期时间戳计算
//! - 可选的后台定时清理任务（惰性过期之外的补充，get 仍然自己检查过期）

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::debug;

use crate::engine::kv::Store;
use crate::error::{CommandError, Result};

/// 返回当前的 UNIX 毫秒
pub fn now_ms() -> u64 {
    // 时钟早于 1970 时按 0 处理
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// 过期时间单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlUnit {
    /// 秒
    Ex,
    /// 毫秒
    Px,
}

impl TtlUnit {
    /// 大小写不敏感地解析 `ex` / `px`
    pub fn parse(token: &str) -> Result<Self> {
        match token.to_lowercase().as_str() {
            "ex" => Ok(TtlUnit::Ex),
            "px" => Ok(TtlUnit::Px),
            _ => Err(CommandError::InvalidUnit(token.to_string())),
        }
    }

    /// 把 `amount` 个单位换算成毫秒，溢出时饱和
    pub fn to_millis(self, amount: u64) -> u64 {
        match self {
            TtlUnit::Ex => amount.saturating_mul(1000),
            TtlUnit::Px => amount,
        }
    }
}

/// 解析非负十进制整数时长，只接受纯数字
pub fn parse_duration(token: &str) -> Result<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CommandError::InvalidDuration(token.to_string()));
    }
    token
        .parse::<u64>()
        .map_err(|_| CommandError::InvalidDuration(token.to_string()))
}

/// 计算绝对过期时间戳：now + amount * unit
pub fn deadline(now: u64, unit: TtlUnit, amount: u64) -> u64 {
    now.saturating_add(unit.to_millis(amount))
}

/// 后台定时清理任务，`interval_secs` 为 0 时由调用方决定不启动
pub fn start_cleaner(store: Arc<Store>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(interval_secs.max(1));
        let mut iv = interval_at(Instant::now() + period, period);
        loop {
            iv.tick().await;
            let purged = store.purge_expired(now_ms());
            if purged > 0 {
                debug!(purged, "swept expired keys");
            }
        }
    })
}
