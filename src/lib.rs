// src/lib.rs
//! ttlkv 库：engine / expire / persistence / config / repl

pub mod config;       // JSON 配置
pub mod engine;       // 存储引擎 & 命令分发
pub mod error;        // 错误类型
pub mod expire;       // 过期策略
pub mod persistence;  // 快照持久化
pub mod repl;         // 读-执行-打印循环

#[cfg(test)]
mod test_util;

pub use engine::{execute, Entry, Reply, Store};
pub use error::{CommandError, SnapshotError};
