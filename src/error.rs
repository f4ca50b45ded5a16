// src/error.rs

//! 错误类型：
//! - `CommandError`：单行命令的解析 / 参数校验错误，以及快照错误的透传
//! - `SnapshotError`：快照文件的 I/O 与编解码错误

use std::io;
use std::path::PathBuf;

/// 命令分发阶段的错误，全部是非致命的，REPL 打印后继续读下一行
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid number of arguments: {0}")]
    InvalidArgCount(usize),

    #[error("invalid unit {0}")]
    InvalidUnit(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// save / load 失败
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// 快照读写错误
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// 打开 / 读 / 写 / 重命名文件失败
    #[error("{op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 文件内容损坏或格式不兼容
    #[error("decode snapshot {path:?} line {line}: {reason}")]
    Decode {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl SnapshotError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        SnapshotError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = CommandError> = std::result::Result<T, E>;
