// src/persistence.rs

//! 快照持久化：
//! - `save`：读锁下把整张表编码，写入同目录临时文件，fsync 后原子 rename 覆盖目标
//! - `load`：先完整解码到一张新表，全部成功后才整表替换，失败时旧数据不动
//! - `start_snapshotter`：后台定时 save，失败只记录日志
//!
//! 文件格式（按行）：
//!
//! ```text
//! ttlkv-snapshot v1
//! <hex(key)> <hex(value)> <expire_at 毫秒 或 ->
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{error, info};

use crate::engine::kv::{Entry, Store};
use crate::error::SnapshotError;

const HEADER: &str = "ttlkv-snapshot v1";
const NO_EXPIRE: &str = "-";

/// 把表编码成快照文本
fn encode(table: &HashMap<String, Entry>) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + table.len() * 32);
    out.push_str(HEADER);
    out.push('\n');
    for (key, entry) in table {
        out.push_str(&hex::encode(key));
        out.push(' ');
        out.push_str(&hex::encode(&entry.value));
        out.push(' ');
        match entry.expire_at {
            Some(ts) => out.push_str(&ts.to_string()),
            None => out.push_str(NO_EXPIRE),
        }
        out.push('\n');
    }
    out
}

/// 解析快照文本到一张新表；`path` 只用于错误信息
fn decode(data: &str, path: &Path) -> Result<HashMap<String, Entry>, SnapshotError> {
    let fail = |line: usize, reason: String| SnapshotError::Decode {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut lines = data.lines();
    match lines.next() {
        Some(HEADER) => {}
        Some(other) => return Err(fail(1, format!("unknown header {:?}", other))),
        None => return Err(fail(1, "missing header".into())),
    }

    let mut table = HashMap::new();
    for (idx, line) in lines.enumerate() {
        let lineno = idx + 2;
        let fields: Vec<&str> = line.split(' ').collect();
        if fields.len() != 3 {
            return Err(fail(lineno, format!("expected 3 fields, got {}", fields.len())));
        }

        let text = |field: &str, what: &str| -> Result<String, SnapshotError> {
            let bytes = hex::decode(field).map_err(|e| fail(lineno, format!("{}: {}", what, e)))?;
            String::from_utf8(bytes).map_err(|e| fail(lineno, format!("{}: {}", what, e)))
        };
        let key = text(fields[0], "key")?;
        let value = text(fields[1], "value")?;
        let expire_at = match fields[2] {
            NO_EXPIRE => None,
            ts => Some(
                ts.parse::<u64>()
                    .map_err(|e| fail(lineno, format!("expire_at: {}", e)))?,
            ),
        };

        table.insert(key, Entry::new(value, expire_at));
    }
    Ok(table)
}

/// 执行一次全量快照
///
/// 已过期但还没被清理的记录也会原样写入。
pub fn save(store: &Store, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    // 只在编码期间持有读锁，写文件时写者不再被阻塞
    let (data, count) = store.with_table(|table| (encode(table), table.len()));

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SnapshotError::io("create temp file in", dir, e))?;
    tmp.write_all(data.as_bytes())
        .map_err(|e| SnapshotError::io("write", tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| SnapshotError::io("sync", tmp.path(), e))?;

    // 原子替换
    tmp.persist(path)
        .map_err(|e| SnapshotError::io("rename onto", path, e.error))?;

    info!(path = %path.display(), entries = count, "snapshot saved");
    Ok(())
}

/// 从快照文件整表恢复
pub fn load(store: &Store, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => SnapshotError::Decode {
            path: path.to_path_buf(),
            line: 0,
            reason: "file is not valid UTF-8".into(),
        },
        _ => SnapshotError::io("read", path, e),
    })?;

    let table = decode(&data, path)?;
    let count = table.len();
    let replaced = store.replace(table);

    info!(path = %path.display(), entries = count, replaced, "snapshot loaded");
    Ok(())
}

/// 后台快照任务：每 `interval_secs` 秒 save 一次，第一次在一个周期之后
pub fn start_snapshotter(store: Arc<Store>, path: PathBuf, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(interval_secs.max(1));
        let mut iv = interval_at(Instant::now() + period, period);
        loop {
            iv.tick().await;

            // 文件 I/O 放到阻塞线程池里
            let store = store.clone();
            let target = path.clone();
            match tokio::task::spawn_blocking(move || save(&store, &target)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("persisting database: {}", e),
                Err(e) => error!("snapshot task failed: {}", e),
            }
        }
    })
}
