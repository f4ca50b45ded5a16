// src/engine/kv.rs

//! 内存存储引擎：`Store` 持有 key -> `Entry` 的表和一把读写锁
//!
//! - set：写锁，整条覆盖
//! - get：读锁命中；发现过期后升级为写锁，再做一次 compare-and-remove
//! - snapshot / replace：供持久化模块整表读取与整表替换

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::expire::now_ms;

/// 一条记录：值 + 可选的过期时间戳（UNIX 毫秒）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: String,
    pub expire_at: Option<u64>,
}

impl Entry {
    pub fn new(value: impl Into<String>, expire_at: Option<u64>) -> Self {
        Self {
            value: value.into(),
            expire_at,
        }
    }

    /// expire_at <= now 即视为过期
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expire_at, Some(ts) if ts <= now)
    }
}

/// 并发安全的 key-value 表
#[derive(Debug, Default)]
pub struct Store {
    table: RwLock<HashMap<String, Entry>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // 锁中毒时（持锁线程 panic）表本身仍然一致，直接取回内部数据
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.table.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 插入或覆盖 key，不会失败
    pub fn set(&self, key: &str, value: &str, expire_at: Option<u64>) {
        self.write()
            .insert(key.to_string(), Entry::new(value, expire_at));
    }

    /// 读取 key
    ///
    /// 过期的记录会在这里被删除，所以这个"读"操作可能修改表
    pub fn get(&self, key: &str) -> Option<String> {
        let observed = {
            let table = self.read();
            let entry = table.get(key)?;
            if !entry.is_expired(now_ms()) {
                return Some(entry.value.clone());
            }
            entry.clone()
        };

        // 读锁已释放，这期间别的调用者可能已经删掉或重新 set 了这个 key；
        // 只有表里仍然是我们看到的那条过期记录时才删除
        let mut table = self.write();
        if table.get(key) == Some(&observed) {
            table.remove(key);
        }
        None
    }

    /// 不做过期检查地判断 key 是否还在表里
    pub fn contains_key_raw(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// 表中记录数，包含已过期但尚未被清理的
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 一次写锁内删除所有 expire_at <= now 的记录，返回删除数量
    pub fn purge_expired(&self, now: u64) -> usize {
        let mut table = self.write();
        let before = table.len();
        table.retain(|_, entry| !entry.is_expired(now));
        before - table.len()
    }

    /// 在读锁下访问整张表，用于快照编码
    pub fn with_table<R>(&self, f: impl FnOnce(&HashMap<String, Entry>) -> R) -> R {
        f(&self.read())
    }

    /// 整表替换，返回替换前的记录数
    pub fn replace(&self, table: HashMap<String, Entry>) -> usize {
        let mut guard = self.write();
        let old = std::mem::replace(&mut *guard, table);
        old.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread::{self, sleep};
    use std::time::Duration;

    #[test]
    fn test_set_get_without_ttl() {
        let store = Store::new();
        store.set("k", "v", None);
        assert_eq!(store.get("k").as_deref(), Some("v"));
        assert_eq!(store.get("k").as_deref(), Some("v"), "无过期时间的 key 可重复读取");
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_set_overwrites_entry() {
        let store = Store::new();
        store.set("k", "v1", Some(now_ms()));
        store.set("k", "v2", None);
        // 覆盖后旧的过期时间也一起被替换
        assert_eq!(store.get("k").as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_get() {
        let store = Store::new();
        store.set("k", "v", Some(now_ms() + 50));
        assert_eq!(store.get("k").as_deref(), Some("v"));

        sleep(Duration::from_millis(80));
        assert!(store.contains_key_raw("k"), "惰性过期：读之前仍在表中");
        assert_eq!(store.get("k"), None);
        assert!(!store.contains_key_raw("k"), "过期读取后应被删除");
    }

    #[test]
    fn test_deadline_equal_to_now_is_expired() {
        let entry = Entry::new("v", Some(100));
        assert!(entry.is_expired(100));
        assert!(!entry.is_expired(99));
        assert!(!Entry::new("v", None).is_expired(u64::MAX));
    }

    #[test]
    fn test_purge_expired() {
        let store = Store::new();
        store.set("a", "1", Some(10));
        store.set("b", "2", Some(u64::MAX));
        store.set("c", "3", None);
        assert_eq!(store.purge_expired(now_ms()), 1);
        assert!(!store.contains_key_raw("a"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_replace_swaps_whole_table() {
        let store = Store::new();
        store.set("old", "x", None);

        let mut fresh = HashMap::new();
        fresh.insert("new".to_string(), Entry::new("y", None));
        assert_eq!(store.replace(fresh), 1);

        assert_eq!(store.get("old"), None);
        assert_eq!(store.get("new").as_deref(), Some("y"));
    }

    #[test]
    fn test_concurrent_sets_on_distinct_keys() {
        let store = Arc::new(Store::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        store.set(&format!("t{}-k{}", t, i), &format!("{}", i), None);
                    }
                    // 最后一次写入为准
                    store.set(&format!("t{}-k0", t), "last", None);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 8 * 200);
        for t in 0..8 {
            assert_eq!(store.get(&format!("t{}-k0", t)).as_deref(), Some("last"));
            assert_eq!(store.get(&format!("t{}-k199", t)).as_deref(), Some("199"));
        }
    }

    #[test]
    fn test_stale_expiry_does_not_clobber_fresh_set() {
        let store = Arc::new(Store::new());
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        // 一边反复写入"已过期"再写入新值，一边不停地 get
        let reader = {
            let store = store.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                    let _ = store.get("k");
                }
            })
        };
        for i in 0..2_000 {
            store.set("k", "stale", Some(0));
            let fresh = format!("fresh-{}", i);
            store.set("k", &fresh, None);
            assert_eq!(store.get("k"), Some(fresh), "新写入的值不能被过期删除误删");
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        reader.join().unwrap();
    }
}
