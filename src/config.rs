use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use anyhow::{Context, Result};
use tracing::info;

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "TTLKV_CONFIG";
/// 未设置环境变量时，在当前目录查找的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "ttlkv.json";

/// 进程启动时读到的全局配置，缺省字段取默认值
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// 后台快照周期（秒），0 表示不启动
    pub snapshot_interval_secs: u64,
    /// 后台过期清理周期（秒），0 表示只做惰性过期
    pub sweep_interval_secs: u64,
    /// 启动时是否从快照文件恢复
    pub restore_on_start: bool,
    /// 未设置 RUST_LOG 时使用的日志级别
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            snapshot_interval_secs: 60,
            sweep_interval_secs: 0,
            restore_on_start: false,
            log_level: "warn".to_string(),
        }
    }
}

/// 配置文件路径：优先环境变量，其次当前目录下的默认文件
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// 从指定路径读取并反序列化 JSON 配置，文件不存在时返回默认配置
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Ok(Config::default());
    }

    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;
    let cfg: Config = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse config file {:?}", path_ref))?;
    Ok(cfg)
}

/// 记录配置来源，需在日志初始化之后调用
pub fn log_source(path: &Path, cfg: &Config) {
    if path.exists() {
        info!(config = ?cfg, "config loaded from {:?}", path);
    } else {
        info!(config = ?cfg, "config file {:?} not found, using defaults", path);
    }
}
