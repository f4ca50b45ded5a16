// src/engine/mod.rs

//! # 引擎模块
//!
//! `engine` 负责把一行文本变成一次存储操作：
//! - 按空白切分，第一个 token 小写后匹配命令表（set / get / save / load / help / exit）
//! - 校验参数个数，解析 `ex` / `px` 过期参数
//! - 调用 `Store` 或 `persistence` 执行，返回 `Reply` 或 `CommandError`
//!
//! 这里从不阻塞等待、也不直接退出进程：`exit` 以 `Reply::Exit` 的形式交给调用方处理。
pub mod kv;

use std::fmt;

use crate::error::{CommandError, Result};
use crate::expire::{self, TtlUnit};
use crate::persistence;

pub use kv::{Entry, Store};

/// get 未命中时的标记
pub const NIL: &str = "<nil>";
/// 写命令成功时的标记
pub const OK: &str = "OK";

/// help 输出的用法说明
pub const USAGE: &str = "Usage: gokv <command> [<args>]
commands:
\tset <key> <value> [<unit> <duration>]
\tget <key>
\tsave <file>
\tload <file>
\thelp
\texit
duration unit:
\tex = seconds
\tpx = milliseconds
Note: keywords are case insensitive.";

/// 一条命令的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// 空行，不输出任何内容
    Empty,
    /// set / save / load 成功
    Ok,
    /// get 未命中或已过期
    Nil,
    /// get 命中的值
    Value(String),
    /// help
    Usage,
    /// exit：由调用方结束进程
    Exit,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Empty | Reply::Exit => Ok(()),
            Reply::Ok => f.write_str(OK),
            Reply::Nil => f.write_str(NIL),
            Reply::Value(v) => f.write_str(v),
            Reply::Usage => f.write_str(USAGE),
        }
    }
}

/// 解析并执行一行命令
///
/// # 参数
///
/// * `line` - REPL 读到的一行原始文本
/// * `store` - 命令作用的存储
pub fn execute(line: &str, store: &Store) -> Result<Reply> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((name, args)) = parts.split_first() else {
        return Ok(Reply::Empty);
    };

    match name.to_lowercase().as_str() {
        "set" => handle_set(args, store),
        "get" => handle_get(args, store),
        "save" => {
            let path = single_arg(args)?;
            persistence::save(store, path)?;
            Ok(Reply::Ok)
        }
        "load" => {
            let path = single_arg(args)?;
            persistence::load(store, path)?;
            Ok(Reply::Ok)
        }
        // 多余参数忽略
        "help" => Ok(Reply::Usage),
        "exit" => Ok(Reply::Exit),
        _ => Err(CommandError::UnknownCommand(name.to_string())),
    }
}

/// set <key> <value> [<unit> <duration>]
fn handle_set(args: &[&str], store: &Store) -> Result<Reply> {
    match *args {
        [key, value] => {
            store.set(key, value, None);
            Ok(Reply::Ok)
        }
        [key, value, unit, duration] => {
            let unit = TtlUnit::parse(unit)?;
            let amount = expire::parse_duration(duration)?;
            let expire_at = expire::deadline(expire::now_ms(), unit, amount);
            store.set(key, value, Some(expire_at));
            Ok(Reply::Ok)
        }
        _ => Err(CommandError::InvalidArgCount(args.len())),
    }
}

/// get <key>
fn handle_get(args: &[&str], store: &Store) -> Result<Reply> {
    let key = single_arg(args)?;
    Ok(match store.get(key) {
        Some(v) => Reply::Value(v),
        None => Reply::Nil,
    })
}

fn single_arg<'a>(args: &[&'a str]) -> Result<&'a str> {
    match *args {
        [one] => Ok(one),
        _ => Err(CommandError::InvalidArgCount(args.len())),
    }
}
