// src/repl.rs
//! 交互层：
//! - 打印提示符 `>> `，逐行读取命令
//! - 调度到 engine 执行
//! - 成功打印结果，失败打印 `ERROR: <msg>`
//! - 遇到 exit 或输入结束（EOF）时返回
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::engine::{self, Reply, Store};

pub const PROMPT: &str = ">> ";

/// 读-执行-打印循环
///
/// 输入输出是泛型的，生产环境接 stdin/stdout，测试里接内存缓冲区。
pub async fn run<R, W>(store: &Store, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            debug!("input closed");
            break;
        }

        // 非 UTF-8 的一行只报错，继续读下一行
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                let out = format!("ERROR: reading line: {}\n", e);
                writer.write_all(out.as_bytes()).await?;
                continue;
            }
        };

        let out = match engine::execute(line.trim(), store) {
            Ok(Reply::Exit) => break,
            Ok(Reply::Empty) => continue,
            Ok(reply) => format!("{}\n", reply),
            Err(e) => format!("ERROR: {}\n", e),
        };
        writer.write_all(out.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}
