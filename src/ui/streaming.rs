//! 流式输出 UI 组件
//!
//! 用于实时显示 LLM 流式响应（类似 ChatGPT 打字效果）

use std::io::{self, Write};
use std::sync::Mutex;

use colored::Colorize;

use crate::chat::{AgentRole, StreamObserver};

/// 流式文本输出器
///
/// The consumer reports the whole accumulated reply on every update; only the
/// part not yet printed goes to stdout.
pub struct StreamingOutput {
    printed: Mutex<usize>,
    colored: bool,
}

impl StreamingOutput {
    pub fn new(colored: bool) -> Self {
        Self {
            printed: Mutex::new(0),
            colored,
        }
    }

    /// 结束输出（换行）
    pub fn finish(&self) {
        if self.take_printed() > 0 {
            println!();
        }
    }

    fn take_printed(&self) -> usize {
        self.printed.lock().map(|mut n| std::mem::take(&mut *n)).unwrap_or(0)
    }
}

impl StreamObserver for StreamingOutput {
    fn on_update(&self, _role: AgentRole, accumulated: &str) {
        let Ok(mut printed) = self.printed.lock() else {
            return;
        };
        let Some(fresh) = accumulated.get(*printed..) else {
            return;
        };
        if self.colored {
            print!("{}", fresh.yellow());
        } else {
            print!("{}", fresh);
        }
        io::stdout().flush().ok();
        *printed = accumulated.len();
    }

    fn on_empty_retry(&self, _role: AgentRole, attempt: u32, max_retries: u32) {
        self.finish();
        let msg = rust_i18n::t!("chat.empty_retry", attempt = attempt, max = max_retries);
        if self.colored {
            eprintln!("{} {}", "⚠".yellow().bold(), msg.yellow());
        } else {
            eprintln!("⚠ {}", msg);
        }
    }
}
