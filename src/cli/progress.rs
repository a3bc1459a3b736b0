use crate::colors::*;
use std::io::{self, Write};

/// Single-line carriage-return status display for the long phases.
#[derive(Debug, Default)]
pub(crate) struct ProgressRenderer {
    last_len: usize,
}

impl ProgressRenderer {
    pub(crate) fn new() -> Self {
        Self { last_len: 0 }
    }

    pub(crate) fn render(&mut self, message: impl Into<String>) {
        let message = message.into();
        let pad = self.last_len.saturating_sub(message.len());
        let mut out = io::stdout();
        write!(out, "\r{}{}", message, " ".repeat(pad)).ok();
        out.flush().ok();
        self.last_len = message.len();
    }

    pub(crate) fn clear(&mut self) {
        if self.last_len == 0 {
            return;
        }
        print!("\r{}\r", " ".repeat(self.last_len));
        io::stdout().flush().ok();
        self.last_len = 0;
    }
}

pub(crate) fn format_status(kind: &str, detail: &str) -> String {
    let (color, action) = match kind {
        "resolving" => (C_CYAN, "resolving"),
        "installing" => (C_CYAN, "installing"),
        "extracting" => (C_MAGENTA, "extracting"),
        "linking" => (C_GREEN, "linking"),
        _ => (C_DIM, kind),
    };
    format!("{C_GRAY}[pacm]{C_RESET} {color}{action}{C_RESET} {detail}")
}

pub(crate) fn warn(message: &str) {
    println!("{C_GRAY}[pacm]{C_RESET} {C_YELLOW}warning{C_RESET} {message}");
}

pub(crate) fn info(message: &str) {
    println!("{C_GRAY}[pacm]{C_RESET} {message}");
}
