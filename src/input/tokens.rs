//! Whitespace token stream with optional interactive prompts.
//!
//! Blank lines and lines starting with `#` are skipped. In interactive mode
//! a prompt is written before each token is read from the underlying reader.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use crate::error::{PackError, PackResult};

/// Token reader over a line-oriented source
pub struct TokenReader<R, W> {
    reader: R,
    prompt: Option<W>,
    pending: VecDeque<String>,
    line: usize,
}

impl<R: BufRead> TokenReader<R, std::io::Sink> {
    /// Batch mode: no prompts
    pub fn batch(reader: R) -> Self {
        Self {
            reader,
            prompt: None,
            pending: VecDeque::new(),
            line: 0,
        }
    }
}

impl<R: BufRead, W: Write> TokenReader<R, W> {
    /// Interactive mode: prompts go to `prompt`
    pub fn interactive(reader: R, prompt: W) -> Self {
        Self {
            reader,
            prompt: Some(prompt),
            pending: VecDeque::new(),
            line: 0,
        }
    }

    /// Current line number (1-based once anything was read)
    pub fn line(&self) -> usize {
        self.line
    }

    /// Write a prompt when interactive and no token is buffered
    pub fn ask(&mut self, text: &str) -> PackResult<()> {
        if !self.pending.is_empty() {
            return Ok(());
        }
        if let Some(out) = self.prompt.as_mut() {
            write!(out, "{} ", text)?;
            out.flush()?;
        }
        Ok(())
    }

    /// Next raw token; `what` names the expected value in errors
    pub fn next_token(&mut self, what: &str) -> PackResult<String> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            let mut buf = String::new();
            let read = self.reader.read_line(&mut buf).map_err(|e| {
                PackError::config(format!("line {}: unreadable input: {}", self.line + 1, e))
            })?;
            if read == 0 {
                return Err(PackError::config(format!(
                    "unexpected end of input while reading {}",
                    what
                )));
            }
            self.line += 1;
            let trimmed = buf.trim_start();
            if trimmed.starts_with('#') {
                continue;
            }
            self.pending.extend(trimmed.split_whitespace().map(str::to_owned));
        }
    }

    pub fn next_f64(&mut self, what: &str) -> PackResult<f64> {
        let token = self.next_token(what)?;
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(PackError::config(format!(
                "line {}: expected a number for {}, got '{}'",
                self.line, what, token
            ))),
        }
    }

    pub fn next_u32(&mut self, what: &str) -> PackResult<u32> {
        let token = self.next_token(what)?;
        token.parse::<u32>().map_err(|_| {
            PackError::config(format!(
                "line {}: expected an integer for {}, got '{}'",
                self.line, what, token
            ))
        })
    }

    /// `y`/`yes`/`n`/`no`, case-insensitive
    pub fn next_yes_no(&mut self, what: &str) -> PackResult<bool> {
        let token = self.next_token(what)?;
        match token.to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            _ => Err(PackError::config(format!(
                "line {}: expected yes or no for {}, got '{}'",
                self.line, what, token
            ))),
        }
    }
}
