//! Whole-document formatter.
//!
//! Re-indents by brace depth and normalises whitespace. Token order and
//! contents are never changed, and the interior lines of block comments keep
//! their own indentation. Formatting is idempotent.

use glint_core::{FormatOptions, TrailingNewline};

/// Lexical state carried from one line to the next.
#[derive(Debug, Default)]
struct Scanner {
    depth: usize,
    in_block_comment: bool,
}

impl Scanner {
    /// Update brace depth from the code parts of `line`.
    fn scan(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        let mut in_string = false;
        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            if in_string {
                match c {
                    '\\' => {
                        chars.next();
                    }
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '/' if chars.peek() == Some(&'/') => return,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '{' => self.depth += 1,
                '}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }
    }
}

/// Number of `}` at the start of a trimmed line.
fn leading_closers(trimmed: &str) -> usize {
    trimmed
        .chars()
        .take_while(|c| *c == '}' || c.is_whitespace())
        .filter(|c| *c == '}')
        .count()
}

/// Format `text` according to `options`.
pub fn format(text: &str, options: &FormatOptions) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut scanner = Scanner::default();
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in normalized.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
            continue;
        }
        previous_blank = false;

        if scanner.in_block_comment {
            lines.push(line.trim_end().to_string());
            scanner.scan(line);
            continue;
        }

        let formatted = if trimmed.starts_with('#') {
            trimmed.to_string()
        } else {
            let level = scanner.depth.saturating_sub(leading_closers(trimmed));
            format!("{}{trimmed}", options.indent.repeat(level))
        };
        lines.push(formatted);
        scanner.scan(trimmed);
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    if lines.is_empty() {
        return String::new();
    }

    let mut out = lines.join(&options.newline);
    let final_newline = match options.trailing_newline {
        TrailingNewline::Insert => true,
        TrailingNewline::Remove => false,
        TrailingNewline::Preserve => normalized.ends_with('\n'),
    };
    if final_newline {
        out.push_str(&options.newline);
    }
    out
}
