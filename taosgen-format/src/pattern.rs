//! Shared token compiler behind `TopicGenerator`/`KeyGenerator` (`spec.md`
//! §4.5). Compiles a pattern like `"{device_id}-{table}"` once into a
//! sequence of literal-text and placeholder tokens, then resolves
//! placeholders per row without re-parsing the pattern.

use taosgen_core::cell::ColumnType;
use std::collections::HashMap;

enum Token {
    Text(String),
    Placeholder(String),
}

/// One row's worth of data available for pattern resolution.
pub struct RowContext<'a> {
    pub table_name: Option<&'a str>,
    pub timestamp: Option<i64>,
    pub columns: &'a HashMap<String, ColumnType>,
    pub tags: &'a HashMap<String, ColumnType>,
}

/// Compiles `"{a}-{b}"`-style patterns once and resolves them per row.
/// Used for both MQTT topics and Kafka keys — the resolution order and
/// fallback sentinels are identical, only the call site differs.
pub struct PatternCompiler {
    tokens: Vec<Token>,
}

impl PatternCompiler {
    pub fn compile(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        let mut text_start = 0;
        let bytes = pattern.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'{' {
                if i > text_start {
                    tokens.push(Token::Text(pattern[text_start..i].to_string()));
                }
                if let Some(end) = pattern[i..].find('}') {
                    let key = &pattern[i + 1..i + end];
                    tokens.push(Token::Placeholder(key.to_string()));
                    i += end + 1;
                    text_start = i;
                    continue;
                } else {
                    // Unterminated placeholder: treat the rest as literal text.
                    break;
                }
            }
            i += 1;
        }
        if text_start < pattern.len() {
            tokens.push(Token::Text(pattern[text_start..].to_string()));
        }
        Self { tokens }
    }

    pub fn resolve(&self, ctx: &RowContext) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Text(s) => out.push_str(s),
                Token::Placeholder(key) => out.push_str(&resolve_placeholder(key, ctx)),
            }
        }
        out
    }
}

fn resolve_placeholder(key: &str, ctx: &RowContext) -> String {
    match key {
        "table" => ctx.table_name.map(str::to_string).unwrap_or_else(|| "UNKNOWN_TABLE".to_string()),
        "ts" => ctx
            .timestamp
            .map(|t| t.to_string())
            .unwrap_or_else(|| "INVALID_TS".to_string()),
        other => {
            if let Some(cell) = ctx.columns.get(other) {
                stringify(cell)
            } else if let Some(cell) = ctx.tags.get(other) {
                stringify(cell)
            } else {
                format!("{{COL_NOT_FOUND:{other}}}")
            }
        }
    }
}

/// Stringification never panics in practice (`ColumnType::to_display_string`
/// is total), but the formatter contract promises `"{ERROR:…}"` rather than
/// a crash if that ever changes, so the catch stays explicit.
fn stringify(cell: &ColumnType) -> String {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cell.to_display_string()))
        .unwrap_or_else(|_| "{ERROR:stringify panicked}".to_string())
}
