//! Transcript file parser
//!
//! Parses one session per `*.jsonl` transcript file. The format is an
//! external read-only contract; the parser maps loosely-typed records into
//! the typed [`Session`]/[`Message`] model at this boundary so nothing
//! untyped flows downstream.
//!
//! # Error Handling
//!
//! - **Malformed JSON lines**: logged as a warning, line skipped, parsing
//!   continues. Warning counts surface in the parse outcome.
//! - **Missing fields**: tolerated via `#[serde(default)]`. A record with no
//!   timestamp reuses the last seen one as an approximation.
//! - **Unknown record or block types**: ignored for metrics rather than
//!   failing the file.
//! - **Files that yield no usable session** (unreadable, empty, zero
//!   parseable records): reported as [`Error::MalformedInput`] so the
//!   importer can skip them with a single warning.

use crate::error::{Error, Result};
use crate::types::{Message, Role, Session, ToolInvocation};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// ============================================
// Raw JSONL record types (serde deserialization)
// ============================================

/// Represents a single line from a transcript file.
///
/// Uses `#[serde(default)]` liberally to handle missing fields gracefully.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawRecord {
    session_id: Option<String>,
    #[serde(rename = "type")]
    record_type: Option<String>,
    timestamp: Option<String>,
    cwd: Option<String>,
    context_module: Option<String>,
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawMessage {
    role: Option<String>,
    content: Option<RawContent>,
    usage: Option<RawUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for RawContent {
    fn default() -> Self {
        RawContent::Text(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        #[allow(dead_code)]
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
    // Catch-all for unknown block types
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawUsage {
    input_tokens: Option<i64>,
    output_tokens: Option<i64>,
}

/// Outcome of parsing one transcript file.
#[derive(Debug)]
pub struct ParsedTranscript {
    pub session: Session,
    /// Non-fatal warnings encountered while parsing
    pub warnings: Vec<String>,
}

/// Generate a deterministic project ID from the working directory path.
fn project_id(cwd: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cwd.as_bytes());
    let hash = hasher.finalize();
    format!("{:x}", hash)[..16].to_string()
}

/// Extract the directory name from a path for use as project name.
fn project_name(cwd: &str) -> String {
    Path::new(cwd)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Parse one transcript file into a normalized [`Session`].
pub fn parse_transcript(path: &Path) -> Result<ParsedTranscript> {
    let file = File::open(path).map_err(|e| Error::MalformedInput {
        path: path.to_path_buf(),
        message: format!("failed to open: {}", e),
    })?;
    let reader = BufReader::new(file);

    let mut warnings = Vec::new();
    let mut messages: Vec<Message> = Vec::new();
    let mut seq = 0i32;

    let mut session_id: Option<String> = None;
    let mut cwd: Option<String> = None;
    let mut context_modules: Vec<String> = Vec::new();

    let mut first_timestamp: Option<DateTime<Utc>> = None;
    let mut last_timestamp: Option<DateTime<Utc>> = None;

    // tool_use_id -> index of the message carrying the invocation,
    // resolved when the matching tool_result arrives
    let mut pending_invocations: HashMap<String, usize> = HashMap::new();

    for (line_index, line_result) in reader.lines().enumerate() {
        let line_number = line_index + 1;

        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                warnings.push(format!("line {}: read error: {}", line_number, e));
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let record: RawRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warnings.push(format!("line {}: JSON parse error: {}", line_number, e));
                continue;
            }
        };

        // Session-level fields come from their first occurrence
        if session_id.is_none() {
            session_id = record.session_id.clone();
        }
        if cwd.is_none() {
            cwd = record.cwd.clone();
        }
        if let Some(ref module) = record.context_module {
            if !context_modules.contains(module) {
                context_modules.push(module.clone());
            }
        }

        // Records without timestamps reuse the last seen value
        let ts = record
            .timestamp
            .as_ref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .or(last_timestamp);

        let Some(ts) = ts else {
            warnings.push(format!("line {}: no usable timestamp, skipped", line_number));
            continue;
        };

        if first_timestamp.is_none() {
            first_timestamp = Some(ts);
        }
        last_timestamp = Some(ts);

        let record_type = record.record_type.as_deref().unwrap_or("unknown");
        match record_type {
            "user" => record_to_user_messages(
                &record,
                ts,
                &mut seq,
                &mut messages,
                &mut pending_invocations,
            ),
            "assistant" => record_to_assistant_messages(
                &record,
                ts,
                &mut seq,
                &mut messages,
                &mut pending_invocations,
            ),
            // Unknown record types carry no conversation content
            _ => {}
        }
    }

    let (Some(started_at), Some(ended_at)) = (first_timestamp, last_timestamp) else {
        return Err(Error::MalformedInput {
            path: path.to_path_buf(),
            message: if warnings.is_empty() {
                "no records".to_string()
            } else {
                format!("no usable records ({} bad lines)", warnings.len())
            },
        });
    };

    // Fall back to the file stem when the transcript carries no id
    let id = session_id
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let session = Session {
        id,
        project_id: cwd.as_deref().map(project_id),
        project_name: cwd.as_deref().map(project_name),
        started_at,
        ended_at,
        messages,
        context_modules,
        source_file_path: path.to_path_buf(),
    };

    Ok(ParsedTranscript { session, warnings })
}

fn record_to_user_messages(
    record: &RawRecord,
    ts: DateTime<Utc>,
    seq: &mut i32,
    messages: &mut Vec<Message>,
    pending_invocations: &mut HashMap<String, usize>,
) {
    let Some(ref msg) = record.message else {
        return;
    };
    let Some(ref content) = msg.content else {
        return;
    };

    match content {
        RawContent::Text(text) => {
            if !text.is_empty() {
                *seq += 1;
                messages.push(Message {
                    seq: *seq,
                    role: Role::Human,
                    ts,
                    content: Some(text.clone()),
                    prompt_tokens: 0,
                    response_tokens: 0,
                    tool: None,
                });
            }
        }
        RawContent::Blocks(blocks) => {
            for block in blocks {
                match block {
                    ContentBlock::Text { text } => {
                        if !text.is_empty() {
                            *seq += 1;
                            messages.push(Message {
                                seq: *seq,
                                role: Role::Human,
                                ts,
                                content: Some(text.clone()),
                                prompt_tokens: 0,
                                response_tokens: 0,
                                tool: None,
                            });
                        }
                    }
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => {
                        // Resolve the pending invocation this result answers
                        if let Some(&idx) = pending_invocations.get(tool_use_id) {
                            if let Some(tool) = messages[idx].tool.as_mut() {
                                tool.succeeded = !is_error;
                            }
                            pending_invocations.remove(tool_use_id);
                        }

                        let result_str = match content {
                            serde_json::Value::String(s) => s.clone(),
                            serde_json::Value::Null => String::new(),
                            v => v.to_string(),
                        };
                        *seq += 1;
                        messages.push(Message {
                            seq: *seq,
                            role: Role::Tool,
                            ts,
                            content: Some(result_str),
                            prompt_tokens: 0,
                            response_tokens: 0,
                            tool: None,
                        });
                    }
                    // tool_use in user records and unknown blocks carry
                    // nothing we measure
                    ContentBlock::ToolUse { .. } | ContentBlock::Unknown => {}
                }
            }
        }
    }
}

fn record_to_assistant_messages(
    record: &RawRecord,
    ts: DateTime<Utc>,
    seq: &mut i32,
    messages: &mut Vec<Message>,
    pending_invocations: &mut HashMap<String, usize>,
) {
    let Some(ref msg) = record.message else {
        return;
    };

    let (prompt_tokens, response_tokens) = msg
        .usage
        .as_ref()
        .map(|u| (u.input_tokens.unwrap_or(0), u.output_tokens.unwrap_or(0)))
        .unwrap_or((0, 0));

    // Usage covers the whole record; attach it to the first message created
    // from it so token totals never double-count
    let mut usage_attached = false;
    let mut take_usage = |attached: &mut bool| -> (i64, i64) {
        if *attached {
            (0, 0)
        } else {
            *attached = true;
            (prompt_tokens, response_tokens)
        }
    };

    let Some(ref content) = msg.content else {
        return;
    };

    match content {
        RawContent::Text(text) => {
            if !text.is_empty() {
                let (p, r) = take_usage(&mut usage_attached);
                *seq += 1;
                messages.push(Message {
                    seq: *seq,
                    role: Role::Assistant,
                    ts,
                    content: Some(text.clone()),
                    prompt_tokens: p,
                    response_tokens: r,
                    tool: None,
                });
            }
        }
        RawContent::Blocks(blocks) => {
            for block in blocks {
                match block {
                    ContentBlock::Text { text } => {
                        if !text.is_empty() {
                            let (p, r) = take_usage(&mut usage_attached);
                            *seq += 1;
                            messages.push(Message {
                                seq: *seq,
                                role: Role::Assistant,
                                ts,
                                content: Some(text.clone()),
                                prompt_tokens: p,
                                response_tokens: r,
                                tool: None,
                            });
                        }
                    }
                    ContentBlock::ToolUse { id, name, .. } => {
                        let (p, r) = take_usage(&mut usage_attached);
                        *seq += 1;
                        // Succeeds only once a non-error result arrives
                        messages.push(Message {
                            seq: *seq,
                            role: Role::Assistant,
                            ts,
                            content: None,
                            prompt_tokens: p,
                            response_tokens: r,
                            tool: Some(ToolInvocation::new(name.clone(), false)),
                        });
                        pending_invocations.insert(id.clone(), messages.len() - 1);
                    }
                    ContentBlock::ToolResult { .. } | ContentBlock::Unknown => {}
                }
            }
        }
    }
}
