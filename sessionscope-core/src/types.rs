//! Core domain types for sessionscope
//!
//! These types form the canonical data model the pipeline flows through:
//! raw transcripts are normalized into [`Session`]/[`Message`] records by the
//! importer, distilled into one [`SessionMetrics`] per session by the
//! extractor, and summarized into a single [`AggregateReport`] per run.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Session** | One recorded human-AI collaborative conversation |
//! | **Message** | One turn within a Session (human, assistant, or tool) |
//! | **ToolInvocation** | One assistant-initiated tool call within a Message |
//! | **Iteration** | One human prompt turn; sessions have at least one |
//! | **Complexity class** | Routine/Complex bucket assigned from iteration count |
//! | **Delegation score** | [0,1] estimate of cognitive work offloaded to the assistant |
//!
//! Everything here is immutable once created and lives for the duration of
//! one pipeline run; nothing is persisted besides the final report files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================
// Sessions
// ============================================

/// One human-AI collaborative conversation, normalized from a transcript file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier (from the transcript, or derived from the file name)
    pub id: String,
    /// Identifier of the project the session worked on (derived from cwd)
    pub project_id: Option<String>,
    /// Human-friendly project name (last path component of cwd)
    pub project_name: Option<String>,
    /// Timestamp of the first record
    pub started_at: DateTime<Utc>,
    /// Timestamp of the last record
    pub ended_at: DateTime<Utc>,
    /// Ordered, chronological message sequence
    pub messages: Vec<Message>,
    /// Context modules active during the session, in first-seen order
    pub context_modules: Vec<String>,
    /// Transcript file this session was read from
    pub source_file_path: PathBuf,
}

impl Session {
    /// Number of human prompt turns in the session.
    pub fn iteration_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Human)
            .count()
    }

    /// Iterate over the tool invocations made during the session.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.messages.iter().filter_map(|m| m.tool.as_ref())
    }
}

// ============================================
// Messages
// ============================================

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Real person
    Human,
    /// The AI assistant
    Assistant,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Role::Human),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// One turn within a session. Ordering (`seq`) follows transcript order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Sequence number within the session, starting at 1
    pub seq: i32,
    /// Who produced this message
    pub role: Role,
    /// When the message was emitted
    pub ts: DateTime<Utc>,
    /// Text content, if any
    pub content: Option<String>,
    /// Input tokens consumed producing this message
    pub prompt_tokens: i64,
    /// Output tokens generated by this message
    pub response_tokens: i64,
    /// Tool invocation carried by this message, if any
    pub tool: Option<ToolInvocation>,
}

// ============================================
// Tool invocations
// ============================================

/// Fixed set of tool categories.
///
/// Keeping this closed (rather than string-keyed maps) lets the aggregate
/// percentage breakdown cover the whole set by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Running things: shells, task agents
    Execution,
    /// Reading and searching: files, web
    Exploration,
    /// Writing and editing files
    Modification,
    /// Todo lists and plan-mode transitions
    Planning,
    /// Turns back to the human
    Interaction,
    /// Anything unrecognized (MCP extensions etc.)
    Other,
}

impl ToolCategory {
    /// All categories, in reporting order.
    pub const ALL: [ToolCategory; 6] = [
        ToolCategory::Execution,
        ToolCategory::Exploration,
        ToolCategory::Modification,
        ToolCategory::Planning,
        ToolCategory::Interaction,
        ToolCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Execution => "execution",
            ToolCategory::Exploration => "exploration",
            ToolCategory::Modification => "modification",
            ToolCategory::Planning => "planning",
            ToolCategory::Interaction => "interaction",
            ToolCategory::Other => "other",
        }
    }

    /// Classify a tool by name.
    pub fn from_tool_name(name: &str) -> Self {
        match name {
            "Bash" | "Task" | "BashOutput" | "TaskOutput" => ToolCategory::Execution,
            "Read" | "Grep" | "Glob" | "WebSearch" | "WebFetch" => ToolCategory::Exploration,
            "Write" | "Edit" | "MultiEdit" | "NotebookEdit" => ToolCategory::Modification,
            "TodoWrite" | "EnterPlanMode" | "ExitPlanMode" => ToolCategory::Planning,
            "AskUserQuestion" | "KillShell" => ToolCategory::Interaction,
            _ => ToolCategory::Other,
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "execution" => Ok(ToolCategory::Execution),
            "exploration" => Ok(ToolCategory::Exploration),
            "modification" => Ok(ToolCategory::Modification),
            "planning" => Ok(ToolCategory::Planning),
            "interaction" => Ok(ToolCategory::Interaction),
            "other" => Ok(ToolCategory::Other),
            _ => Err(format!("unknown tool category: {}", s)),
        }
    }
}

/// A tool call made by the assistant within a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name as it appears in the transcript ("Read", "Bash", ...)
    pub name: String,
    /// Category the tool falls into
    pub category: ToolCategory,
    /// Whether the invocation completed without error
    pub succeeded: bool,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, succeeded: bool) -> Self {
        let name = name.into();
        let category = ToolCategory::from_tool_name(&name);
        Self {
            name,
            category,
            succeeded,
        }
    }
}

// ============================================
// Per-session metrics (derived)
// ============================================

/// Per-category invocation counts, covering the full [`ToolCategory`] set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub execution: u64,
    pub exploration: u64,
    pub modification: u64,
    pub planning: u64,
    pub interaction: u64,
    pub other: u64,
}

impl CategoryCounts {
    pub fn get(&self, category: ToolCategory) -> u64 {
        match category {
            ToolCategory::Execution => self.execution,
            ToolCategory::Exploration => self.exploration,
            ToolCategory::Modification => self.modification,
            ToolCategory::Planning => self.planning,
            ToolCategory::Interaction => self.interaction,
            ToolCategory::Other => self.other,
        }
    }

    pub fn increment(&mut self, category: ToolCategory) {
        match category {
            ToolCategory::Execution => self.execution += 1,
            ToolCategory::Exploration => self.exploration += 1,
            ToolCategory::Modification => self.modification += 1,
            ToolCategory::Planning => self.planning += 1,
            ToolCategory::Interaction => self.interaction += 1,
            ToolCategory::Other => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        ToolCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Share of `category` in [0,1]; 0 when there are no invocations.
    pub fn share(&self, category: ToolCategory) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(category) as f64 / total as f64
        }
    }
}

/// Summary of prompt-to-response latencies within a session, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

/// Interaction pattern label assigned to a session from its tool mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionPattern {
    /// Planning tools shape the session
    PlanDriven,
    /// Read-edit cycles dominate
    IterativeModification,
    /// Information gathering followed by action
    ExploreThenExecute,
    /// No tools at all
    Conversational,
}

impl InteractionPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionPattern::PlanDriven => "plan_driven",
            InteractionPattern::IterativeModification => "iterative_modification",
            InteractionPattern::ExploreThenExecute => "explore_then_execute",
            InteractionPattern::Conversational => "conversational",
        }
    }
}

impl std::str::FromStr for InteractionPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan_driven" => Ok(InteractionPattern::PlanDriven),
            "iterative_modification" => Ok(InteractionPattern::IterativeModification),
            "explore_then_execute" => Ok(InteractionPattern::ExploreThenExecute),
            "conversational" => Ok(InteractionPattern::Conversational),
            _ => Err(format!("unknown interaction pattern: {}", s)),
        }
    }
}

/// Derived metrics for one session, keyed by session id (one-to-one).
///
/// Invariants: `delegation_score` and `quality_score` are in [0,1];
/// `iteration_count >= 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Session these metrics belong to
    pub session_id: String,
    /// Session start timestamp
    pub started_at: DateTime<Utc>,
    /// Total input tokens across the session
    pub prompt_tokens: i64,
    /// Total output tokens across the session
    pub response_tokens: i64,
    /// Number of messages
    pub message_count: u64,
    /// Number of human prompt turns (>= 1)
    pub iteration_count: u64,
    /// Prompt-to-response latency distribution
    pub latency: LatencySummary,
    /// Tool invocations by category
    pub tool_counts: CategoryCounts,
    /// Invocations that completed without error
    pub tool_successes: u64,
    /// Invocations that errored
    pub tool_errors: u64,
    /// Estimated cognitive offload, in [0,1]
    pub delegation_score: f64,
    /// Estimated outcome quality, in [0,1]
    pub quality_score: f64,
    /// Context modules active during the session
    pub context_used: Vec<String>,
    /// Interaction pattern label
    pub pattern_applied: InteractionPattern,
    /// Deterministic success indicator labels
    pub success_indicators: Vec<String>,
}

impl SessionMetrics {
    /// Session length in tokens, the measure used for complexity ratios.
    pub fn total_tokens(&self) -> i64 {
        self.prompt_tokens + self.response_tokens
    }
}

// ============================================
// Complexity classes
// ============================================

/// Bucket assigned to a session based on its iteration count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    /// Short, few-iteration sessions
    Routine,
    /// Long, many-iteration sessions
    Complex,
}

impl ComplexityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityClass::Routine => "routine",
            ComplexityClass::Complex => "complex",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tool_category_mapping() {
        assert_eq!(
            ToolCategory::from_tool_name("Bash"),
            ToolCategory::Execution
        );
        assert_eq!(
            ToolCategory::from_tool_name("Read"),
            ToolCategory::Exploration
        );
        assert_eq!(
            ToolCategory::from_tool_name("Edit"),
            ToolCategory::Modification
        );
        assert_eq!(
            ToolCategory::from_tool_name("TodoWrite"),
            ToolCategory::Planning
        );
        assert_eq!(
            ToolCategory::from_tool_name("AskUserQuestion"),
            ToolCategory::Interaction
        );
        assert_eq!(
            ToolCategory::from_tool_name("mcp__playwright__browser_navigate"),
            ToolCategory::Other
        );
    }

    #[test]
    fn test_tool_category_round_trip() {
        for category in ToolCategory::ALL {
            assert_eq!(
                ToolCategory::from_str(category.as_str()),
                Ok(category),
                "category {} should round-trip",
                category
            );
        }
    }

    #[test]
    fn test_category_counts_total_and_share() {
        let mut counts = CategoryCounts::default();
        counts.increment(ToolCategory::Exploration);
        counts.increment(ToolCategory::Exploration);
        counts.increment(ToolCategory::Execution);
        counts.increment(ToolCategory::Modification);

        assert_eq!(counts.total(), 4);
        assert_eq!(counts.share(ToolCategory::Exploration), 0.5);
        assert_eq!(counts.share(ToolCategory::Interaction), 0.0);
    }

    #[test]
    fn test_category_counts_empty_share_is_zero() {
        let counts = CategoryCounts::default();
        assert_eq!(counts.share(ToolCategory::Execution), 0.0);
    }

    #[test]
    fn test_tool_invocation_classifies_on_construction() {
        let invocation = ToolInvocation::new("Grep", true);
        assert_eq!(invocation.category, ToolCategory::Exploration);
        assert!(invocation.succeeded);
    }
}
