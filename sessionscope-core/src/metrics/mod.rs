//! Per-session metric extraction
//!
//! Distills each normalized [`Session`] into exactly one [`SessionMetrics`].
//! Extraction is deterministic: the same session always yields the same
//! metrics. Sessions failing structural invariants are rejected with a
//! validation error; callers exclude those from aggregation and continue.
//!
//! The delegation-score weights are research parameters, not a system
//! contract, so they arrive through [`ScoringConfig`] at construction time
//! rather than a process-wide default.

use crate::config::ScoringConfig;
use crate::error::{Error, Result};
use crate::types::{
    CategoryCounts, InteractionPattern, LatencySummary, Role, Session, SessionMetrics,
    ToolCategory,
};

/// Minimum planning share that marks a session as plan-driven.
const PLAN_DRIVEN_SHARE: f64 = 0.15;

/// Tool success rate that earns the `high_tool_success` indicator.
const HIGH_SUCCESS_RATE: f64 = 0.9;

/// Computes one [`SessionMetrics`] per session.
pub struct MetricExtractor {
    scoring: ScoringConfig,
}

impl MetricExtractor {
    /// Create an extractor with the given scoring weights.
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    /// Extract metrics for one session.
    ///
    /// Fails with [`Error::Validation`] when the session has no messages,
    /// no human prompt, or inconsistent timestamps.
    pub fn extract(&self, session: &Session) -> Result<SessionMetrics> {
        self.validate(session)?;

        let mut prompt_tokens: i64 = 0;
        let mut response_tokens: i64 = 0;
        let mut tool_counts = CategoryCounts::default();
        let mut tool_successes: u64 = 0;
        let mut tool_errors: u64 = 0;

        for msg in &session.messages {
            prompt_tokens += msg.prompt_tokens;
            response_tokens += msg.response_tokens;

            if let Some(ref tool) = msg.tool {
                tool_counts.increment(tool.category);
                if tool.succeeded {
                    tool_successes += 1;
                } else {
                    tool_errors += 1;
                }
            }
        }

        let iteration_count = session.iteration_count() as u64;
        let latency = latency_summary(session);
        let completed = ends_with_assistant_response(session);

        let delegation_score = self.delegation_score(
            &tool_counts,
            iteration_count,
            tool_successes,
            tool_successes + tool_errors,
        );
        let quality_score = self.quality_score(tool_successes, tool_errors, completed);

        let pattern_applied = classify_pattern(&tool_counts);
        let success_indicators =
            success_indicators(completed, tool_successes, tool_errors);

        Ok(SessionMetrics {
            session_id: session.id.clone(),
            started_at: session.started_at,
            prompt_tokens,
            response_tokens,
            message_count: session.messages.len() as u64,
            iteration_count,
            latency,
            tool_counts,
            tool_successes,
            tool_errors,
            delegation_score,
            quality_score,
            context_used: session.context_modules.clone(),
            pattern_applied,
            success_indicators,
        })
    }

    /// Extract metrics for a whole corpus, excluding invalid sessions.
    ///
    /// Returns the metrics set plus the excluded sessions with the reason.
    /// Per-session validation failures are logged, never fatal.
    pub fn extract_all(&self, sessions: &[Session]) -> (Vec<SessionMetrics>, Vec<(String, String)>) {
        let mut metrics = Vec::with_capacity(sessions.len());
        let mut excluded = Vec::new();

        for session in sessions {
            match self.extract(session) {
                Ok(m) => metrics.push(m),
                Err(e) => {
                    tracing::warn!(
                        session_id = %session.id,
                        error = %e,
                        "Excluding session from metrics"
                    );
                    excluded.push((session.id.clone(), e.to_string()));
                }
            }
        }

        (metrics, excluded)
    }

    fn validate(&self, session: &Session) -> Result<()> {
        if session.messages.is_empty() {
            return Err(Error::Validation {
                session_id: session.id.clone(),
                message: "empty message sequence".to_string(),
            });
        }

        if session.ended_at < session.started_at {
            return Err(Error::Validation {
                session_id: session.id.clone(),
                message: format!(
                    "end {} before start {}",
                    session.ended_at, session.started_at
                ),
            });
        }

        if session.iteration_count() == 0 {
            return Err(Error::Validation {
                session_id: session.id.clone(),
                message: "no human prompt".to_string(),
            });
        }

        for msg in &session.messages {
            if msg.ts < session.started_at || msg.ts > session.ended_at {
                return Err(Error::Validation {
                    session_id: session.id.clone(),
                    message: format!("message {} outside session bounds", msg.seq),
                });
            }
        }

        Ok(())
    }

    /// Weighted blend of tool mix, iteration depth, and acceptance rate,
    /// clamped into [0,1].
    fn delegation_score(
        &self,
        tool_counts: &CategoryCounts,
        iteration_count: u64,
        successes: u64,
        invocations: u64,
    ) -> f64 {
        let tool_mix: f64 = ToolCategory::ALL
            .iter()
            .map(|c| tool_counts.share(*c) * self.scoring.category_weight(*c))
            .sum();

        let iteration = 1.0 - 1.0 / iteration_count.max(1) as f64;

        let acceptance = if invocations > 0 {
            successes as f64 / invocations as f64
        } else {
            0.0
        };

        let blend_total = self.scoring.tool_mix_blend
            + self.scoring.iteration_blend
            + self.scoring.acceptance_blend;

        let score = (self.scoring.tool_mix_blend * tool_mix
            + self.scoring.iteration_blend * iteration
            + self.scoring.acceptance_blend * acceptance)
            / blend_total;

        score.clamp(0.0, 1.0)
    }

    /// Error-free ratio blended with the completion indicator, in [0,1].
    fn quality_score(&self, successes: u64, errors: u64, completed: bool) -> f64 {
        let invocations = successes + errors;
        // A session that never touched a tool has no tool errors to count
        let error_free = if invocations > 0 {
            successes as f64 / invocations as f64
        } else {
            1.0
        };

        let w = self.scoring.quality_success_weight;
        let score = w * error_free + (1.0 - w) * if completed { 1.0 } else { 0.0 };
        score.clamp(0.0, 1.0)
    }
}

/// Whether the last conversational message is an assistant response.
fn ends_with_assistant_response(session: &Session) -> bool {
    session
        .messages
        .iter()
        .rev()
        .find(|m| matches!(m.role, Role::Human | Role::Assistant))
        .map(|m| m.role == Role::Assistant)
        .unwrap_or(false)
}

/// Prompt-to-response gaps: each human prompt paired with the next
/// assistant message, in milliseconds.
fn latency_summary(session: &Session) -> LatencySummary {
    let mut gaps_ms: Vec<f64> = Vec::new();

    for (i, msg) in session.messages.iter().enumerate() {
        if msg.role != Role::Human {
            continue;
        }
        if let Some(response) = session.messages[i + 1..]
            .iter()
            .find(|m| m.role == Role::Assistant)
        {
            let gap = response.ts.signed_duration_since(msg.ts).num_milliseconds();
            if gap >= 0 {
                gaps_ms.push(gap as f64);
            }
        }
    }

    if gaps_ms.is_empty() {
        return LatencySummary::default();
    }

    gaps_ms.sort_by(|a, b| a.partial_cmp(b).expect("latency gaps are finite"));

    let mean_ms = gaps_ms.iter().sum::<f64>() / gaps_ms.len() as f64;
    LatencySummary {
        mean_ms,
        p50_ms: percentile(&gaps_ms, 50.0),
        p95_ms: percentile(&gaps_ms, 95.0),
        max_ms: *gaps_ms.last().expect("nonempty"),
    }
}

/// Nearest-rank percentile over a sorted slice.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Assign an interaction-pattern label from the category mix.
///
/// First match wins: a visible planning share marks the session
/// plan-driven; modification dominating exploration marks read-edit
/// cycling; any other tool use is explore-then-execute; tool-free sessions
/// are purely conversational.
fn classify_pattern(tool_counts: &CategoryCounts) -> InteractionPattern {
    if tool_counts.total() == 0 {
        return InteractionPattern::Conversational;
    }

    let planning = tool_counts.share(ToolCategory::Planning);
    let modification = tool_counts.share(ToolCategory::Modification);
    let exploration = tool_counts.share(ToolCategory::Exploration);

    if planning >= PLAN_DRIVEN_SHARE {
        InteractionPattern::PlanDriven
    } else if modification > 0.0 && modification >= exploration {
        InteractionPattern::IterativeModification
    } else {
        InteractionPattern::ExploreThenExecute
    }
}

fn success_indicators(completed: bool, successes: u64, errors: u64) -> Vec<String> {
    let mut indicators = Vec::new();

    if completed {
        indicators.push("completed".to_string());
    }
    if errors == 0 {
        indicators.push("no_tool_errors".to_string());
    }
    let invocations = successes + errors;
    if invocations > 0 && successes as f64 / invocations as f64 >= HIGH_SUCCESS_RATE {
        indicators.push("high_tool_success".to_string());
    }

    indicators
}
