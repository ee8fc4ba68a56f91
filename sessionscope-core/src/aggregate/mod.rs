//! Corpus-wide aggregation
//!
//! Consumes the full set of [`SessionMetrics`] (treated as an unordered
//! multiset) and produces one [`AggregateReport`] per pipeline run. All
//! accumulation structures are private to the call; nothing is shared or
//! mutated outside it.
//!
//! The report deliberately contains no wall-clock timestamps: two runs over
//! an unchanged corpus serialize to byte-identical output.

use crate::config::ComplexityConfig;
use crate::error::{Error, Result};
use crate::metrics::percentile;
use crate::types::{ComplexityClass, SessionMetrics, ToolCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Usage of one tool category across the corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryUsage {
    /// Invocations in this category across all sessions
    pub count: u64,
    /// Share of the total invocation count, in percent
    pub percentage: f64,
}

/// Tool usage across the full category set.
///
/// One field per [`ToolCategory`] variant, so the percentage breakdown
/// covers the whole set by construction and serializes in a fixed order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolUsageBreakdown {
    pub execution: CategoryUsage,
    pub exploration: CategoryUsage,
    pub modification: CategoryUsage,
    pub planning: CategoryUsage,
    pub interaction: CategoryUsage,
    pub other: CategoryUsage,
}

impl ToolUsageBreakdown {
    pub fn get(&self, category: ToolCategory) -> CategoryUsage {
        match category {
            ToolCategory::Execution => self.execution,
            ToolCategory::Exploration => self.exploration,
            ToolCategory::Modification => self.modification,
            ToolCategory::Planning => self.planning,
            ToolCategory::Interaction => self.interaction,
            ToolCategory::Other => self.other,
        }
    }

    fn set(&mut self, category: ToolCategory, usage: CategoryUsage) {
        match category {
            ToolCategory::Execution => self.execution = usage,
            ToolCategory::Exploration => self.exploration = usage,
            ToolCategory::Modification => self.modification = usage,
            ToolCategory::Planning => self.planning = usage,
            ToolCategory::Interaction => self.interaction = usage,
            ToolCategory::Other => self.other = usage,
        }
    }

    /// Sum of all category percentages.
    pub fn percentage_sum(&self) -> f64 {
        ToolCategory::ALL
            .iter()
            .map(|c| self.get(*c).percentage)
            .sum()
    }
}

/// Session counts and mean lengths per complexity class, plus their ratio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityBreakdown {
    /// Threshold used for the partition (iterations)
    pub complex_iteration_threshold: u64,
    pub routine_sessions: u64,
    pub complex_sessions: u64,
    /// Mean session length (tokens) of the routine class, if any
    pub mean_routine_length_tokens: Option<f64>,
    /// Mean session length (tokens) of the complex class, if any
    pub mean_complex_length_tokens: Option<f64>,
    /// Mean complex length divided by mean routine length; absent when
    /// either class is empty
    pub session_length_ratio: Option<f64>,
}

/// Message volume per UTC day, attributed to the session's start date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyMessageSummary {
    /// Days with at least one message
    pub active_days: u64,
    pub mean_messages_per_day: f64,
    pub peak_messages_per_day: u64,
    /// ISO date of the busiest day (earliest on ties)
    pub peak_day: Option<String>,
}

/// Session-length percentiles, in tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPercentiles {
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

/// Corpus-wide statistics for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_sessions: u64,
    pub total_messages: u64,
    pub total_tool_invocations: u64,
    pub mean_delegation_score: f64,
    pub mean_quality_score: f64,
    pub complexity: ComplexityBreakdown,
    pub tool_usage: ToolUsageBreakdown,
    pub daily_messages: DailyMessageSummary,
    pub session_length_percentiles: TokenPercentiles,
    /// Delegation-score counts over ten equal [0,1] buckets
    pub delegation_histogram: [u64; 10],
}

/// Partitions and summarizes the full metrics set.
pub struct Aggregator {
    complexity: ComplexityConfig,
}

impl Aggregator {
    /// Create an aggregator with the given partitioning configuration.
    pub fn new(complexity: ComplexityConfig) -> Self {
        Self { complexity }
    }

    /// Classify a session by its iteration count.
    pub fn classify(&self, metrics: &SessionMetrics) -> ComplexityClass {
        if metrics.iteration_count >= self.complexity.complex_iteration_threshold {
            ComplexityClass::Complex
        } else {
            ComplexityClass::Routine
        }
    }

    /// Aggregate the full metrics set into one report.
    ///
    /// Fails with [`Error::EmptyCorpus`] on zero sessions; an aggregate
    /// over nothing has no meaning and must never look like a zero report.
    pub fn aggregate(&self, metrics: &[SessionMetrics]) -> Result<AggregateReport> {
        if metrics.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let total_sessions = metrics.len() as u64;
        let total_messages: u64 = metrics.iter().map(|m| m.message_count).sum();

        let mean_delegation_score =
            metrics.iter().map(|m| m.delegation_score).sum::<f64>() / total_sessions as f64;
        let mean_quality_score =
            metrics.iter().map(|m| m.quality_score).sum::<f64>() / total_sessions as f64;

        let tool_usage = self.tool_usage(metrics);
        let total_tool_invocations = ToolCategory::ALL
            .iter()
            .map(|c| tool_usage.get(*c).count)
            .sum();

        let complexity = self.complexity_breakdown(metrics);
        let daily_messages = self.daily_messages(metrics);
        let session_length_percentiles = self.session_length_percentiles(metrics);
        let delegation_histogram = self.delegation_histogram(metrics);

        Ok(AggregateReport {
            total_sessions,
            total_messages,
            total_tool_invocations,
            mean_delegation_score,
            mean_quality_score,
            complexity,
            tool_usage,
            daily_messages,
            session_length_percentiles,
            delegation_histogram,
        })
    }

    fn tool_usage(&self, metrics: &[SessionMetrics]) -> ToolUsageBreakdown {
        let mut breakdown = ToolUsageBreakdown::default();

        let total: u64 = metrics.iter().map(|m| m.tool_counts.total()).sum();

        for category in ToolCategory::ALL {
            let count: u64 = metrics.iter().map(|m| m.tool_counts.get(category)).sum();
            let percentage = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            breakdown.set(category, CategoryUsage { count, percentage });
        }

        breakdown
    }

    fn complexity_breakdown(&self, metrics: &[SessionMetrics]) -> ComplexityBreakdown {
        let mut routine_lengths: Vec<f64> = Vec::new();
        let mut complex_lengths: Vec<f64> = Vec::new();

        for m in metrics {
            match self.classify(m) {
                ComplexityClass::Routine => routine_lengths.push(m.total_tokens() as f64),
                ComplexityClass::Complex => complex_lengths.push(m.total_tokens() as f64),
            }
        }

        let mean = |lengths: &[f64]| -> Option<f64> {
            if lengths.is_empty() {
                None
            } else {
                Some(lengths.iter().sum::<f64>() / lengths.len() as f64)
            }
        };

        let mean_routine = mean(&routine_lengths);
        let mean_complex = mean(&complex_lengths);

        let session_length_ratio = match (mean_complex, mean_routine) {
            (Some(complex), Some(routine)) if routine > 0.0 => Some(complex / routine),
            _ => None,
        };

        ComplexityBreakdown {
            complex_iteration_threshold: self.complexity.complex_iteration_threshold,
            routine_sessions: routine_lengths.len() as u64,
            complex_sessions: complex_lengths.len() as u64,
            mean_routine_length_tokens: mean_routine,
            mean_complex_length_tokens: mean_complex,
            session_length_ratio,
        }
    }

    fn daily_messages(&self, metrics: &[SessionMetrics]) -> DailyMessageSummary {
        let mut per_day: BTreeMap<String, u64> = BTreeMap::new();

        for m in metrics {
            let day = m.started_at.date_naive().to_string();
            *per_day.entry(day).or_insert(0) += m.message_count;
        }

        let active_days = per_day.len() as u64;
        let total: u64 = per_day.values().sum();
        let mean_messages_per_day = if active_days > 0 {
            total as f64 / active_days as f64
        } else {
            0.0
        };

        // BTreeMap order makes the earliest day win ties
        let mut peak_day: Option<String> = None;
        let mut peak_messages_per_day = 0u64;
        for (day, count) in &per_day {
            if *count > peak_messages_per_day {
                peak_messages_per_day = *count;
                peak_day = Some(day.clone());
            }
        }

        DailyMessageSummary {
            active_days,
            mean_messages_per_day,
            peak_messages_per_day,
            peak_day,
        }
    }

    fn session_length_percentiles(&self, metrics: &[SessionMetrics]) -> TokenPercentiles {
        let mut lengths: Vec<f64> = metrics.iter().map(|m| m.total_tokens() as f64).collect();
        lengths.sort_by(|a, b| a.partial_cmp(b).expect("token counts are finite"));

        TokenPercentiles {
            p50: percentile(&lengths, 50.0),
            p90: percentile(&lengths, 90.0),
            p99: percentile(&lengths, 99.0),
        }
    }

    fn delegation_histogram(&self, metrics: &[SessionMetrics]) -> [u64; 10] {
        let mut buckets = [0u64; 10];
        for m in metrics {
            let bucket = ((m.delegation_score * 10.0).floor() as usize).min(9);
            buckets[bucket] += 1;
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryCounts, InteractionPattern, LatencySummary};
    use chrono::{TimeZone, Utc};

    fn metrics(
        id: &str,
        day: u32,
        iterations: u64,
        tokens: i64,
        messages: u64,
        delegation: f64,
    ) -> SessionMetrics {
        SessionMetrics {
            session_id: id.to_string(),
            started_at: Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0).unwrap(),
            prompt_tokens: tokens / 2,
            response_tokens: tokens - tokens / 2,
            message_count: messages,
            iteration_count: iterations,
            latency: LatencySummary::default(),
            tool_counts: CategoryCounts::default(),
            tool_successes: 0,
            tool_errors: 0,
            delegation_score: delegation,
            quality_score: 0.8,
            context_used: vec![],
            pattern_applied: InteractionPattern::Conversational,
            success_indicators: vec![],
        }
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        let aggregator = Aggregator::new(ComplexityConfig::default());
        let err = aggregator.aggregate(&[]).expect_err("must fail");
        assert!(matches!(err, Error::EmptyCorpus));
    }

    #[test]
    fn test_session_length_ratio_between_classes() {
        // Routine: 1 iteration, 50 tokens. Complex: 8 iterations, 400 tokens.
        let aggregator = Aggregator::new(ComplexityConfig {
            complex_iteration_threshold: 4,
        });
        let corpus = vec![
            metrics("a", 2, 1, 50, 4, 0.3),
            metrics("b", 3, 8, 400, 20, 0.7),
        ];

        let report = aggregator.aggregate(&corpus).expect("aggregate");

        assert_eq!(report.complexity.routine_sessions, 1);
        assert_eq!(report.complexity.complex_sessions, 1);
        assert_eq!(report.complexity.mean_routine_length_tokens, Some(50.0));
        assert_eq!(report.complexity.mean_complex_length_tokens, Some(400.0));
        assert_eq!(report.complexity.session_length_ratio, Some(8.0));
    }

    #[test]
    fn test_ratio_absent_when_one_class_is_empty() {
        let aggregator = Aggregator::new(ComplexityConfig::default());
        let corpus = vec![metrics("a", 2, 1, 50, 4, 0.3)];

        let report = aggregator.aggregate(&corpus).expect("aggregate");
        assert_eq!(report.complexity.complex_sessions, 0);
        assert!(report.complexity.session_length_ratio.is_none());
    }

    #[test]
    fn test_tool_percentages_sum_to_one_hundred() {
        let aggregator = Aggregator::new(ComplexityConfig::default());

        let mut a = metrics("a", 2, 2, 100, 10, 0.5);
        a.tool_counts.execution = 3;
        a.tool_counts.exploration = 5;
        a.tool_counts.other = 1;
        let mut b = metrics("b", 2, 5, 300, 25, 0.6);
        b.tool_counts.modification = 4;
        b.tool_counts.planning = 2;
        b.tool_counts.interaction = 1;

        let report = aggregator.aggregate(&[a, b]).expect("aggregate");

        assert_eq!(report.total_tool_invocations, 16);
        assert!((report.tool_usage.percentage_sum() - 100.0).abs() < 0.01);
        assert_eq!(report.tool_usage.exploration.count, 5);
        assert!((report.tool_usage.exploration.percentage - 31.25).abs() < 1e-9);
    }

    #[test]
    fn test_zero_invocations_reports_zero_percentages() {
        let aggregator = Aggregator::new(ComplexityConfig::default());
        let report = aggregator
            .aggregate(&[metrics("a", 2, 1, 50, 4, 0.3)])
            .expect("aggregate");

        assert_eq!(report.total_tool_invocations, 0);
        assert_eq!(report.tool_usage.percentage_sum(), 0.0);
    }

    #[test]
    fn test_mean_scores() {
        let aggregator = Aggregator::new(ComplexityConfig::default());
        let corpus = vec![
            metrics("a", 2, 1, 50, 4, 0.2),
            metrics("b", 3, 8, 400, 20, 0.6),
        ];

        let report = aggregator.aggregate(&corpus).expect("aggregate");
        assert!((report.mean_delegation_score - 0.4).abs() < 1e-9);
        assert!((report.mean_quality_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_daily_message_summary_with_tied_peak() {
        let aggregator = Aggregator::new(ComplexityConfig::default());
        let corpus = vec![
            metrics("a", 2, 1, 50, 10, 0.3),
            metrics("b", 5, 2, 80, 10, 0.4),
            metrics("c", 5, 2, 80, 2, 0.4),
        ];

        let report = aggregator.aggregate(&corpus).expect("aggregate");
        assert_eq!(report.daily_messages.active_days, 2);
        assert_eq!(report.daily_messages.peak_messages_per_day, 12);
        assert_eq!(report.daily_messages.peak_day.as_deref(), Some("2025-06-05"));
        assert_eq!(report.daily_messages.mean_messages_per_day, 11.0);
    }

    #[test]
    fn test_daily_peak_prefers_earliest_on_tie() {
        let aggregator = Aggregator::new(ComplexityConfig::default());
        let corpus = vec![
            metrics("a", 7, 1, 50, 6, 0.3),
            metrics("b", 3, 1, 50, 6, 0.3),
        ];

        let report = aggregator.aggregate(&corpus).expect("aggregate");
        assert_eq!(report.daily_messages.peak_day.as_deref(), Some("2025-06-03"));
    }

    #[test]
    fn test_delegation_histogram_buckets() {
        let aggregator = Aggregator::new(ComplexityConfig::default());
        let corpus = vec![
            metrics("a", 2, 1, 50, 4, 0.0),
            metrics("b", 2, 1, 50, 4, 0.05),
            metrics("c", 2, 1, 50, 4, 0.55),
            metrics("d", 2, 1, 50, 4, 1.0),
        ];

        let report = aggregator.aggregate(&corpus).expect("aggregate");
        assert_eq!(report.delegation_histogram[0], 2);
        assert_eq!(report.delegation_histogram[5], 1);
        assert_eq!(report.delegation_histogram[9], 1);
        assert_eq!(report.delegation_histogram.iter().sum::<u64>(), 4);
    }

    #[test]
    fn test_session_length_percentiles() {
        let aggregator = Aggregator::new(ComplexityConfig::default());
        let corpus = vec![
            metrics("a", 2, 1, 100, 4, 0.3),
            metrics("b", 2, 1, 200, 4, 0.3),
            metrics("c", 2, 1, 300, 4, 0.3),
            metrics("d", 2, 1, 400, 4, 0.3),
        ];

        let report = aggregator.aggregate(&corpus).expect("aggregate");
        assert_eq!(report.session_length_percentiles.p50, 200.0);
        assert_eq!(report.session_length_percentiles.p99, 400.0);
    }
}
