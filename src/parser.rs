//! Line parser for the model's free-text evaluation reply.
//!
//! The rubric asks the model for a `Summary:` block followed by an
//! `Agent Evaluation:` section with three scored bullets. Models mostly
//! comply, so the parser is a single forward pass over lines with a section
//! cursor, and it never fails: anything unrecognizable degrades to the
//! defaults (empty text, score 1) field by field.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::types::CategoryEval;

static BEHAVIOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)- Behavior:\s*(.*)\(Score:\s*(\d)/5\)").expect("Valid behavior regex")
});

static CONVERSATION_QUALITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)- Conversation Quality:\s*(.*)\(Score:\s*(\d)/5\)")
        .expect("Valid conversation quality regex")
});

static KNOW_HOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)- Know-How of the Issue:\s*(.*)\(Score:\s*(\d)/5\)")
        .expect("Valid know-how regex")
});

/// Structured capture of one completion reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedEvaluation {
    /// Prose from the `Summary:` section, whitespace-normalized at the ends
    pub summary: String,

    pub behavior: CategoryEval,
    pub conversation_quality: CategoryEval,
    pub know_how: CategoryEval,

    /// True when the reply carried the full expected structure: a summary
    /// marker plus all three bullets in score-annotated form. Only used for
    /// logging; degraded replies still produce a usable record.
    pub fully_parsed: bool,
}

/// Parse a completion reply into summary and scored categories.
///
/// Marker matching is case-insensitive on a trimmed copy of each line; text
/// and scores are captured from the original line. Duplicate markers
/// overwrite earlier captures. A bullet missing its `(Score: X/5)` suffix is
/// dropped whole, text included.
pub fn parse_completion(completion: &str) -> ParsedEvaluation {
    let mut parsed = ParsedEvaluation::default();
    let mut summary = String::new();
    let mut in_summary = false;
    let mut saw_summary = false;
    let mut matched = [false; 3];

    for line in completion.lines() {
        let probe = line.trim().to_lowercase();

        if probe.starts_with("summary:") {
            // Marker line; any text after the label on the same line is
            // discarded, and a repeated marker restarts the section.
            summary.clear();
            in_summary = true;
            saw_summary = true;
        } else if probe.contains("- behavior:") {
            matched[0] |= capture_category(&BEHAVIOR, line, &mut parsed.behavior);
            in_summary = false;
        } else if probe.contains("- conversation quality:") {
            matched[1] |=
                capture_category(&CONVERSATION_QUALITY, line, &mut parsed.conversation_quality);
            in_summary = false;
        } else if probe.contains("- know-how of the issue:") {
            matched[2] |= capture_category(&KNOW_HOW, line, &mut parsed.know_how);
            in_summary = false;
        } else if probe.starts_with("agent evaluation:") {
            // Section header the rubric itself requests; ends the summary
            // without contributing prose.
            in_summary = false;
        } else if in_summary {
            summary.push_str(line);
            summary.push(' ');
        }
    }

    parsed.summary = summary.trim().to_string();
    parsed.fully_parsed = saw_summary && matched.iter().all(|m| *m);
    parsed
}

fn capture_category(pattern: &Regex, line: &str, target: &mut CategoryEval) -> bool {
    match pattern.captures(line) {
        Some(caps) => {
            target.text = caps[1].trim().to_string();
            target.score = caps[2].parse().unwrap_or(1);
            true
        }
        None => {
            debug!(line = line.trim(), "category bullet without parseable score");
            false
        }
    }
}
