//! The rule set: two passes over segmenter output.
//!
//! Pass 1 collects declared Schedule names so outcome checks can resolve
//! `rate is determined by X` references. Pass 2 walks the lines with a
//! small scenario state machine and emits findings. Phrase-level checks
//! go through `courgette_core::phrase`; spans reported by the grammar are
//! rebased onto the raw line before they become offsets.

use std::collections::HashSet;

use courgette_core::phrase::{self, Phrase, PhraseReason};
use courgette_core::{BlockKind, LineKind, Outcome, Period};
use courgette_core::segment::{Segmented, SegmentedLine};
use rust_decimal::Decimal;

use crate::{Diagnostic, Severity};

pub fn check(seg: &Segmented) -> Vec<Diagnostic> {
    let mut checker = Checker {
        seg,
        declared: collect_declared(seg),
        scenario: None,
        out: Vec::new(),
    };
    for line in &seg.lines {
        checker.line(line);
    }
    checker.end_scenario();
    let mut out = checker.out;
    // Findings anchored earlier than their detection point (missing
    // outcomes) land back in document order.
    out.sort_by_key(|d| d.start_offset);
    out
}

/// Names recorded by pass 1.
struct Declared {
    schedules: HashSet<String>,
    #[allow(dead_code)] // Recorded with the schedules; no rule resolves terms yet
    definitions: HashSet<String>,
}

/// Pass 1: declared Definition terms and Schedule names.
fn collect_declared(seg: &Segmented) -> Declared {
    let names = |kind: BlockKind| -> HashSet<String> {
        seg.lines
            .iter()
            .filter(|l| l.kind == LineKind::Header(kind))
            .filter_map(|l| l.header_name())
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect()
    };
    Declared {
        schedules: names(BlockKind::Schedule),
        definitions: names(BlockKind::Definition),
    }
}

struct ScenarioState {
    header_line: usize,
    has_condition: bool,
    has_outcome: bool,
    in_outcomes: bool,
    group_open: bool,
}

struct Checker<'a> {
    seg: &'a Segmented,
    declared: Declared,
    scenario: Option<ScenarioState>,
    out: Vec<Diagnostic>,
}

impl Checker<'_> {
    fn line(&mut self, line: &SegmentedLine) {
        if let Some(pos) = line.raw.chars().position(|c| c == '\t') {
            self.push(
                line.index,
                pos,
                pos + 1,
                Severity::Warning,
                "Use spaces instead of tabs for indentation".to_owned(),
            );
        }

        match line.kind {
            LineKind::Blank => {
                if let Some(state) = &mut self.scenario {
                    state.group_open = false;
                }
            }
            LineKind::Comment => {}
            LineKind::Header(kind) => self.header(line, kind),
            LineKind::Text => match line.context {
                Some(BlockKind::Scenario) => self.scenario_line(line),
                Some(BlockKind::Schedule) => self.schedule_line(line),
                // Definition bodies and pre-block text are free prose.
                Some(BlockKind::Definition) | None => {}
            },
        }
    }

    fn header(&mut self, line: &SegmentedLine, kind: BlockKind) {
        self.end_scenario();

        let label_len = kind.label().len();
        let name = line.header_name().unwrap_or("");
        if name.is_empty() {
            let message = match kind {
                BlockKind::Scenario => "Scenario name is required",
                BlockKind::Definition => "Definition term is required",
                BlockKind::Schedule => "Schedule name is required",
            };
            self.push(
                line.index,
                line.indent + label_len,
                self.seg.map.line_len(line.index),
                Severity::Error,
                message.to_owned(),
            );
        } else if kind == BlockKind::Scenario && !name.starts_with(|c: char| c.is_uppercase()) {
            let after = &line.trimmed[label_len..];
            let pad = after.chars().count() - after.trim_start().chars().count();
            let start = line.indent + label_len + pad;
            self.push(
                line.index,
                start,
                start + name.chars().count(),
                Severity::Warning,
                "Scenario names should start with a capital letter".to_owned(),
            );
        }

        if kind == BlockKind::Scenario {
            self.scenario = Some(ScenarioState {
                header_line: line.index,
                has_condition: false,
                has_outcome: false,
                in_outcomes: false,
                group_open: false,
            });
        }
    }

    /// Missing-outcome check, fired whenever a scenario ends (next block
    /// header or end of document). Anchored to the `Scenario:` line.
    fn end_scenario(&mut self) {
        let Some(state) = self.scenario.take() else {
            return;
        };
        if !state.has_outcome {
            self.push(
                state.header_line,
                0,
                self.seg.map.line_len(state.header_line),
                Severity::Error,
                "Scenario missing outcome statements (Then...)".to_owned(),
            );
        }
    }

    fn scenario_line(&mut self, line: &SegmentedLine) {
        if let Some(item) = line.trimmed.strip_prefix("- ") {
            let group_open = self
                .scenario
                .as_ref()
                .map(|s| s.group_open)
                .unwrap_or(false);
            if !group_open {
                self.push(
                    line.index,
                    line.indent,
                    line.indent + 2,
                    Severity::Error,
                    "List items must follow a group declaration (e.g., \"any of these are true:\")"
                        .to_owned(),
                );
            }
            let pad = item.chars().count() - item.trim_start().chars().count();
            let base = line.indent + 2 + pad;
            let item = item.trim();
            let opened_group = self.check_condition(item, line.index, base);
            if let Some(state) = &mut self.scenario {
                if !opened_group && !item.is_empty() {
                    state.has_condition = true;
                }
            }
            return;
        }

        let Some((keyword, rest, rest_col)) = split_keyword(line) else {
            self.push(
                line.index,
                line.indent,
                line.indent + line.trimmed.chars().count(),
                Severity::Error,
                "Expected When, Given, And, Or, Then, or list item (-)".to_owned(),
            );
            return;
        };

        let in_outcomes = self
            .scenario
            .as_ref()
            .map(|s| s.in_outcomes)
            .unwrap_or(false);
        let has_condition = self
            .scenario
            .as_ref()
            .map(|s| s.has_condition)
            .unwrap_or(false);

        match keyword {
            "Then" => {
                if !has_condition {
                    self.push(
                        line.index,
                        line.indent,
                        line.indent + 4,
                        Severity::Error,
                        "Outcomes (Then) must follow conditions (When/Given)".to_owned(),
                    );
                }
                if let Some(state) = &mut self.scenario {
                    state.has_outcome = true;
                    state.in_outcomes = true;
                    state.group_open = false;
                }
                self.check_outcome(rest, line.index, rest_col);
            }
            "And" if in_outcomes => self.check_outcome(rest, line.index, rest_col),
            _ => {
                if keyword == "Or" && !has_condition {
                    self.push(
                        line.index,
                        line.indent,
                        line.indent + 2,
                        Severity::Error,
                        "Or cannot be used before any conditions".to_owned(),
                    );
                }
                let opened_group = self.check_condition(rest, line.index, rest_col);
                if let Some(state) = &mut self.scenario {
                    state.group_open = opened_group;
                    if !opened_group && !rest.is_empty() {
                        state.has_condition = true;
                    }
                }
            }
        }
    }

    /// Phrase-check a condition. Returns whether it opened a group.
    fn check_condition(&mut self, text: &str, index: usize, base: usize) -> bool {
        match phrase::parse_condition(text) {
            Ok(Phrase::GroupOpen(_)) => return true,
            Ok(Phrase::Condition(_)) => self.style_checks(text, index, base),
            Err(err) => {
                let message = match err.reason {
                    PhraseReason::Empty => return false,
                    PhraseReason::MissingOperator => {
                        "Condition missing comparison operator (e.g., ==, <, >, between)".to_owned()
                    }
                    PhraseReason::BadBetween => {
                        "Invalid \"between\" syntax. Use: variable between X and Y".to_owned()
                    }
                    PhraseReason::UnbalancedQuotes => "Unmatched quotes in condition".to_owned(),
                    PhraseReason::BadVariable(name) => {
                        format!("Invalid variable name '{name}'")
                    }
                    PhraseReason::BadOperand(value) => format!("Invalid comparison value '{value}'"),
                    // schedule-entry reasons never come out of conditions
                    PhraseReason::NotScheduleEntry | PhraseReason::BadAmount(_) => {
                        "Condition missing comparison operator (e.g., ==, <, >, between)".to_owned()
                    }
                };
                self.push(
                    index,
                    base + err.start,
                    base + err.end,
                    Severity::Error,
                    message,
                );
            }
        }
        false
    }

    /// Style findings on an otherwise valid condition.
    fn style_checks(&mut self, text: &str, index: usize, base: usize) {
        let mut col = 0usize;
        for word in text.split(' ') {
            let chars = word.chars().count();
            let lower = word.to_ascii_lowercase();
            if (lower == "true" || lower == "false") && word != lower {
                self.push(
                    index,
                    base + col,
                    base + col + chars,
                    Severity::Warning,
                    format!("Boolean values should be lowercase: {lower}"),
                );
            }
            if !word.starts_with('$') {
                if let Some(value) = phrase::parse_number(word) {
                    if value >= Decimal::from(1000) {
                        self.push(
                            index,
                            base + col,
                            base + col + chars,
                            Severity::Warning,
                            "Amounts of 1000 or more should be written with a '$' marker"
                                .to_owned(),
                        );
                    }
                }
            }
            col += chars + 1;
        }
    }

    fn check_outcome(&mut self, text: &str, index: usize, base: usize) {
        self.style_checks(text, index, base);
        let parsed = phrase::parse_outcome_phrase(text);
        match parsed.outcome {
            Outcome::Eligibility { .. } => {}
            Outcome::FixedPayment { .. } => {
                if let (Some(word), Some((start, end))) = (&parsed.period_word, parsed.period_span) {
                    if Period::from_word(word).is_none() {
                        self.push(
                            index,
                            base + start,
                            base + end,
                            Severity::Warning,
                            format!("Unknown period '{word}'. Use: fortnight, week, month, or year"),
                        );
                    }
                }
            }
            Outcome::ScheduleRef { schedule } => {
                if !self.declared.schedules.contains(&schedule) {
                    let start = text
                        .find(&schedule)
                        .map(|i| char_count(&text[..i]))
                        .unwrap_or(0);
                    self.push(
                        index,
                        base + start,
                        base + start + schedule.chars().count(),
                        Severity::Error,
                        format!("Schedule '{schedule}' not defined"),
                    );
                }
            }
            Outcome::Reduction {
                cents_per_dollar, ..
            } => {
                if cents_per_dollar > Decimal::from(100) {
                    self.push(
                        index,
                        base,
                        base + text.chars().count(),
                        Severity::Warning,
                        "Reduction rate is more than 100 cents per dollar".to_owned(),
                    );
                }
            }
            Outcome::Unrecognized { .. } => {
                let (severity, message) = if text.to_ascii_lowercase().starts_with("payment is ") {
                    (Severity::Error, "Invalid payment amount format".to_owned())
                } else {
                    (Severity::Warning, "Unrecognised outcome format".to_owned())
                };
                self.push(
                    index,
                    base,
                    base + text.chars().count(),
                    severity,
                    message,
                );
            }
        }
    }

    fn schedule_line(&mut self, line: &SegmentedLine) {
        if line.trimmed.starts_with("Note:") {
            return;
        }
        match phrase::parse_schedule_entry(&line.trimmed) {
            Ok(entry) => {
                if let (Some(word), Some((start, end))) = (&entry.period_word, entry.period_span) {
                    if Period::from_word(word).is_none() {
                        self.push(
                            line.index,
                            line.indent + start,
                            line.indent + end,
                            Severity::Warning,
                            format!("Unknown period '{word}'. Use: fortnight, week, month, or year"),
                        );
                    }
                }
            }
            Err(err) => {
                let trimmed_len = line.trimmed.chars().count();
                match err.reason {
                    PhraseReason::BadAmount(_) => self.push(
                        line.index,
                        line.indent + err.start,
                        line.indent + err.end,
                        Severity::Error,
                        "Invalid amount format".to_owned(),
                    ),
                    _ if line.trimmed.to_ascii_lowercase().starts_with("when ") => self.push(
                        line.index,
                        line.indent,
                        line.indent + trimmed_len,
                        Severity::Error,
                        "Invalid schedule entry format. Expected: \"When [condition]: $[amount] per [period]\""
                            .to_owned(),
                    ),
                    _ => self.push(
                        line.index,
                        line.indent,
                        line.indent + trimmed_len,
                        Severity::Error,
                        "Expected schedule entry starting with \"When\" or \"Note:\"".to_owned(),
                    ),
                }
            }
        }
    }

    /// Record a finding. `start` and `end` are zero-based character
    /// columns into the raw line.
    fn push(&mut self, index: usize, start: usize, end: usize, severity: Severity, message: String) {
        self.out.push(Diagnostic {
            line: index + 1,
            column: start + 1,
            message,
            severity,
            start_offset: self.seg.map.offset(index, start),
            end_offset: self.seg.map.offset(index, end),
        });
    }
}

/// Leading `When`/`Given`/`And`/`Or`/`Then` keyword, the rest of the
/// phrase, and the rest's zero-based character column in the raw line.
fn split_keyword(line: &SegmentedLine) -> Option<(&'static str, &str, usize)> {
    for keyword in ["When", "Given", "And", "Or", "Then"] {
        if let Some(rest) = line.trimmed.strip_prefix(keyword) {
            if rest.starts_with(char::is_whitespace) {
                let pad = rest.chars().count() - rest.trim_start().chars().count();
                let col = line.indent + keyword.len() + pad;
                return Some((keyword, rest.trim(), col));
            }
        }
    }
    None
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}
