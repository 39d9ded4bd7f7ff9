//! The shared phrase grammar.
//!
//! Both the compiler and the diagnostics engine recognize conditions,
//! outcomes, and schedule entries through this module, so the two
//! pipelines can never drift on what counts as well-formed.
//!
//! Natural-language comparison phrases are matched case-insensitively
//! and longest-phrase-first ("is no more than" must win over the bare
//! "is"). Errors carry a reason plus a character span relative to the
//! trimmed input phrase so diagnostics can highlight exact substrings.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::ast::{ConditionNode, GroupKind, Operand, Operator, Outcome, Period};

/// Words that cannot be used as variable names: boolean and logical
/// vocabulary, comparison-phrase words, and period keywords.
pub const RESERVED_WORDS: &[&str] = &[
    "and", "or", "not", "between", "is", "true", "false", "yes", "no", "eligible", "less",
    "greater", "more", "than", "least", "most", "equal", "to", "per", "fortnight", "week", "month",
    "year",
];

/// Natural-language operator table, ordered longest-phrase-first.
const PHRASE_OPS: &[(&str, Operator)] = &[
    ("is not equal to", Operator::Ne),
    ("is no more than", Operator::Le),
    ("is no less than", Operator::Ge),
    ("is greater than", Operator::Gt),
    ("is less than", Operator::Lt),
    ("is more than", Operator::Gt),
    ("is equal to", Operator::Eq),
    ("is at least", Operator::Ge),
    ("is at most", Operator::Le),
    ("is not", Operator::Ne),
    ("is", Operator::Eq),
];

const SYMBOL_OPS: &[(&str, Operator)] = &[
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("<", Operator::Lt),
    (">", Operator::Gt),
];

/// A recognized condition line.
#[derive(Debug, Clone, PartialEq)]
pub enum Phrase {
    Condition(ConditionNode),
    /// `any/all/none of these are true:` or `... the following:` --
    /// subsequent list items become the group's children.
    GroupOpen(GroupKind),
}

/// Why a phrase failed to parse, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum PhraseReason {
    Empty,
    MissingOperator,
    BadBetween,
    UnbalancedQuotes,
    BadVariable(String),
    BadOperand(String),
    NotScheduleEntry,
    BadAmount(String),
}

/// A phrase parse failure with a character span relative to the trimmed
/// input phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseError {
    pub reason: PhraseReason,
    pub start: usize,
    pub end: usize,
}

impl PhraseError {
    fn new(reason: PhraseReason, start: usize, end: usize) -> Self {
        PhraseError { reason, start, end }
    }

    /// Shift the span right, for errors reported from a sub-phrase.
    fn offset(mut self, by: usize) -> Self {
        self.start += by;
        self.end += by;
        self
    }
}

// ──────────────────────────────────────────────
// Identifier and literal helpers
// ──────────────────────────────────────────────

/// Letters, digits, underscore; not starting with a digit; not reserved.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !RESERVED_WORDS.contains(&ascii_lower(name).as_str())
}

/// Lower-case identifier derived from free text: whitespace becomes `_`,
/// other non-alphanumeric characters are dropped.
pub fn slug(name: &str) -> String {
    let mut words = Vec::new();
    for word in name.split_whitespace() {
        let cleaned: String = word
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if !cleaned.is_empty() {
            words.push(cleaned);
        }
    }
    words.join("_")
}

/// Parse a numeric literal: optional leading `$`, thousands separators
/// (`,` or `_`) removed.
pub fn parse_number(token: &str) -> Option<Decimal> {
    let t = token.strip_prefix('$').unwrap_or(token);
    if t.is_empty() || !t.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '_' || c == '.') {
        return None;
    }
    let cleaned: String = t.chars().filter(|c| *c != ',' && *c != '_').collect();
    Decimal::from_str(&cleaned).ok()
}

/// ASCII-only lowering; byte length is preserved so byte indices into the
/// original and lowered strings line up.
fn ascii_lower(s: &str) -> String {
    s.chars().map(|c| c.to_ascii_lowercase()).collect()
}

/// Character column of a byte index.
fn char_col(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx].chars().count()
}

/// Byte index of `word` (one or more space-separated words) appearing at
/// word boundaries in `lower`.
fn find_word(lower: &str, word: &str) -> Option<usize> {
    let padded = format!(" {} ", lower);
    let target = format!(" {} ", word);
    padded.find(&target)
}

/// Tokens of `s` with their byte positions.
fn tokens_with_pos(s: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut rest = s;
    let mut base = 0usize;
    loop {
        let trimmed = rest.trim_start();
        base += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            break;
        }
        let end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        out.push((base, &trimmed[..end]));
        base += end;
        rest = &trimmed[end..];
    }
    out
}

// ──────────────────────────────────────────────
// Conditions
// ──────────────────────────────────────────────

/// Parse one condition phrase (the part after `When`/`Given`/`And`/`Or`
/// or a `- ` list marker) into the shared condition model.
pub fn parse_condition(text: &str) -> Result<Phrase, PhraseError> {
    let phrase = text.trim();
    let total = phrase.chars().count();
    if phrase.is_empty() {
        return Err(PhraseError::new(PhraseReason::Empty, 0, 0));
    }
    let lower = ascii_lower(phrase);

    if let Some(kind) = group_opener(&lower) {
        return Ok(Phrase::GroupOpen(kind));
    }

    let quotes = phrase.chars().filter(|c| *c == '"' || *c == '\'').count();
    if quotes % 2 != 0 {
        return Err(PhraseError::new(PhraseReason::UnbalancedQuotes, 0, total));
    }

    // Unary negation sugar: `not X` is a NONE group over one child.
    if lower.starts_with("not ") {
        let rest = &phrase[4..];
        let lead = rest.len() - rest.trim_start().len();
        let base = char_col(phrase, 4 + lead);
        return match parse_condition(rest) {
            Ok(Phrase::Condition(node)) => Ok(Phrase::Condition(ConditionNode::Group {
                kind: GroupKind::NoneOf,
                children: vec![node],
            })),
            Ok(Phrase::GroupOpen(_)) => {
                Err(PhraseError::new(PhraseReason::MissingOperator, 0, total))
            }
            Err(e) => Err(e.offset(base)),
        };
    }

    if find_word(&lower, "between").is_some() {
        return parse_between(phrase, &lower).map(Phrase::Condition);
    }

    if let Some((start, len, op)) = find_operator(&lower) {
        let left_raw = &phrase[..start];
        let left = left_raw.trim();
        if left.split_whitespace().count() != 1 || !is_valid_identifier(left) {
            let end = char_col(phrase, start - (left_raw.len() - left_raw.trim_end().len()));
            return Err(PhraseError::new(
                PhraseReason::BadVariable(left.to_owned()),
                0,
                end,
            ));
        }
        let right_raw = &phrase[start + len..];
        let lead = right_raw.len() - right_raw.trim_start().len();
        let right = right_raw.trim();
        let right_base = char_col(phrase, start + len + lead);
        let operand = parse_operand(right, right_base, total)?;
        return Ok(Phrase::Condition(ConditionNode::Comparison {
            variable: left.to_owned(),
            op,
            operand,
        }));
    }

    // Operator-less: a bare identifier is an implicit-truthiness flag.
    if phrase.split_whitespace().count() == 1 && is_valid_identifier(phrase) {
        return Ok(Phrase::Condition(ConditionNode::Flag {
            variable: phrase.to_owned(),
        }));
    }

    Err(PhraseError::new(PhraseReason::MissingOperator, 0, total))
}

fn group_opener(lower: &str) -> Option<GroupKind> {
    if !(lower.ends_with("these are true:") || lower.ends_with("the following:")) {
        return None;
    }
    if lower.contains("any of") {
        Some(GroupKind::Any)
    } else if lower.contains("none of") {
        Some(GroupKind::NoneOf)
    } else {
        Some(GroupKind::All)
    }
}

fn find_operator(lower: &str) -> Option<(usize, usize, Operator)> {
    for (phrase, op) in PHRASE_OPS {
        if let Some(i) = find_word(lower, phrase) {
            return Some((i, phrase.len(), *op));
        }
    }
    for (sym, op) in SYMBOL_OPS {
        if let Some(i) = lower.find(sym) {
            return Some((i, sym.len(), *op));
        }
    }
    None
}

/// `VAR between LOW and HIGH`, inclusive both ends. Exactly one variable
/// is permitted before `between`; the bounds must both be numbers. This
/// deliberately rejects the two-variable forms the original handled by
/// silently rewriting the second name.
fn parse_between(phrase: &str, lower: &str) -> Result<ConditionNode, PhraseError> {
    let word_start = find_word(lower, "between").unwrap_or(0);
    let span = (
        char_col(phrase, word_start),
        char_col(phrase, word_start) + "between".len(),
    );
    let bad = || PhraseError::new(PhraseReason::BadBetween, span.0, span.1);

    let toks: Vec<&str> = phrase.split_whitespace().collect();
    let idx = toks
        .iter()
        .position(|t| t.eq_ignore_ascii_case("between"))
        .ok_or_else(bad)?;
    if idx != 1 || toks.len() != idx + 4 || !toks[idx + 2].eq_ignore_ascii_case("and") {
        return Err(bad());
    }
    let variable = toks[0];
    if !is_valid_identifier(variable) {
        return Err(PhraseError::new(
            PhraseReason::BadVariable(variable.to_owned()),
            0,
            variable.chars().count(),
        ));
    }
    let low = parse_number(toks[idx + 1]).ok_or_else(bad)?;
    let high = parse_number(toks[idx + 3]).ok_or_else(bad)?;
    Ok(ConditionNode::Range {
        variable: variable.to_owned(),
        low,
        high,
    })
}

fn parse_operand(right: &str, base: usize, total: usize) -> Result<Operand, PhraseError> {
    let err = |s: &str| PhraseError::new(PhraseReason::BadOperand(s.to_owned()), base, total);
    if right.is_empty() {
        return Err(err(right));
    }
    for quote in ['"', '\''] {
        if right.len() >= 2 && right.starts_with(quote) && right.ends_with(quote) {
            return Ok(Operand::Str(right[1..right.len() - 1].to_owned()));
        }
    }
    match ascii_lower(right).as_str() {
        "true" | "yes" | "eligible" => return Ok(Operand::Bool(true)),
        "false" | "no" => return Ok(Operand::Bool(false)),
        _ => {}
    }
    let first = right.chars().next().unwrap_or(' ');
    if first == '$' || first.is_ascii_digit() {
        return parse_number(right).map(Operand::Number).ok_or_else(|| err(right));
    }
    if is_valid_identifier(right) {
        return Ok(Operand::Ident(right.to_owned()));
    }
    Err(err(right))
}

// ──────────────────────────────────────────────
// Outcomes
// ──────────────────────────────────────────────

/// A parsed outcome with the payment period word as written, when one
/// was given, for validity checks.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomePhrase {
    pub outcome: Outcome,
    pub period_word: Option<String>,
    /// Character span of the period word within the trimmed phrase.
    pub period_span: Option<(usize, usize)>,
}

impl OutcomePhrase {
    fn plain(outcome: Outcome) -> Self {
        OutcomePhrase {
            outcome,
            period_word: None,
            period_span: None,
        }
    }
}

/// Parse an outcome phrase (the part after `Then`/`And`). Total: anything
/// that matches no known pattern degrades to `Outcome::Unrecognized`.
///
/// Priority order: eligibility, fixed payment, schedule reference,
/// reduction.
pub fn parse_outcome(text: &str) -> Outcome {
    parse_outcome_phrase(text).outcome
}

/// As [`parse_outcome`], keeping hold of the period word of a fixed
/// payment so callers can flag unrecognized periods.
pub fn parse_outcome_phrase(text: &str) -> OutcomePhrase {
    let phrase = text.trim();
    let lower = ascii_lower(phrase);

    if let Some(variable) = match_eligibility(phrase, &lower) {
        return OutcomePhrase::plain(Outcome::Eligibility { variable });
    }

    if lower.starts_with("payment is ") {
        let prefix = "payment is ".len();
        let rest = &phrase[prefix..];
        return match parse_fixed_payment(rest) {
            Some((outcome, period_word, period_span)) => OutcomePhrase {
                outcome,
                period_word,
                period_span: period_span.map(|(s, e)| (s + prefix, e + prefix)),
            },
            None => OutcomePhrase::plain(Outcome::Unrecognized {
                raw: phrase.to_owned(),
            }),
        };
    }

    if let Some(i) = find_word(&lower, "rate is determined by") {
        let name = phrase[i + "rate is determined by".len()..].trim();
        if !name.is_empty() {
            return OutcomePhrase::plain(Outcome::ScheduleRef {
                schedule: name.to_owned(),
            });
        }
    }

    if let Some(out) = match_reduction(&lower) {
        return OutcomePhrase::plain(out);
    }

    OutcomePhrase::plain(Outcome::Unrecognized {
        raw: phrase.to_owned(),
    })
}

/// `X is eligible` / `X is true` / `X is yes` / `X = true`. The variable
/// is the slugged left-hand side.
fn match_eligibility(phrase: &str, lower: &str) -> Option<String> {
    for suffix in ["is eligible", "is true", "is yes"] {
        if lower.ends_with(suffix) {
            let cut = lower.len() - suffix.len();
            if lower[..cut].ends_with(' ') {
                let head = phrase[..cut].trim();
                if !head.is_empty() {
                    return Some(slug(head));
                }
            }
        }
    }
    if let Some(eq) = lower.find('=') {
        if !lower.contains("==") && lower[eq + 1..].trim() == "true" {
            let head = phrase[..eq].trim();
            if !head.is_empty() {
                return Some(slug(head));
            }
        }
    }
    None
}

/// `$AMOUNT [per PERIOD]`; the period defaults to fortnight. Also
/// returns the period word and its character span within `rest`.
fn parse_fixed_payment(rest: &str) -> Option<(Outcome, Option<String>, Option<(usize, usize)>)> {
    let toks = tokens_with_pos(rest);
    let (_, amount_tok) = *toks.first()?;
    let amount = parse_number(amount_tok)?;
    let (period, word, span) = match toks.get(1) {
        Some((_, per)) if per.eq_ignore_ascii_case("per") => match toks.get(2) {
            Some((pos, word)) => {
                let start = char_col(rest, *pos);
                (
                    Period::from_word(word).unwrap_or_default(),
                    Some((*word).to_owned()),
                    Some((start, start + word.chars().count())),
                )
            }
            None => (Period::Fortnight, None, None),
        },
        _ => (Period::Fortnight, None, None),
    };
    Some((Outcome::FixedPayment { amount, period }, word, span))
}

/// `[payment] reduces by N cents per dollar over $T`.
fn match_reduction(lower: &str) -> Option<Outcome> {
    let toks: Vec<&str> = lower.split_whitespace().collect();
    let i = toks
        .iter()
        .position(|t| *t == "reduces" || *t == "reduce")?;
    if toks.get(i + 1) != Some(&"by") {
        return None;
    }
    let cents_per_dollar = parse_number(toks.get(i + 2)?)?;
    let unit = toks.get(i + 3)?;
    if *unit != "cents" && *unit != "cent" {
        return None;
    }
    if toks.get(i + 4) != Some(&"per")
        || toks.get(i + 5) != Some(&"dollar")
        || toks.get(i + 6) != Some(&"over")
    {
        return None;
    }
    let threshold = parse_number(toks.get(i + 7)?)?;
    Some(Outcome::Reduction {
        cents_per_dollar,
        threshold,
    })
}

// ──────────────────────────────────────────────
// Schedule entries
// ──────────────────────────────────────────────

/// A recognized schedule entry line: `When CONDITION: $AMOUNT [per PERIOD]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntryPhrase {
    pub condition: String,
    pub amount: Decimal,
    pub period: Period,
    /// The period word as written, for validity checks.
    pub period_word: Option<String>,
    /// Character span of the period word, when present.
    pub period_span: Option<(usize, usize)>,
}

pub fn parse_schedule_entry(text: &str) -> Result<ScheduleEntryPhrase, PhraseError> {
    let phrase = text.trim();
    let total = phrase.chars().count();
    let lower = ascii_lower(phrase);
    let not_entry = || PhraseError::new(PhraseReason::NotScheduleEntry, 0, total);

    if !lower.starts_with("when ") {
        return Err(not_entry());
    }
    let colon = phrase.find(':').ok_or_else(not_entry)?;
    let condition = phrase["when ".len()..colon].trim();
    if condition.is_empty() {
        return Err(not_entry());
    }

    let rest = &phrase[colon + 1..];
    let toks = tokens_with_pos(rest);
    let (amount_pos, amount_tok) = *toks.first().ok_or_else(not_entry)?;
    let amount = parse_number(amount_tok).ok_or_else(|| {
        let start = char_col(phrase, colon + 1 + amount_pos);
        PhraseError::new(
            PhraseReason::BadAmount(amount_tok.to_owned()),
            start,
            start + amount_tok.chars().count(),
        )
    })?;

    let (period, period_word, period_span) = match toks.get(1) {
        Some((_, per)) if per.eq_ignore_ascii_case("per") => match toks.get(2) {
            Some((pos, word)) => {
                let start = char_col(phrase, colon + 1 + pos);
                (
                    Period::from_word(word).unwrap_or_default(),
                    Some((*word).to_owned()),
                    Some((start, start + word.chars().count())),
                )
            }
            None => (Period::Fortnight, None, None),
        },
        _ => (Period::Fortnight, None, None),
    };

    Ok(ScheduleEntryPhrase {
        condition: condition.to_owned(),
        amount,
        period,
        period_word,
        period_span,
    })
}
