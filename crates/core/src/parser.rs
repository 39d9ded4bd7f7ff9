//! Condition/outcome parser: segmenter output to the document model.
//!
//! Parsing is total and best-effort. Phrases the shared grammar rejects
//! become `Unrecognized` placeholder nodes; the diagnostics engine, not
//! the parser, reports them. Structural rules mirror the grammar the
//! diagnostics engine checks: group openers collect `- ` items until a
//! blank line or a new keyword, and the first `Then` is the single
//! transition from conditions to outcomes.

use std::collections::HashSet;

use crate::ast::{
    Block, ConditionNode, Definition, Document, GroupKind, Outcome, Scenario, Schedule,
    ScheduleEntry, Variable,
};
use crate::infer;
use crate::phrase::{self, Phrase};
use crate::segment::{self, BlockKind, LineKind, Segmented};

/// Parse raw text into a document.
pub fn parse_text(text: &str) -> Document {
    parse(&segment::segment(text))
}

/// Parse pre-segmented lines into a document.
pub fn parse(seg: &Segmented) -> Document {
    let mut builder = DocumentBuilder::default();

    for line in &seg.lines {
        match line.kind {
            LineKind::Header(kind) => {
                let name = line.header_name().unwrap_or("").to_owned();
                builder.open(kind, name, line.index);
            }
            LineKind::Blank => builder.blank_line(),
            LineKind::Comment => {}
            LineKind::Text => builder.text_line(line.context, &line.trimmed),
        }
    }

    builder.finish()
}

#[derive(Default)]
struct DocumentBuilder {
    blocks: Vec<Block>,
    current: Option<OpenBlock>,
}

enum OpenBlock {
    Scenario(ScenarioBuilder),
    Definition {
        term: String,
        line: usize,
        description: Vec<String>,
        closed: bool,
    },
    Schedule {
        name: String,
        line: usize,
        entries: Vec<ScheduleEntry>,
    },
}

impl DocumentBuilder {
    fn open(&mut self, kind: BlockKind, name: String, line: usize) {
        self.close_current();
        self.current = Some(match kind {
            BlockKind::Scenario => OpenBlock::Scenario(ScenarioBuilder::new(name, line)),
            BlockKind::Definition => OpenBlock::Definition {
                term: name,
                line,
                description: Vec::new(),
                closed: false,
            },
            BlockKind::Schedule => OpenBlock::Schedule {
                name,
                line,
                entries: Vec::new(),
            },
        });
    }

    fn close_current(&mut self) {
        match self.current.take() {
            None => {}
            Some(OpenBlock::Scenario(sb)) => self.blocks.push(Block::Scenario(sb.finish())),
            Some(OpenBlock::Definition {
                term,
                line,
                description,
                ..
            }) => self.blocks.push(Block::Definition(Definition {
                term,
                description: description.join(" "),
                line,
            })),
            Some(OpenBlock::Schedule {
                name,
                line,
                entries,
            }) => self.blocks.push(Block::Schedule(Schedule {
                name,
                line,
                entries,
            })),
        }
    }

    fn blank_line(&mut self) {
        match &mut self.current {
            Some(OpenBlock::Scenario(sb)) => sb.close_groups(),
            Some(OpenBlock::Definition { closed, .. }) => *closed = true,
            _ => {}
        }
    }

    fn text_line(&mut self, context: Option<BlockKind>, trimmed: &str) {
        match (&mut self.current, context) {
            (Some(OpenBlock::Scenario(sb)), Some(BlockKind::Scenario)) => {
                sb.line(trimmed);
            }
            (
                Some(OpenBlock::Definition {
                    description,
                    closed,
                    ..
                }),
                Some(BlockKind::Definition),
            ) => {
                if !*closed {
                    description.push(trimmed.to_owned());
                }
            }
            (Some(OpenBlock::Schedule { entries, .. }), Some(BlockKind::Schedule)) => {
                if trimmed.starts_with("Note:") {
                    return;
                }
                if let Ok(entry) = phrase::parse_schedule_entry(trimmed) {
                    entries.push(ScheduleEntry {
                        condition: entry_condition(&entry.condition),
                        condition_text: entry.condition,
                        amount: entry.amount,
                        period: entry.period,
                    });
                }
            }
            // Free text outside any block; diagnostics handle it.
            _ => {}
        }
    }

    fn finish(mut self) -> Document {
        self.close_current();
        let variables = collect_variables(&self.blocks);
        Document {
            blocks: self.blocks,
            variables,
        }
    }
}

struct ScenarioBuilder {
    name: String,
    line: usize,
    root: Vec<ConditionNode>,
    /// Open ANY/ALL/NONE groups awaiting `- ` items, innermost last.
    group_stack: Vec<(GroupKind, Vec<ConditionNode>)>,
    outcomes: Vec<Outcome>,
    in_outcomes: bool,
    has_eligibility: bool,
}

impl ScenarioBuilder {
    fn new(name: String, line: usize) -> Self {
        ScenarioBuilder {
            name,
            line,
            root: Vec::new(),
            group_stack: Vec::new(),
            outcomes: Vec::new(),
            in_outcomes: false,
            has_eligibility: false,
        }
    }

    fn line(&mut self, trimmed: &str) {
        if let Some(item) = trimmed.strip_prefix("- ") {
            self.list_item(item.trim());
            return;
        }
        match split_keyword(trimmed) {
            Some(("Then", rest)) => {
                self.close_groups();
                self.in_outcomes = true;
                self.push_outcome(rest);
            }
            Some(("And", rest)) if self.in_outcomes => self.push_outcome(rest),
            Some((keyword, rest)) => self.condition_line(keyword, rest),
            // Anything else in a scenario is a structural error the
            // diagnostics engine reports; the parser skips it.
            None => {}
        }
    }

    fn condition_line(&mut self, keyword: &str, rest: &str) {
        // A new keyword closes any open list group.
        self.close_groups();
        match phrase::parse_condition(rest) {
            Ok(Phrase::GroupOpen(kind)) => self.group_stack.push((kind, Vec::new())),
            Ok(Phrase::Condition(node)) => {
                if keyword == "Or" {
                    if let Some(previous) = self.root.pop() {
                        self.root.push(ConditionNode::Group {
                            kind: GroupKind::Any,
                            children: vec![previous, node],
                        });
                        return;
                    }
                }
                self.root.push(node);
            }
            Err(_) => self.root.push(ConditionNode::Unrecognized {
                raw: rest.to_owned(),
            }),
        }
    }

    fn list_item(&mut self, item: &str) {
        let node = match phrase::parse_condition(item) {
            Ok(Phrase::GroupOpen(kind)) => {
                self.group_stack.push((kind, Vec::new()));
                return;
            }
            Ok(Phrase::Condition(node)) => node,
            Err(_) => ConditionNode::Unrecognized {
                raw: item.to_owned(),
            },
        };
        match self.group_stack.last_mut() {
            Some((_, children)) => children.push(node),
            // Stray item without a group opener: diagnostics flag it; the
            // parser keeps the condition at the top level.
            None => self.root.push(node),
        }
    }

    fn push_outcome(&mut self, text: &str) {
        let outcome = phrase::parse_outcome(text);
        if let Outcome::Eligibility { .. } = outcome {
            // At most one eligibility outcome per scenario; first wins.
            if self.has_eligibility {
                self.outcomes.push(Outcome::Unrecognized {
                    raw: text.trim().to_owned(),
                });
                return;
            }
            self.has_eligibility = true;
        }
        self.outcomes.push(outcome);
    }

    fn close_groups(&mut self) {
        while let Some((kind, children)) = self.group_stack.pop() {
            let node = ConditionNode::Group { kind, children };
            match self.group_stack.last_mut() {
                Some((_, parent)) => parent.push(node),
                None => self.root.push(node),
            }
        }
    }

    fn finish(mut self) -> Scenario {
        self.close_groups();
        Scenario {
            name: self.name,
            line: self.line,
            conditions: self.root,
            outcomes: self.outcomes,
        }
    }
}

/// Split a leading `When`/`Given`/`And`/`Or`/`Then` keyword from the rest
/// of the line.
fn split_keyword(trimmed: &str) -> Option<(&str, &str)> {
    for keyword in ["When", "Given", "And", "Or", "Then"] {
        if let Some(rest) = trimmed.strip_prefix(keyword) {
            if rest.starts_with(char::is_whitespace) {
                return Some((keyword, rest.trim()));
            }
        }
    }
    None
}

/// Parse a schedule entry condition through the shared grammar, falling
/// back to an implicit flag on the slugged text (`couple combined` →
/// `couple_combined`).
fn entry_condition(text: &str) -> ConditionNode {
    match phrase::parse_condition(text) {
        Ok(Phrase::Condition(node)) => node,
        _ => {
            let name = phrase::slug(text);
            if !name.is_empty() && phrase::is_valid_identifier(&name) {
                ConditionNode::Flag { variable: name }
            } else {
                ConditionNode::Unrecognized {
                    raw: text.to_owned(),
                }
            }
        }
    }
}

/// Derive the variable declarations: every name referenced by scenario
/// conditions, plus the entry conditions of schedules some scenario
/// actually references. First occurrence wins; output sorted by name.
fn collect_variables(blocks: &[Block]) -> Vec<Variable> {
    let mut names: Vec<String> = Vec::new();

    let mut used_schedules: HashSet<&str> = HashSet::new();
    for block in blocks {
        if let Block::Scenario(s) = block {
            for cond in &s.conditions {
                cond.collect_variables(&mut names);
            }
            for outcome in &s.outcomes {
                if let Outcome::ScheduleRef { schedule } = outcome {
                    used_schedules.insert(schedule.as_str());
                }
            }
        }
    }
    for block in blocks {
        if let Block::Schedule(s) = block {
            if used_schedules.contains(s.name.as_str()) {
                for entry in &s.entries {
                    entry.condition.collect_variables(&mut names);
                }
            }
        }
    }

    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));

    let mut variables: Vec<Variable> = names
        .into_iter()
        .map(|name| {
            let (value_type, period) = infer::infer(&name);
            Variable {
                name,
                value_type,
                period,
            }
        })
        .collect();
    variables.sort_by(|a, b| a.name.cmp(&b.name));
    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Operand, Operator};
    use crate::infer::{DefinitionPeriod, ValueType};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const SAMPLE: &str = "\
Definition: assessable_income
  The total of employment income and deemed income from financial assets

Schedule: Age Pension Rates
  When single: $1,096.70 per fortnight
  When couple combined: $1,650.40 per fortnight
  Note: rates indexed twice yearly

Scenario: Age Pension
  When age >= 67
  And is_australian_resident == true
  And residence_years >= 10
  And any of these are true:
    - assessable_income < 204
    - asset_value < 301750
  Then age_pension_eligible = true
  And rate is determined by Age Pension Rates
  And payment reduces by 50 cents per dollar over $204
";

    fn scenario(doc: &Document, name: &str) -> Scenario {
        doc.scenarios().find(|s| s.name == name).unwrap().clone()
    }

    #[test]
    fn blocks_parse_in_source_order() {
        let doc = parse_text(SAMPLE);
        assert_eq!(doc.blocks.len(), 3);
        assert!(matches!(doc.blocks[0], Block::Definition(_)));
        assert!(matches!(doc.blocks[1], Block::Schedule(_)));
        assert!(matches!(doc.blocks[2], Block::Scenario(_)));
    }

    #[test]
    fn definition_collects_description() {
        let doc = parse_text(SAMPLE);
        match &doc.blocks[0] {
            Block::Definition(d) => {
                assert_eq!(d.term, "assessable_income");
                assert!(d.description.starts_with("The total of employment income"));
            }
            other => panic!("expected definition, got {:?}", other),
        }
    }

    #[test]
    fn schedule_entries_parse_with_fallback_flags() {
        let doc = parse_text(SAMPLE);
        let schedule = doc.schedule("Age Pension Rates").unwrap();
        assert_eq!(schedule.entries.len(), 2);
        assert_eq!(
            schedule.entries[0].condition,
            ConditionNode::Flag {
                variable: "single".into()
            }
        );
        assert_eq!(
            schedule.entries[1].condition,
            ConditionNode::Flag {
                variable: "couple_combined".into()
            }
        );
        assert_eq!(
            schedule.entries[1].amount,
            Decimal::from_str("1650.40").unwrap()
        );
    }

    #[test]
    fn group_collects_list_items() {
        let doc = parse_text(SAMPLE);
        let s = scenario(&doc, "Age Pension");
        assert_eq!(s.conditions.len(), 4);
        match &s.conditions[3] {
            ConditionNode::Group { kind, children } => {
                assert_eq!(*kind, GroupKind::Any);
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn outcomes_follow_single_then_transition() {
        let doc = parse_text(SAMPLE);
        let s = scenario(&doc, "Age Pension");
        assert_eq!(s.outcomes.len(), 3);
        assert!(matches!(s.outcomes[0], Outcome::Eligibility { .. }));
        assert!(matches!(s.outcomes[1], Outcome::ScheduleRef { .. }));
        assert!(matches!(s.outcomes[2], Outcome::Reduction { .. }));
    }

    #[test]
    fn or_merges_into_an_any_group() {
        let doc = parse_text(
            "Scenario: S\nWhen is_student == true\nOr is_apprentice == true\nThen x is eligible\n",
        );
        let s = scenario(&doc, "S");
        assert_eq!(s.conditions.len(), 1);
        match &s.conditions[0] {
            ConditionNode::Group { kind, children } => {
                assert_eq!(*kind, GroupKind::Any);
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected any-group, got {:?}", other),
        }
    }

    #[test]
    fn blank_line_closes_open_group() {
        let doc = parse_text(
            "Scenario: S\nWhen any of these are true:\n  - studying\n\n  - is_apprentice\nThen x is eligible\n",
        );
        let s = scenario(&doc, "S");
        // the group closed at the blank line; the second item lands at root
        assert_eq!(s.conditions.len(), 2);
        assert!(matches!(&s.conditions[0], ConditionNode::Group { .. }));
        assert!(matches!(&s.conditions[1], ConditionNode::Flag { .. }));
    }

    #[test]
    fn second_eligibility_outcome_degrades() {
        let doc = parse_text(
            "Scenario: S\nWhen age >= 18\nThen a is eligible\nAnd b is eligible\n",
        );
        let s = scenario(&doc, "S");
        assert_eq!(
            s.outcomes[0],
            Outcome::Eligibility {
                variable: "a".into()
            }
        );
        assert!(matches!(s.outcomes[1], Outcome::Unrecognized { .. }));
    }

    #[test]
    fn unparseable_condition_becomes_placeholder() {
        let doc = parse_text("Scenario: S\nWhen the moon is full tonight ok\nThen x is eligible\n");
        let s = scenario(&doc, "S");
        assert!(matches!(
            &s.conditions[0],
            ConditionNode::Unrecognized { .. }
        ));
    }

    #[test]
    fn variables_deduped_inferred_and_sorted() {
        let doc = parse_text(SAMPLE);
        let names: Vec<&str> = doc.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "age",
                "assessable_income",
                "asset_value",
                "couple_combined",
                "is_australian_resident",
                "residence_years",
                "single",
            ]
        );
        let years = doc
            .variables
            .iter()
            .find(|v| v.name == "residence_years")
            .unwrap();
        assert_eq!(years.value_type, ValueType::Int);
        assert_eq!(years.period, DefinitionPeriod::Year);
    }

    #[test]
    fn comparison_survives_round_trip() {
        let doc = parse_text("Scenario: S\nWhen parental_income < 60000\nThen x is eligible\n");
        let s = scenario(&doc, "S");
        assert_eq!(
            s.conditions[0],
            ConditionNode::Comparison {
                variable: "parental_income".into(),
                op: Operator::Lt,
                operand: Operand::Number(Decimal::from_str("60000").unwrap()),
            }
        );
    }
}
