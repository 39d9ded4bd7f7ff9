//! Shared document model for the Courgette toolchain.
//!
//! These types are produced by the parser and consumed by code generation
//! and tests. They live here so downstream crates can import them without
//! depending on parser internals.

use rust_decimal::Decimal;

use crate::infer::{DefinitionPeriod, ValueType};

// ──────────────────────────────────────────────
// Condition model
// ──────────────────────────────────────────────

/// Comparison operator after phrase normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }
}

/// Right-hand side of a comparison after literal normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(Decimal),
    Str(String),
    Bool(bool),
    /// Reference to another variable.
    Ident(String),
}

/// Boolean reduction applied to a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Any,
    All,
    NoneOf,
}

/// A parsed condition. `Unrecognized` is a no-op placeholder: compilation
/// continues past it and the diagnostics engine reports it separately.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Comparison {
        variable: String,
        op: Operator,
        operand: Operand,
    },
    /// Canonical form of `between A and B` -- inclusive at both ends.
    Range {
        variable: String,
        low: Decimal,
        high: Decimal,
    },
    Group {
        kind: GroupKind,
        children: Vec<ConditionNode>,
    },
    /// Bare identifier with implicit truthiness.
    Flag {
        variable: String,
    },
    Unrecognized {
        raw: String,
    },
}

impl ConditionNode {
    /// Collect every variable name referenced by this condition, in
    /// left-to-right order, including identifier operands.
    pub fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            ConditionNode::Comparison {
                variable, operand, ..
            } => {
                out.push(variable.clone());
                if let Operand::Ident(name) = operand {
                    out.push(name.clone());
                }
            }
            ConditionNode::Range { variable, .. } => out.push(variable.clone()),
            ConditionNode::Group { children, .. } => {
                for child in children {
                    child.collect_variables(out);
                }
            }
            ConditionNode::Flag { variable } => out.push(variable.clone()),
            ConditionNode::Unrecognized { .. } => {}
        }
    }
}

// ──────────────────────────────────────────────
// Outcome model
// ──────────────────────────────────────────────

/// Payment cadence for fixed payments and schedule entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Fortnight,
    Week,
    Month,
    Year,
}

impl Period {
    pub const WORDS: [&'static str; 4] = ["fortnight", "week", "month", "year"];

    pub fn from_word(word: &str) -> Option<Period> {
        match word.to_ascii_lowercase().as_str() {
            "fortnight" => Some(Period::Fortnight),
            "week" => Some(Period::Week),
            "month" => Some(Period::Month),
            "year" => Some(Period::Year),
            _ => None,
        }
    }

    pub fn word(&self) -> &'static str {
        match self {
            Period::Fortnight => "fortnight",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

/// A declared consequence of a scenario's conditions holding.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Eligibility {
        variable: String,
    },
    FixedPayment {
        amount: Decimal,
        period: Period,
    },
    ScheduleRef {
        schedule: String,
    },
    /// Income-tested taper: `amount -= (income - threshold) * cents/100`,
    /// floored at zero. Reductions compose in declaration order.
    Reduction {
        cents_per_dollar: Decimal,
        threshold: Decimal,
    },
    Unrecognized {
        raw: String,
    },
}

impl Outcome {
    /// Whether this outcome affects the computed payment amount.
    pub fn affects_payment(&self) -> bool {
        matches!(
            self,
            Outcome::FixedPayment { .. } | Outcome::ScheduleRef { .. } | Outcome::Reduction { .. }
        )
    }
}

// ──────────────────────────────────────────────
// Blocks and the document
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    /// Zero-based line of the `Scenario:` header.
    pub line: usize,
    pub conditions: Vec<ConditionNode>,
    pub outcomes: Vec<Outcome>,
}

impl Scenario {
    /// Distinct variables referenced by this scenario's conditions, in
    /// first-seen order.
    pub fn condition_variables(&self) -> Vec<String> {
        let mut all = Vec::new();
        for cond in &self.conditions {
            cond.collect_variables(&mut all);
        }
        let mut seen = std::collections::HashSet::new();
        all.retain(|name| seen.insert(name.clone()));
        all
    }
}

/// Documentation-only term; not consumed by code generation.
#[derive(Debug, Clone)]
pub struct Definition {
    pub term: String,
    pub description: String,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    /// The condition text as written, e.g. `single`.
    pub condition_text: String,
    /// The condition parsed through the shared phrase grammar.
    pub condition: ConditionNode,
    pub amount: Decimal,
    pub period: Period,
}

#[derive(Debug, Clone)]
pub struct Schedule {
    pub name: String,
    pub line: usize,
    pub entries: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone)]
pub enum Block {
    Scenario(Scenario),
    Definition(Definition),
    Schedule(Schedule),
}

/// An inferred variable declaration, derived once per distinct name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value_type: ValueType,
    pub period: DefinitionPeriod,
}

/// A fully parsed Courgette document. Derived fresh from a full-document
/// scan on every compile; no state survives between invocations.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Blocks in source order.
    pub blocks: Vec<Block>,
    /// Inferred variables, sorted by name.
    pub variables: Vec<Variable>,
}

impl Document {
    pub fn scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Scenario(s) => Some(s),
            _ => None,
        })
    }

    pub fn schedules(&self) -> impl Iterator<Item = &Schedule> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Schedule(s) => Some(s),
            _ => None,
        })
    }

    pub fn schedule(&self, name: &str) -> Option<&Schedule> {
        self.schedules().find(|s| s.name == name)
    }
}
