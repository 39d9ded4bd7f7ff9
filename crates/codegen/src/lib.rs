//! courgette-codegen: OpenFisca-style Python emission from the document
//! model.
//!
//! Output is a pure function of the document: a fixed header, variable
//! declarations sorted by name, schedule-derived rate constants, then one
//! eligibility formula per scenario plus a payment formula when the
//! scenario has payment-affecting outcomes. Compiling the same text twice
//! yields byte-identical output; the header carries no timestamp.
//!
//! Unrecognized condition placeholders are dropped from formulas rather
//! than aborting generation; the diagnostics engine, not this crate,
//! reports them.

use courgette_core::{
    parse, segment, CompileError, ConditionNode, Document, GroupKind, LineKind, Operand, Outcome,
    Scenario, Schedule, Variable, COURGETTE_VERSION,
};
use rust_decimal::Decimal;

/// Generation options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Variable used as the deduction base of income-tested reductions.
    pub income_variable: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            income_variable: "income".to_owned(),
        }
    }
}

/// Compile Courgette source text with default options.
pub fn compile(text: &str) -> Result<String, CompileError> {
    compile_with(text, &Options::default())
}

/// Compile Courgette source text into OpenFisca-style Python.
///
/// Total except for one terminal case: the text has non-blank,
/// non-comment content but no recognizable block header at all.
pub fn compile_with(text: &str, options: &Options) -> Result<String, CompileError> {
    let seg = segment(text);
    let doc = parse(&seg);
    if doc.blocks.is_empty() {
        let has_content = seg.lines.iter().any(|l| matches!(l.kind, LineKind::Text));
        if has_content {
            return Err(CompileError::NoBlocks);
        }
    }
    Ok(generate(&doc, options))
}

/// Emit the full target module for a parsed document.
pub fn generate(doc: &Document, options: &Options) -> String {
    let mut out = String::new();
    push_header(&mut out);
    push_variables(&mut out, &doc.variables);
    for schedule in doc.schedules() {
        push_schedule_constants(&mut out, schedule);
    }
    for scenario in doc.scenarios() {
        push_scenario(&mut out, scenario, doc, options);
    }
    out
}

fn push_header(out: &mut String) {
    out.push_str(&format!(
        "\"\"\"\nGenerated by Courgette {COURGETTE_VERSION} from plain-language benefit rules.\n\n\
         This module declares the variables the rules reference and one\n\
         eligibility/payment formula pair per scenario.\n\"\"\"\n\n\
         from openfisca_core.model_api import *\n\
         from openfisca_core.periods import DAY, MONTH, YEAR, ETERNITY\n"
    ));
}

fn push_variables(out: &mut String, variables: &[Variable]) {
    if variables.is_empty() {
        return;
    }
    out.push_str("\n\n# Base variables\n");
    for var in variables {
        out.push_str(&format!(
            "\nclass {name}(Variable):\n    value_type = {vt}\n    entity = Person\n    definition_period = {period}\n    label = \"{label}\"\n",
            name = var.name,
            vt = var.value_type.keyword(),
            period = var.period.keyword(),
            label = humanize(&var.name),
        ));
    }
}

/// One module-level constant per schedule entry, keyed
/// `{schedule_slug}_{condition_slug}`.
fn push_schedule_constants(out: &mut String, schedule: &Schedule) {
    out.push_str(&format!("\n\n# Schedule: {}\n", schedule.name));
    let schedule_slug = courgette_core::phrase::slug(&schedule.name);
    for entry in &schedule.entries {
        let condition_slug = courgette_core::phrase::slug(&entry.condition_text);
        out.push_str(&format!(
            "{}_{} = {}\n",
            schedule_slug,
            condition_slug,
            number(&entry.amount)
        ));
    }
}

fn push_scenario(out: &mut String, scenario: &Scenario, doc: &Document, options: &Options) {
    let slug = courgette_core::phrase::slug(&scenario.name);
    push_eligibility_class(out, scenario, &slug);
    if scenario.outcomes.iter().any(Outcome::affects_payment) {
        push_payment_class(out, scenario, &slug, doc, options);
    }
}

fn push_eligibility_class(out: &mut String, scenario: &Scenario, slug: &str) {
    out.push_str(&format!(
        "\n\nclass {slug}_eligible(Variable):\n    value_type = bool\n    entity = Person\n    definition_period = MONTH\n    label = \"{name} eligibility\"\n",
        name = scenario.name,
    ));
    push_documentation(out, scenario);
    out.push_str("\n    def formula(person, period):\n");
    for var in scenario.condition_variables() {
        out.push_str(&format!("        {var} = person('{var}', period)\n"));
    }
    let exprs: Vec<String> = scenario
        .conditions
        .iter()
        .filter_map(condition_expr)
        .collect();
    let combined = if exprs.is_empty() {
        "True".to_owned()
    } else {
        exprs.join(" and ")
    };
    out.push_str(&format!("        return {combined}\n"));
}

fn push_payment_class(
    out: &mut String,
    scenario: &Scenario,
    slug: &str,
    doc: &Document,
    options: &Options,
) {
    out.push_str(&format!(
        "\n\nclass {slug}_payment(Variable):\n    value_type = float\n    entity = Person\n    definition_period = MONTH\n    label = \"{name} payment amount\"\n\n    def formula(person, period):\n        eligible = person('{slug}_eligible', period)\n        if not eligible:\n            return 0\n",
        name = scenario.name,
    ));

    // Variables the payment path reads, beyond eligibility itself.
    let mut fetched: Vec<String> = Vec::new();
    let base = scenario.outcomes.iter().find(|o| {
        matches!(
            o,
            Outcome::FixedPayment { .. } | Outcome::ScheduleRef { .. }
        )
    });
    if let Some(Outcome::ScheduleRef { schedule }) = base {
        if let Some(schedule) = doc.schedule(schedule) {
            for entry in &schedule.entries {
                entry.condition.collect_variables(&mut fetched);
            }
        }
    }
    let has_reduction = scenario
        .outcomes
        .iter()
        .any(|o| matches!(o, Outcome::Reduction { .. }));
    if has_reduction {
        fetched.push(options.income_variable.clone());
    }
    let mut seen = std::collections::HashSet::new();
    fetched.retain(|name| seen.insert(name.clone()));
    for var in &fetched {
        out.push_str(&format!("        {var} = person('{var}', period)\n"));
    }

    match base {
        Some(Outcome::FixedPayment { amount, .. }) => {
            out.push_str(&format!("        amount = {}\n", number(amount)));
        }
        Some(Outcome::ScheduleRef { schedule: name }) => {
            push_schedule_dispatch(out, doc.schedule(name), name);
        }
        _ => out.push_str("        amount = 0\n"),
    }

    for outcome in &scenario.outcomes {
        if let Outcome::Reduction {
            cents_per_dollar,
            threshold,
        } = outcome
        {
            let rate = *cents_per_dollar / Decimal::from(100);
            out.push_str(&format!(
                "        amount = max(0, amount - ({income} - {threshold}) * {rate})\n",
                income = options.income_variable,
                threshold = number(threshold),
                rate = number(&rate),
            ));
        }
    }
    out.push_str("        return amount\n");
}

/// First-match dispatch over a schedule's entries. An unknown schedule
/// name (the diagnostics engine flags it) degrades to a zero base.
fn push_schedule_dispatch(out: &mut String, schedule: Option<&Schedule>, name: &str) {
    let Some(schedule) = schedule else {
        out.push_str("        amount = 0\n");
        return;
    };
    let schedule_slug = courgette_core::phrase::slug(name);
    let mut keyword = "if";
    for entry in &schedule.entries {
        let Some(expr) = condition_expr(&entry.condition) else {
            continue;
        };
        let condition_slug = courgette_core::phrase::slug(&entry.condition_text);
        out.push_str(&format!(
            "        {keyword} {expr}:\n            amount = {schedule_slug}_{condition_slug}\n"
        ));
        keyword = "elif";
    }
    if keyword == "if" {
        out.push_str("        amount = 0\n");
    } else {
        out.push_str("        else:\n            amount = 0\n");
    }
}

/// Restate the scenario's conditions and outcomes in a documentation
/// string, the way analysts read them.
fn push_documentation(out: &mut String, scenario: &Scenario) {
    out.push_str("    documentation = \"\"\"\n    Conditions:\n");
    for cond in &scenario.conditions {
        describe_condition(out, cond, 4);
    }
    out.push_str("    Outcomes:\n");
    for outcome in &scenario.outcomes {
        out.push_str(&format!("      - {}\n", describe_outcome(outcome)));
    }
    out.push_str("    \"\"\"\n");
}

fn describe_condition(out: &mut String, node: &ConditionNode, indent: usize) {
    let pad = " ".repeat(indent);
    match node {
        ConditionNode::Comparison {
            variable,
            op,
            operand,
        } => out.push_str(&format!(
            "{pad}- {variable} {} {}\n",
            op.symbol(),
            operand_expr(operand)
        )),
        ConditionNode::Range {
            variable,
            low,
            high,
        } => out.push_str(&format!(
            "{pad}- {variable} between {} and {}\n",
            number(low),
            number(high)
        )),
        ConditionNode::Flag { variable } => out.push_str(&format!("{pad}- {variable}\n")),
        ConditionNode::Group { kind, children } => {
            let label = match kind {
                GroupKind::Any => "any of",
                GroupKind::All => "all of",
                GroupKind::NoneOf => "none of",
            };
            out.push_str(&format!("{pad}- {label}:\n"));
            for child in children {
                describe_condition(out, child, indent + 2);
            }
        }
        ConditionNode::Unrecognized { raw } => {
            out.push_str(&format!("{pad}- (unrecognized) {raw}\n"))
        }
    }
}

fn describe_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Eligibility { variable } => format!("{variable} is eligible"),
        Outcome::FixedPayment { amount, period } => {
            format!("payment is ${} per {}", number(amount), period.word())
        }
        Outcome::ScheduleRef { schedule } => format!("rate is determined by {schedule}"),
        Outcome::Reduction {
            cents_per_dollar,
            threshold,
        } => format!(
            "payment reduces by {} cents per dollar over ${}",
            number(cents_per_dollar),
            number(threshold)
        ),
        Outcome::Unrecognized { raw } => format!("(unrecognized) {raw}"),
    }
}

/// Render a condition as a Python boolean expression. `Unrecognized`
/// placeholders render as nothing and drop out of their enclosing
/// conjunction.
fn condition_expr(node: &ConditionNode) -> Option<String> {
    match node {
        ConditionNode::Comparison {
            variable,
            op,
            operand,
        } => Some(format!(
            "({variable} {} {})",
            op.symbol(),
            operand_expr(operand)
        )),
        ConditionNode::Range {
            variable,
            low,
            high,
        } => Some(format!(
            "({} <= {variable} <= {})",
            number(low),
            number(high)
        )),
        ConditionNode::Flag { variable } => Some(format!("({variable} == True)")),
        ConditionNode::Group { kind, children } => {
            let parts: Vec<String> = children.iter().filter_map(condition_expr).collect();
            if parts.is_empty() {
                return None;
            }
            Some(match kind {
                GroupKind::Any => format!("({})", parts.join(" or ")),
                GroupKind::All => format!("({})", parts.join(" and ")),
                GroupKind::NoneOf => format!("not ({})", parts.join(" or ")),
            })
        }
        ConditionNode::Unrecognized { .. } => None,
    }
}

fn operand_expr(operand: &Operand) -> String {
    match operand {
        Operand::Number(value) => number(value),
        Operand::Str(value) => format!("'{value}'"),
        Operand::Bool(true) => "True".to_owned(),
        Operand::Bool(false) => "False".to_owned(),
        Operand::Ident(name) => name.clone(),
    }
}

/// Decimal rendering with trailing zeros stripped (`1650.40` → `1650.4`).
fn number(value: &Decimal) -> String {
    value.normalize().to_string()
}

/// `residence_years` → `Residence Years`.
fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
