//! Variable inference: name-pattern heuristics assigning each free
//! variable a value type and a definition period.
//!
//! Rules are ordered and first-match-wins; they look only at the name,
//! never at usage context. That keeps compilation total and
//! side-effect-free at a known cost in precision.

/// Value type of an inferred variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Str,
}

impl ValueType {
    /// The target-language type keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "str",
        }
    }
}

/// Cadence at which a variable's value is reassessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionPeriod {
    Day,
    Month,
    Year,
    Eternity,
}

impl DefinitionPeriod {
    pub fn keyword(&self) -> &'static str {
        match self {
            DefinitionPeriod::Day => "DAY",
            DefinitionPeriod::Month => "MONTH",
            DefinitionPeriod::Year => "YEAR",
            DefinitionPeriod::Eternity => "ETERNITY",
        }
    }
}

/// Infer `(value type, definition period)` from a variable name.
///
/// Deterministic: the same name always yields the same result.
pub fn infer(name: &str) -> (ValueType, DefinitionPeriod) {
    let lower = name.to_ascii_lowercase();

    if lower.contains("age") {
        return (ValueType::Int, DefinitionPeriod::Day);
    }
    if lower.starts_with("is_")
        || lower.starts_with("has_")
        || lower.contains("eligible")
        || lower == "studying"
    {
        return (ValueType::Bool, DefinitionPeriod::Day);
    }
    if lower.contains("resident") || lower.contains("citizen") {
        return (ValueType::Bool, DefinitionPeriod::Eternity);
    }
    if lower.contains("years") {
        return (ValueType::Int, DefinitionPeriod::Year);
    }
    if lower.contains("status") || lower.contains("type") || lower.contains("category") {
        return (ValueType::Str, DefinitionPeriod::Month);
    }
    if ["income", "payment", "amount", "rate", "asset", "value"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return (ValueType::Float, DefinitionPeriod::Day);
    }

    (ValueType::Float, DefinitionPeriod::Month)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_rule_precedes_years_rule() {
        assert_eq!(infer("age"), (ValueType::Int, DefinitionPeriod::Day));
        // "age" matches before "years" would
        assert_eq!(infer("age_in_years"), (ValueType::Int, DefinitionPeriod::Day));
    }

    #[test]
    fn boolean_prefixes() {
        assert_eq!(infer("is_student"), (ValueType::Bool, DefinitionPeriod::Day));
        assert_eq!(infer("has_partner"), (ValueType::Bool, DefinitionPeriod::Day));
        assert_eq!(infer("studying"), (ValueType::Bool, DefinitionPeriod::Day));
    }

    #[test]
    fn residency_is_eternal() {
        assert_eq!(
            infer("is_australian_resident"),
            // is_ prefix wins: first match in rule order
            (ValueType::Bool, DefinitionPeriod::Day)
        );
        assert_eq!(
            infer("australian_resident"),
            (ValueType::Bool, DefinitionPeriod::Eternity)
        );
        assert_eq!(infer("citizenship"), (ValueType::Bool, DefinitionPeriod::Eternity));
    }

    #[test]
    fn years_are_yearly_ints() {
        assert_eq!(
            infer("residence_years"),
            (ValueType::Int, DefinitionPeriod::Year)
        );
    }

    #[test]
    fn status_like_names_are_strings() {
        assert_eq!(
            infer("employment_status"),
            (ValueType::Str, DefinitionPeriod::Month)
        );
        assert_eq!(
            infer("benefit_category"),
            (ValueType::Str, DefinitionPeriod::Month)
        );
    }

    #[test]
    fn money_like_names_are_daily_floats() {
        assert_eq!(
            infer("assessable_income"),
            (ValueType::Float, DefinitionPeriod::Day)
        );
        assert_eq!(
            infer("asset_value"),
            (ValueType::Float, DefinitionPeriod::Day)
        );
    }

    #[test]
    fn default_is_monthly_float() {
        assert_eq!(infer("dependants"), (ValueType::Float, DefinitionPeriod::Month));
    }
}
