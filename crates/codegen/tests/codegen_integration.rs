//! Integration tests for the full text-to-Python compile pipeline.

use courgette_codegen::{compile, compile_with, Options};

const AGE_PENSION: &str = "\
Schedule: Age Pension Rates
  When single: $1,096.70 per fortnight
  When couple combined: $1,650.40 per fortnight

Scenario: Age Pension
  When age >= 67
  And is_australian_resident == true
  And residence_years >= 10
  Then age_pension_eligible = true
  And rate is determined by Age Pension Rates
  And payment reduces by 50 cents per dollar over $204
";

#[test]
fn compile_is_pure_and_byte_stable() {
    let first = compile(AGE_PENSION).expect("compile");
    let second = compile(AGE_PENSION).expect("compile");
    assert_eq!(first, second);
}

#[test]
fn output_sections_appear_in_contract_order() {
    let code = compile(AGE_PENSION).expect("compile");
    let variables = code.find("# Base variables").expect("variables section");
    let schedule = code
        .find("# Schedule: Age Pension Rates")
        .expect("schedule section");
    let eligibility = code
        .find("class age_pension_eligible(Variable):")
        .expect("eligibility class");
    let payment = code
        .find("class age_pension_payment(Variable):")
        .expect("payment class");
    assert!(variables < schedule);
    assert!(schedule < eligibility);
    assert!(eligibility < payment);
}

#[test]
fn schedule_constants_key_by_schedule_and_condition_slug() {
    let code = compile(AGE_PENSION).expect("compile");
    assert!(code.contains("age_pension_rates_single = 1096.7"));
    assert!(code.contains("age_pension_rates_couple_combined = 1650.4"));
}

#[test]
fn eligibility_formula_fetches_each_variable_once() {
    let code = compile(AGE_PENSION).expect("compile");
    let fetch = "age = person('age', period)";
    assert_eq!(code.matches(fetch).count(), 1);
    assert!(code.contains("(age >= 67) and (is_australian_resident == True) and (residence_years >= 10)"));
}

#[test]
fn between_generates_an_inclusive_range() {
    let code = compile(
        "Scenario: Youth Allowance\n  When age between 16 and 24\n  Then youth_allowance_eligible = true\n",
    )
    .expect("compile");
    assert!(code.contains("return (16 <= age <= 24)"));
}

#[test]
fn schedule_dispatch_takes_first_matching_entry() {
    let code = compile(AGE_PENSION).expect("compile");
    let dispatch = code
        .find("if (single == True):")
        .expect("first dispatch branch");
    let second = code
        .find("elif (couple_combined == True):")
        .expect("second dispatch branch");
    assert!(dispatch < second);
    assert!(code.contains("amount = age_pension_rates_single"));
    assert!(code.contains("else:\n            amount = 0"));
}

#[test]
fn reduction_applies_after_base_with_zero_floor() {
    let code = compile(
        "Scenario: Jobseeker\n  When age >= 22\n  Then jobseeker_eligible = true\n  And payment is $1000 per fortnight\n  And payment reduces by 50 cents per dollar over $200\n",
    )
    .expect("compile");
    // income=400: max(0, 1000 - (400 - 200) * 0.5) = 900
    assert!(code.contains("amount = 1000"));
    assert!(code.contains("amount = max(0, amount - (income - 200) * 0.5)"));
}

#[test]
fn income_reference_is_configurable() {
    let options = Options {
        income_variable: "assessable_income".to_owned(),
    };
    let code = compile_with(
        "Scenario: Jobseeker\n  When age >= 22\n  Then jobseeker_eligible = true\n  And payment is $1000 per fortnight\n  And payment reduces by 50 cents per dollar over $200\n",
        &options,
    )
    .expect("compile");
    assert!(code.contains("assessable_income = person('assessable_income', period)"));
    assert!(code.contains("amount = max(0, amount - (assessable_income - 200) * 0.5)"));
}

#[test]
fn unknown_schedule_degrades_to_zero_base() {
    let code = compile(
        "Scenario: S\n  When age >= 18\n  Then s_eligible = true\n  And rate is determined by Missing Schedule\n",
    )
    .expect("compile");
    assert!(code.contains("if not eligible:\n            return 0"));
    assert!(code.contains("amount = 0"));
}

#[test]
fn scenario_without_payment_outcomes_has_no_payment_class() {
    let code = compile("Scenario: S\n  When age >= 18\n  Then s_eligible = true\n").expect("compile");
    assert!(code.contains("class s_eligible(Variable):"));
    assert!(!code.contains("class s_payment(Variable):"));
}

#[test]
fn variable_declarations_carry_inferred_type_and_period() {
    let code = compile(AGE_PENSION).expect("compile");
    assert!(code.contains(
        "class residence_years(Variable):\n    value_type = int\n    entity = Person\n    definition_period = YEAR"
    ));
    assert!(code.contains(
        "class is_australian_resident(Variable):\n    value_type = bool\n    entity = Person\n    definition_period = DAY"
    ));
}
