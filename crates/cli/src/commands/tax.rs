use erpflow_core::payroll::{compute_payroll, DeductionSchedule};
use rust_decimal::Decimal;

use crate::commands::CommandResult;

/// Prints the full payroll breakdown for one monthly gross amount using the
/// standard contribution schedule. Needs no database.
pub fn run(gross_pay: Decimal) -> CommandResult {
    match compute_payroll(gross_pay, &DeductionSchedule::standard()) {
        Ok(breakdown) => CommandResult::success_with_data(
            "tax",
            format!(
                "withholding tax {} on taxable income {}",
                breakdown.withholding_tax, breakdown.taxable_income
            ),
            &breakdown,
        ),
        Err(error) => CommandResult::failure("tax", "validation", error.to_string(), 2),
    }
}
