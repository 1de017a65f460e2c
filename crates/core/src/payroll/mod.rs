pub mod deductions;
pub mod tax;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub use deductions::{ContributionBasis, DeductionLine, DeductionRule, DeductionSchedule};
pub use tax::{compute_withholding_tax, withholding_brackets, TaxBracket};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollBreakdown {
    pub gross_pay: Decimal,
    pub deductions: Vec<DeductionLine>,
    pub total_deductions: Decimal,
    pub taxable_income: Decimal,
    pub withholding_tax: Decimal,
    pub net_pay: Decimal,
    pub trace: Vec<PayrollTraceStep>,
}

impl PayrollBreakdown {
    pub fn employer_contributions(&self) -> Decimal {
        self.deductions.iter().map(|line| line.employer_share).sum()
    }
}

/// Gross → statutory contributions → withholding tax → net pay.
pub fn compute_payroll(
    gross_pay: Decimal,
    schedule: &DeductionSchedule,
) -> Result<PayrollBreakdown, DomainError> {
    if gross_pay.is_sign_negative() {
        return Err(DomainError::Validation(format!(
            "gross pay must not be negative (got {gross_pay})"
        )));
    }

    let deductions = schedule.compute(gross_pay);
    let total_deductions: Decimal = deductions.iter().map(|line| line.employee_share).sum();
    let taxable_income = (gross_pay - total_deductions).max(Decimal::ZERO);
    let withholding_tax = compute_withholding_tax(taxable_income);
    let net_pay = taxable_income - withholding_tax;

    let mut trace = vec![PayrollTraceStep {
        stage: "gross".to_string(),
        detail: "monthly gross pay".to_string(),
        amount: gross_pay,
    }];
    trace.extend(deductions.iter().map(|line| PayrollTraceStep {
        stage: "contribution".to_string(),
        detail: format!("{} employee share", line.code),
        amount: line.employee_share,
    }));
    trace.push(PayrollTraceStep {
        stage: "taxable_income".to_string(),
        detail: "gross - employee contributions".to_string(),
        amount: taxable_income,
    });
    trace.push(PayrollTraceStep {
        stage: "withholding_tax".to_string(),
        detail: "monthly withholding table".to_string(),
        amount: withholding_tax,
    });
    trace.push(PayrollTraceStep {
        stage: "net_pay".to_string(),
        detail: "taxable_income - withholding_tax".to_string(),
        amount: net_pay,
    });

    Ok(PayrollBreakdown {
        gross_pay,
        deductions,
        total_deductions,
        taxable_income,
        withholding_tax,
        net_pay,
        trace,
    })
}
