use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::domain::lifecycle::Lifecycle;
use crate::errors::DomainError;
use crate::payroll::{DeductionLine, PayrollBreakdown};
use crate::workflow::states::WorkflowState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayrollId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayrollStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Processed,
}

impl WorkflowState for PayrollStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Processed => "Processed",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Draft" => Some(Self::Draft),
            "Submitted" => Some(Self::Submitted),
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            "Processed" => Some(Self::Processed),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Processed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PayPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::Validation(format!(
                "pay period end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub id: PayrollId,
    pub employee_id: EmployeeId,
    pub period: PayPeriod,
    pub gross_pay: Decimal,
    pub total_deductions: Decimal,
    pub taxable_income: Decimal,
    pub withholding_tax: Decimal,
    pub net_pay: Decimal,
    pub deductions: Vec<DeductionLine>,
    pub status: PayrollStatus,
    pub approver_id: Option<String>,
    pub processed_by: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub version: i64,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayrollRecord {
    pub fn draft(
        id: PayrollId,
        employee_id: EmployeeId,
        period: PayPeriod,
        breakdown: PayrollBreakdown,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            employee_id,
            period,
            gross_pay: breakdown.gross_pay,
            total_deductions: breakdown.total_deductions,
            taxable_income: breakdown.taxable_income,
            withholding_tax: breakdown.withholding_tax,
            net_pay: breakdown.net_pay,
            deductions: breakdown.deductions,
            status: PayrollStatus::Draft,
            approver_id: None,
            processed_by: None,
            submitted_at: None,
            approved_at: None,
            rejected_at: None,
            processed_at: None,
            remarks: None,
            version: 1,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the period and computed figures of a draft.
    pub fn revise(
        &mut self,
        period: PayPeriod,
        breakdown: PayrollBreakdown,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != PayrollStatus::Draft {
            return Err(DomainError::Validation(format!(
                "payroll `{}` can no longer be edited in status {}",
                self.id.0,
                self.status.as_str()
            )));
        }
        self.period = period;
        self.gross_pay = breakdown.gross_pay;
        self.total_deductions = breakdown.total_deductions;
        self.taxable_income = breakdown.taxable_income;
        self.withholding_tax = breakdown.withholding_tax;
        self.net_pay = breakdown.net_pay;
        self.deductions = breakdown.deductions;
        self.updated_at = now;
        Ok(())
    }
}
