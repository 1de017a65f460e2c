use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::lifecycle::Lifecycle;
use crate::errors::DomainError;
use crate::workflow::states::WorkflowState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScmRequestId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScmRequestStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
    Cancelled,
}

impl WorkflowState for ScmRequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Submitted => "Submitted",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Submitted" => Some(Self::Submitted),
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmRequestItem {
    pub item_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmRequest {
    pub id: ScmRequestId,
    pub request_no: String,
    pub department: String,
    pub purpose: String,
    pub request_status: ScmRequestStatus,
    pub prepared_by: String,
    pub approved_by: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub remarks: Option<String>,
    pub total_amount: Decimal,
    pub items: Vec<ScmRequestItem>,
    pub version: i64,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmItemDraft {
    pub item_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmRequestDraft {
    pub request_no: String,
    pub department: String,
    pub purpose: String,
    pub prepared_by: String,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    pub items: Vec<ScmItemDraft>,
}

impl ScmRequestDraft {
    /// Validates the lines and returns them with amounts filled in, plus the
    /// total the lines add up to.
    pub fn priced_items(&self) -> Result<(Vec<ScmRequestItem>, Decimal), DomainError> {
        if self.request_no.trim().is_empty() {
            return Err(DomainError::Validation("scm_request.request_no is required".to_string()));
        }
        if self.prepared_by.trim().is_empty() {
            return Err(DomainError::Validation(
                "scm_request.prepared_by is required".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(DomainError::Validation(
                "scm_request must contain at least one item".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            if item.item_name.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "scm_request.items[{index}].item_name is required"
                )));
            }
            if item.quantity <= Decimal::ZERO {
                return Err(DomainError::Validation(format!(
                    "scm_request.items[{index}].quantity must be positive"
                )));
            }
            if item.unit_cost.is_sign_negative() {
                return Err(DomainError::Validation(format!(
                    "scm_request.items[{index}].unit_cost must not be negative"
                )));
            }

            let computed = round_amount(item.quantity * item.unit_cost);
            if let Some(amount) = item.amount {
                if round_amount(amount) != computed {
                    return Err(DomainError::Validation(format!(
                        "scm_request.items[{index}].amount {amount} does not equal quantity x unit_cost ({computed})"
                    )));
                }
            }

            items.push(ScmRequestItem {
                item_name: item.item_name.trim().to_string(),
                unit: item.unit.trim().to_string(),
                quantity: item.quantity,
                unit_cost: item.unit_cost,
                amount: computed,
            });
        }

        let total: Decimal = items.iter().map(|item| item.amount).sum();
        if let Some(declared) = self.total_amount {
            if round_amount(declared) != total {
                return Err(DomainError::Validation(format!(
                    "scm_request.total_amount {declared} does not equal the sum of item amounts ({total})"
                )));
            }
        }

        Ok((items, total))
    }
}

impl ScmRequest {
    pub fn create(
        id: ScmRequestId,
        draft: ScmRequestDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let (items, total_amount) = draft.priced_items()?;
        Ok(Self {
            id,
            request_no: draft.request_no.trim().to_string(),
            department: draft.department,
            purpose: draft.purpose,
            request_status: ScmRequestStatus::Pending,
            prepared_by: draft.prepared_by,
            approved_by: None,
            submitted_at: None,
            approved_at: None,
            rejected_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            remarks: None,
            total_amount,
            items,
            version: 1,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn revise(&mut self, draft: ScmRequestDraft, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.request_status != ScmRequestStatus::Pending {
            return Err(DomainError::Validation(format!(
                "scm request `{}` can no longer be edited in status {}",
                self.id.0,
                self.request_status.as_str()
            )));
        }
        let (items, total_amount) = draft.priced_items()?;
        self.request_no = draft.request_no.trim().to_string();
        self.department = draft.department;
        self.purpose = draft.purpose;
        self.prepared_by = draft.prepared_by;
        self.items = items;
        self.total_amount = total_amount;
        self.updated_at = now;
        Ok(())
    }
}

fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
