use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::lifecycle::Lifecycle;
use crate::errors::DomainError;
use crate::workflow::states::WorkflowState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchDistributionId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchDistributionStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
    Canceled,
}

impl WorkflowState for BranchDistributionStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Fulfilled => "fulfilled",
            Self::Canceled => "canceled",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "fulfilled" => Some(Self::Fulfilled),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Fulfilled | Self::Canceled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionItem {
    pub product_name: String,
    pub unit: String,
    pub quantity: Decimal,
}

/// Stock request from a branch to the central commissary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDistributionRequest {
    pub id: BranchDistributionId,
    pub branch_name: String,
    pub status: BranchDistributionStatus,
    pub created_by: String,
    pub processed_by: Option<String>,
    pub fulfilled_by: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<DistributionItem>,
    pub version: i64,
    pub lifecycle: Lifecycle,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDistributionDraft {
    pub branch_name: String,
    pub created_by: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<DistributionItem>,
}

impl BranchDistributionDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.branch_name.trim().is_empty() {
            return Err(DomainError::Validation(
                "branch_distribution.branch_name is required".to_string(),
            ));
        }
        if self.created_by.trim().is_empty() {
            return Err(DomainError::Validation(
                "branch_distribution.created_by is required".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(DomainError::Validation(
                "branch_distribution must request at least one item".to_string(),
            ));
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.product_name.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "branch_distribution.items[{index}].product_name is required"
                )));
            }
            if item.quantity <= Decimal::ZERO {
                return Err(DomainError::Validation(format!(
                    "branch_distribution.items[{index}].quantity must be positive"
                )));
            }
        }
        Ok(())
    }
}

impl BranchDistributionRequest {
    pub fn create(
        id: BranchDistributionId,
        draft: BranchDistributionDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            branch_name: draft.branch_name.trim().to_string(),
            status: BranchDistributionStatus::Pending,
            created_by: draft.created_by,
            processed_by: None,
            fulfilled_by: None,
            requested_at: now,
            approved_at: None,
            rejected_at: None,
            fulfilled_at: None,
            canceled_at: None,
            rejection_reason: None,
            notes: draft.notes,
            items: draft.items,
            version: 1,
            lifecycle: Lifecycle::Active,
            updated_at: now,
        })
    }

    /// Replaces branch, notes and items while the request is still pending.
    pub fn revise(
        &mut self,
        draft: BranchDistributionDraft,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != BranchDistributionStatus::Pending {
            return Err(DomainError::Validation(format!(
                "branch distribution `{}` can no longer be edited in status {}",
                self.id.0,
                self.status.as_str()
            )));
        }
        draft.validate()?;
        self.branch_name = draft.branch_name.trim().to_string();
        self.notes = draft.notes;
        self.items = draft.items;
        self.updated_at = now;
        Ok(())
    }

    pub fn total_quantity(&self) -> Decimal {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        BranchDistributionDraft, BranchDistributionId, BranchDistributionRequest,
        BranchDistributionStatus, DistributionItem,
    };
    use crate::workflow::states::WorkflowState;

    fn draft(quantity: i64) -> BranchDistributionDraft {
        BranchDistributionDraft {
            branch_name: "Makati".to_string(),
            created_by: "u-branch-lead".to_string(),
            notes: None,
            items: vec![
                DistributionItem {
                    product_name: "Pandesal".to_string(),
                    unit: "tray".to_string(),
                    quantity: Decimal::new(quantity, 0),
                },
                DistributionItem {
                    product_name: "Ensaymada".to_string(),
                    unit: "box".to_string(),
                    quantity: Decimal::new(3, 0),
                },
            ],
        }
    }

    #[test]
    fn new_requests_are_pending_with_requested_at_set() {
        let now = Utc::now();
        let request =
            BranchDistributionRequest::create(BranchDistributionId("BD-1".to_string()), draft(5), now)
                .expect("create");

        assert_eq!(request.status, BranchDistributionStatus::Pending);
        assert_eq!(request.requested_at, now);
        assert_eq!(request.total_quantity(), Decimal::new(8, 0));
        assert_eq!(request.status.as_str(), "pending");
    }

    #[test]
    fn revise_is_limited_to_pending_requests() {
        let id = BranchDistributionId("BD-3".to_string());
        let mut request =
            BranchDistributionRequest::create(id, draft(5), Utc::now()).expect("create");

        let mut edited = draft(9);
        edited.branch_name = "  Pasig  ".to_string();
        edited.items.truncate(1);
        request.revise(edited, Utc::now()).expect("revise pending");
        assert_eq!(request.branch_name, "Pasig");
        assert_eq!(request.total_quantity(), Decimal::new(9, 0));
        assert_eq!(request.created_by, "u-branch-lead");

        assert!(request.revise(draft(0), Utc::now()).is_err());
        assert_eq!(request.total_quantity(), Decimal::new(9, 0));

        request.status = BranchDistributionStatus::Approved;
        assert!(request.revise(draft(2), Utc::now()).is_err());
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        assert!(BranchDistributionRequest::create(
            BranchDistributionId("BD-2".to_string()),
            draft(0),
            Utc::now()
        )
        .is_err());
    }
}
