use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::lifecycle::Lifecycle;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub employee_no: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub position: String,
    pub monthly_salary: Decimal,
    pub hired_on: NaiveDate,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDraft {
    pub employee_no: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub position: String,
    pub monthly_salary: Decimal,
    pub hired_on: NaiveDate,
}

impl EmployeeDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("employee_no", &self.employee_no),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(DomainError::Validation(format!("employee.{field} is required")));
        }
        if self.monthly_salary.is_sign_negative() {
            return Err(DomainError::Validation(
                "employee.monthly_salary must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Employee {
    pub fn create(
        id: EmployeeId,
        draft: EmployeeDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            employee_no: draft.employee_no.trim().to_string(),
            first_name: draft.first_name,
            last_name: draft.last_name,
            department: draft.department,
            position: draft.position,
            monthly_salary: draft.monthly_salary,
            hired_on: draft.hired_on,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn revise(&mut self, draft: EmployeeDraft, now: DateTime<Utc>) -> Result<(), DomainError> {
        draft.validate()?;
        self.employee_no = draft.employee_no.trim().to_string();
        self.first_name = draft.first_name;
        self.last_name = draft.last_name;
        self.department = draft.department;
        self.position = draft.position;
        self.monthly_salary = draft.monthly_salary;
        self.hired_on = draft.hired_on;
        self.updated_at = now;
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{Employee, EmployeeDraft, EmployeeId};

    fn draft() -> EmployeeDraft {
        EmployeeDraft {
            employee_no: " E-0001 ".to_string(),
            first_name: "Maria".to_string(),
            last_name: "Santos".to_string(),
            department: "Finance".to_string(),
            position: "Accountant".to_string(),
            monthly_salary: Decimal::new(3_500_000, 2),
            hired_on: NaiveDate::from_ymd_opt(2024, 1, 15).expect("date"),
        }
    }

    #[test]
    fn create_trims_employee_number() {
        let employee =
            Employee::create(EmployeeId("EMP-1".to_string()), draft(), Utc::now()).expect("ok");
        assert_eq!(employee.employee_no, "E-0001");
        assert_eq!(employee.full_name(), "Maria Santos");
    }

    #[test]
    fn negative_salary_is_a_validation_error() {
        let mut draft = draft();
        draft.monthly_salary = Decimal::new(-1, 0);
        assert!(Employee::create(EmployeeId("EMP-2".to_string()), draft, Utc::now()).is_err());
    }
}
