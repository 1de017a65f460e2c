use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum ContributionBasis {
    Flat { employee: Decimal, employer: Decimal },
    Rate { employee_rate: Decimal, employer_rate: Decimal },
}

/// Contribution owed for salaries within `[min_salary, max_salary]`, compared
/// at centavo precision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRule {
    pub code: String,
    pub min_salary: Decimal,
    pub max_salary: Option<Decimal>,
    pub basis: ContributionBasis,
}

impl DeductionRule {
    pub fn covers(&self, salary: Decimal) -> bool {
        salary >= self.min_salary && self.max_salary.map_or(true, |max| salary <= max)
    }

    pub fn shares(&self, salary: Decimal) -> (Decimal, Decimal) {
        let (employee, employer) = match &self.basis {
            ContributionBasis::Flat { employee, employer } => (*employee, *employer),
            ContributionBasis::Rate { employee_rate, employer_rate } => {
                (salary * employee_rate, salary * employer_rate)
            }
        };
        (round_centavos(employee), round_centavos(employer))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionLine {
    pub code: String,
    pub employee_share: Decimal,
    pub employer_share: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionSchedule {
    rules: Vec<DeductionRule>,
}

impl Default for DeductionSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl DeductionSchedule {
    pub fn new(rules: Vec<DeductionRule>) -> Self {
        Self { rules }
    }

    /// SSS, PhilHealth and Pag-IBIG contribution table. Bounds are in
    /// centavos; salaries are rounded to centavos before lookup.
    pub fn standard() -> Self {
        Self::new(vec![
            flat("SSS", amount(0, 0), Some(amount(424_999, 2)), amount(180, 0), amount(380, 0)),
            rate("SSS", amount(4_250, 0), Some(amount(2_974_999, 2)), amount(45, 3), amount(95, 3)),
            flat("SSS", amount(29_750, 0), None, amount(1_350, 0), amount(2_850, 0)),
            flat(
                "PHILHEALTH",
                amount(0, 0),
                Some(amount(10_000, 0)),
                amount(250, 0),
                amount(250, 0),
            ),
            rate(
                "PHILHEALTH",
                amount(1_000_001, 2),
                Some(amount(9_999_999, 2)),
                amount(25, 3),
                amount(25, 3),
            ),
            flat("PHILHEALTH", amount(100_000, 0), None, amount(2_500, 0), amount(2_500, 0)),
            rate("PAGIBIG", amount(0, 0), Some(amount(1_500, 0)), amount(1, 2), amount(2, 2)),
            rate(
                "PAGIBIG",
                amount(150_001, 2),
                Some(amount(10_000, 0)),
                amount(2, 2),
                amount(2, 2),
            ),
            flat("PAGIBIG", amount(1_000_001, 2), None, amount(200, 0), amount(200, 0)),
        ])
    }

    pub fn rules(&self) -> &[DeductionRule] {
        &self.rules
    }

    /// Distinct codes in table order.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !codes.contains(&rule.code.as_str()) {
                codes.push(rule.code.as_str());
            }
        }
        codes
    }

    pub fn lookup(&self, code: &str, salary: Decimal) -> Option<&DeductionRule> {
        let salary = round_centavos(salary);
        self.rules.iter().find(|rule| rule.code == code && rule.covers(salary))
    }

    /// One line per code whose table has a row covering `salary`.
    pub fn compute(&self, salary: Decimal) -> Vec<DeductionLine> {
        let salary = round_centavos(salary);
        self.codes()
            .into_iter()
            .filter_map(|code| self.lookup(code, salary))
            .map(|rule| {
                let (employee_share, employer_share) = rule.shares(salary);
                DeductionLine { code: rule.code.clone(), employee_share, employer_share }
            })
            .collect()
    }
}

fn round_centavos(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn amount(mantissa: i64, scale: u32) -> Decimal {
    Decimal::new(mantissa, scale)
}

fn flat(
    code: &str,
    min: Decimal,
    max: Option<Decimal>,
    employee: Decimal,
    employer: Decimal,
) -> DeductionRule {
    DeductionRule {
        code: code.to_string(),
        min_salary: min,
        max_salary: max,
        basis: ContributionBasis::Flat { employee, employer },
    }
}

fn rate(
    code: &str,
    min: Decimal,
    max: Option<Decimal>,
    employee_rate: Decimal,
    employer_rate: Decimal,
) -> DeductionRule {
    DeductionRule {
        code: code.to_string(),
        min_salary: min,
        max_salary: max,
        basis: ContributionBasis::Rate { employee_rate, employer_rate },
    }
}
