use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// One row of the monthly withholding table: amounts above `lower` pay `base`
/// plus `rate` on the excess.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub lower: Decimal,
    pub base: Decimal,
    pub rate: Decimal,
}

pub fn withholding_brackets() -> [TaxBracket; 6] {
    [
        TaxBracket { lower: Decimal::ZERO, base: Decimal::ZERO, rate: Decimal::ZERO },
        TaxBracket { lower: Decimal::new(20_833, 0), base: Decimal::ZERO, rate: Decimal::new(20, 2) },
        TaxBracket {
            lower: Decimal::new(33_333, 0),
            base: Decimal::new(2_500, 0),
            rate: Decimal::new(25, 2),
        },
        TaxBracket {
            lower: Decimal::new(66_667, 0),
            base: Decimal::new(1_083_333, 2),
            rate: Decimal::new(30, 2),
        },
        TaxBracket {
            lower: Decimal::new(166_667, 0),
            base: Decimal::new(4_083_333, 2),
            rate: Decimal::new(32, 2),
        },
        TaxBracket {
            lower: Decimal::new(666_667, 0),
            base: Decimal::new(20_083_333, 2),
            rate: Decimal::new(35, 2),
        },
    ]
}

/// Monthly withholding tax on `taxable`, rounded to centavos.
///
/// The third bracket's formula overshoots the fourth bracket's base by a few
/// centavos right below 66,667, so every bracket is capped at the next base to
/// keep the result non-decreasing in `taxable`.
pub fn compute_withholding_tax(taxable: Decimal) -> Decimal {
    if taxable <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let brackets = withholding_brackets();
    let index = brackets.iter().rposition(|bracket| taxable > bracket.lower).unwrap_or(0);
    let bracket = brackets[index];

    let mut tax = bracket.base + (taxable - bracket.lower) * bracket.rate;
    if let Some(next) = brackets.get(index + 1) {
        tax = tax.min(next.base);
    }

    tax.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
