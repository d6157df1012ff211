use serde::Serialize;

use super::error::CalcError;
use super::tables::TaxTable;
use super::tax::{marginal_rate, marginal_rate_for_mode, withdrawal_tax_for_mode};
use super::types::{AnnuityInput, AnnuityResult, TaxMode, WithdrawalInput, WithdrawalResult};

/// Smallest savings-pot withdrawal a fund will process.
pub const MIN_WITHDRAWAL: f64 = 2_000.0;
/// The savings pot holds one third of the fund value.
pub const SAVINGS_POT_DIVISOR: f64 = 3.0;
/// Share of the savings pot that may be withdrawn.
pub const MAX_WITHDRAWAL_SHARE: f64 = 0.1;
/// Retirement-annuity contributions are deductible up to this share of income...
pub const RA_DEDUCTION_RATE: f64 = 0.275;
/// ...and never more than this per year.
pub const RA_DEDUCTION_CAP: f64 = 350_000.0;
pub const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitDecision {
    Accepted,
    BelowMinimum,
    ExceedsLimit,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalLimit {
    pub savings_pot: f64,
    pub max_withdrawal: f64,
    pub decision: LimitDecision,
}

impl WithdrawalLimit {
    pub fn is_accepted(&self) -> bool {
        self.decision == LimitDecision::Accepted
    }

    pub fn check(&self) -> Result<(), CalcError> {
        match self.decision {
            LimitDecision::Accepted => Ok(()),
            LimitDecision::BelowMinimum => Err(CalcError::BelowMinimum {
                minimum: MIN_WITHDRAWAL,
            }),
            LimitDecision::ExceedsLimit => Err(CalcError::ExceedsLimit {
                limit: self.max_withdrawal,
            }),
        }
    }
}

pub fn savings_pot(fund_value: f64) -> f64 {
    fund_value.max(0.0) / SAVINGS_POT_DIVISOR
}

pub fn max_withdrawal(fund_value: f64) -> f64 {
    savings_pot(fund_value) * MAX_WITHDRAWAL_SHARE
}

pub fn validate_withdrawal(fund_value: f64, requested: f64) -> WithdrawalLimit {
    let savings_pot = savings_pot(fund_value);
    let max_withdrawal = savings_pot * MAX_WITHDRAWAL_SHARE;
    let decision = if requested < MIN_WITHDRAWAL {
        LimitDecision::BelowMinimum
    } else if requested > max_withdrawal {
        LimitDecision::ExceedsLimit
    } else {
        LimitDecision::Accepted
    };

    WithdrawalLimit {
        savings_pot,
        max_withdrawal,
        decision,
    }
}

pub fn future_value(present_value: f64, years: f64, rate: f64) -> f64 {
    present_value * (1.0 + rate).powf(years)
}

fn require(value: f64, field: &'static str) -> Result<f64, CalcError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CalcError::MissingInput { field })
    }
}

pub fn run_withdrawal(input: &WithdrawalInput, table: &TaxTable) -> Result<WithdrawalResult, CalcError> {
    let salary = match input.tax_mode {
        TaxMode::Marginal => require(input.annual_salary, "annual salary")?,
        TaxMode::LumpSum => input.annual_salary.max(0.0),
    };
    let fund_value = require(input.fund_value, "fund value")?;
    let gross = require(input.withdrawal_amount, "withdrawal amount")?;

    let limit = validate_withdrawal(fund_value, gross);
    if let Err(err) = limit.check() {
        log::debug!("withdrawal of {gross} rejected: {err}");
        return Err(err);
    }

    let tax = withdrawal_tax_for_mode(salary, gross, input.tax_mode, table);
    let net_amount = gross - tax;
    let years = input.years_to_retirement.max(0.0);
    let growth_rate = input.growth_rate.max(0.0);
    let future_value = future_value(gross, years, growth_rate);

    log::trace!(
        "withdrawal gross={gross} tax={tax} mode={:?} table={:?}",
        input.tax_mode,
        table.label
    );

    Ok(WithdrawalResult {
        gross_withdrawal: gross,
        tax,
        net_amount,
        effective_tax_rate: tax / gross,
        marginal_tax_rate: marginal_rate_for_mode(salary, gross, input.tax_mode, table),
        savings_pot: limit.savings_pot,
        max_withdrawal: limit.max_withdrawal,
        remaining_savings_pot: (limit.savings_pot - gross).max(0.0),
        years_to_retirement: years,
        growth_rate,
        future_value,
        foregone_growth: future_value - gross,
    })
}

pub fn run_annuity(input: &AnnuityInput, table: &TaxTable) -> Result<AnnuityResult, CalcError> {
    let monthly_salary = require(input.monthly_salary, "monthly salary")?;
    let current_monthly = input.current_monthly.max(0.0);
    let extra_monthly = input.extra_monthly.max(0.0);

    let annual_salary = monthly_salary * MONTHS_PER_YEAR;
    let current_annual = current_monthly * MONTHS_PER_YEAR;
    let extra_annual = extra_monthly * MONTHS_PER_YEAR;

    let max_deductible = (annual_salary * RA_DEDUCTION_RATE).min(RA_DEDUCTION_CAP);
    let headroom = (max_deductible - current_annual).max(0.0);
    let deductible_extra = extra_annual.min(headroom);
    let rate = marginal_rate(annual_salary, table);
    let annual_tax_saving = deductible_extra * rate;
    // Costed on the full extra contribution; the saving above uses only the
    // deductible part.
    let net_monthly_cost = extra_monthly - extra_monthly * rate;
    let excess_monthly =
        (extra_annual > headroom).then(|| (extra_annual - headroom) / MONTHS_PER_YEAR);

    if let Some(excess) = excess_monthly {
        log::debug!("extra RA contribution exceeds headroom by {excess} per month");
    }

    Ok(AnnuityResult {
        annual_salary,
        max_deductible,
        current_annual,
        extra_annual,
        headroom,
        deductible_extra,
        marginal_tax_rate: rate,
        annual_tax_saving,
        monthly_tax_saving: annual_tax_saving / MONTHS_PER_YEAR,
        net_monthly_cost,
        excess_monthly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tables::INCOME_TAX_2025_26;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_withdrawal() -> WithdrawalInput {
        WithdrawalInput {
            annual_salary: 300_000.0,
            fund_value: 1_800_000.0,
            withdrawal_amount: 50_000.0,
            years_to_retirement: 20.0,
            growth_rate: 0.10,
            tax_mode: TaxMode::Marginal,
        }
    }

    fn sample_annuity() -> AnnuityInput {
        AnnuityInput {
            monthly_salary: 50_000.0,
            current_monthly: 0.0,
            extra_monthly: 2_000.0,
        }
    }

    #[test]
    fn validate_withdrawal_reports_savings_pot_and_limit() {
        let limit = validate_withdrawal(900_000.0, 35_000.0);
        assert_approx(limit.savings_pot, 300_000.0);
        assert_approx(limit.max_withdrawal, 30_000.0);
        assert_eq!(limit.decision, LimitDecision::ExceedsLimit);
        assert_eq!(
            limit.check(),
            Err(CalcError::ExceedsLimit {
                limit: limit.max_withdrawal
            })
        );
    }

    #[test]
    fn validate_withdrawal_accepts_amount_at_limit() {
        let limit = validate_withdrawal(900_000.0, 30_000.0);
        assert!(limit.is_accepted());
        assert_eq!(limit.check(), Ok(()));
    }

    #[test]
    fn validate_withdrawal_rejects_below_minimum() {
        let limit = validate_withdrawal(900_000.0, 1_500.0);
        assert_eq!(limit.decision, LimitDecision::BelowMinimum);
        assert_eq!(
            limit.check(),
            Err(CalcError::BelowMinimum {
                minimum: MIN_WITHDRAWAL
            })
        );
    }

    #[test]
    fn future_value_compounds_annually() {
        assert_approx(future_value(10_000.0, 2.0, 0.10), 12_100.0);
        assert_approx(future_value(10_000.0, 0.0, 0.10), 10_000.0);
        assert_approx(future_value(10_000.0, 15.0, 0.0), 10_000.0);
    }

    #[test]
    fn future_value_accepts_fractional_years() {
        let half = future_value(10_000.0, 0.5, 0.21);
        assert_approx(half, 11_000.0);
    }

    #[test]
    fn run_withdrawal_derives_tax_rates_and_projection() {
        let result = run_withdrawal(&sample_withdrawal(), &INCOME_TAX_2025_26).expect("valid");
        assert_approx(result.gross_withdrawal, 50_000.0);
        assert_approx(result.tax, 13_000.0);
        assert_approx(result.net_amount, 37_000.0);
        assert_approx(result.effective_tax_rate, 0.26);
        assert_approx(result.marginal_tax_rate, 0.26);
        assert_approx(result.savings_pot, 600_000.0);
        assert_approx(result.max_withdrawal, 60_000.0);
        assert_approx(result.remaining_savings_pot, 550_000.0);
        assert_approx(result.future_value, 50_000.0 * 1.1f64.powi(20));
        assert_approx(result.foregone_growth, result.future_value - 50_000.0);
    }

    #[test]
    fn run_withdrawal_short_circuits_before_tax_when_over_limit() {
        let mut input = sample_withdrawal();
        input.fund_value = 900_000.0;
        input.withdrawal_amount = 35_000.0;
        let err = run_withdrawal(&input, &INCOME_TAX_2025_26).expect_err("over limit");
        match err {
            CalcError::ExceedsLimit { limit } => assert_approx(limit, 30_000.0),
            ref other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("R 30000"));
    }

    #[test]
    fn run_withdrawal_requires_salary_fund_and_amount() {
        let mut input = sample_withdrawal();
        input.annual_salary = 0.0;
        assert_eq!(
            run_withdrawal(&input, &INCOME_TAX_2025_26).expect_err("missing salary"),
            CalcError::MissingInput {
                field: "annual salary"
            }
        );

        let mut input = sample_withdrawal();
        input.fund_value = f64::NAN;
        assert_eq!(
            run_withdrawal(&input, &INCOME_TAX_2025_26).expect_err("missing fund"),
            CalcError::MissingInput { field: "fund value" }
        );

        let mut input = sample_withdrawal();
        input.withdrawal_amount = 0.0;
        assert_eq!(
            run_withdrawal(&input, &INCOME_TAX_2025_26).expect_err("missing amount"),
            CalcError::MissingInput {
                field: "withdrawal amount"
            }
        );
    }

    #[test]
    fn run_withdrawal_lump_sum_mode_does_not_need_salary() {
        let mut input = sample_withdrawal();
        input.tax_mode = TaxMode::LumpSum;
        input.annual_salary = 0.0;
        input.withdrawal_amount = 25_000.0;
        let result = run_withdrawal(&input, &INCOME_TAX_2025_26).expect("valid");
        assert_approx(result.tax, 0.0);
        assert_approx(result.net_amount, 25_000.0);
        assert_approx(result.marginal_tax_rate, 0.0);
    }

    #[test]
    fn run_annuity_full_extra_within_headroom() {
        let result = run_annuity(&sample_annuity(), &INCOME_TAX_2025_26).expect("valid");
        assert_approx(result.annual_salary, 600_000.0);
        assert_approx(result.max_deductible, 165_000.0);
        assert_approx(result.headroom, 165_000.0);
        assert_approx(result.extra_annual, 24_000.0);
        assert_approx(result.deductible_extra, 24_000.0);
        assert_approx(result.marginal_tax_rate, 0.36);
        assert_approx(result.annual_tax_saving, 24_000.0 * 0.36);
        assert_approx(result.monthly_tax_saving, 2_000.0 * 0.36);
        assert_approx(result.net_monthly_cost, 2_000.0 * (1.0 - 0.36));
        assert_eq!(result.excess_monthly, None);
    }

    #[test]
    fn run_annuity_caps_deduction_at_absolute_limit() {
        let mut input = sample_annuity();
        input.monthly_salary = 200_000.0;
        let result = run_annuity(&input, &INCOME_TAX_2025_26).expect("valid");
        assert_approx(result.max_deductible, RA_DEDUCTION_CAP);
        assert_approx(result.marginal_tax_rate, 0.45);
    }

    #[test]
    fn run_annuity_reports_excess_and_keeps_net_cost_unclamped() {
        let input = AnnuityInput {
            monthly_salary: 50_000.0,
            current_monthly: 12_000.0,
            extra_monthly: 2_000.0,
        };
        let result = run_annuity(&input, &INCOME_TAX_2025_26).expect("valid");
        assert_approx(result.current_annual, 144_000.0);
        assert_approx(result.headroom, 21_000.0);
        assert_approx(result.deductible_extra, 21_000.0);
        assert_approx(result.annual_tax_saving, 21_000.0 * 0.36);
        assert_approx(result.excess_monthly.expect("excess"), 250.0);
        assert_approx(result.net_monthly_cost, 2_000.0 * (1.0 - 0.36));
    }

    #[test]
    fn run_annuity_headroom_never_negative() {
        let input = AnnuityInput {
            monthly_salary: 20_000.0,
            current_monthly: 10_000.0,
            extra_monthly: 500.0,
        };
        let result = run_annuity(&input, &INCOME_TAX_2025_26).expect("valid");
        assert_approx(result.headroom, 0.0);
        assert_approx(result.deductible_extra, 0.0);
        assert_approx(result.annual_tax_saving, 0.0);
        assert_approx(result.excess_monthly.expect("excess"), 500.0);
    }

    #[test]
    fn run_annuity_requires_salary() {
        let mut input = sample_annuity();
        input.monthly_salary = 0.0;
        assert_eq!(
            run_annuity(&input, &INCOME_TAX_2025_26).expect_err("missing salary"),
            CalcError::MissingInput {
                field: "monthly salary"
            }
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(128))]

        #[test]
        fn prop_future_value_identities(
            present in 0.0f64..1_000_000.0,
            years in 0.0f64..60.0,
            rate in 0.0f64..0.25
        ) {
            prop_assert!((future_value(present, 0.0, rate) - present).abs() <= 1e-9);
            prop_assert!((future_value(present, years, 0.0) - present).abs() <= 1e-9);
            prop_assert!(future_value(present, years, rate) + 1e-9 >= present);
        }

        #[test]
        fn prop_accepted_withdrawal_is_within_limit(
            fund in 0.0f64..10_000_000.0,
            requested in 0.0f64..500_000.0
        ) {
            let limit = validate_withdrawal(fund, requested);
            if limit.is_accepted() {
                prop_assert!(requested >= MIN_WITHDRAWAL);
                prop_assert!(requested <= limit.max_withdrawal);
            }
        }

        #[test]
        fn prop_deductible_extra_within_headroom_and_extra(
            salary in 1.0f64..300_000.0,
            current in 0.0f64..40_000.0,
            extra in 0.0f64..40_000.0
        ) {
            let input = AnnuityInput { monthly_salary: salary, current_monthly: current, extra_monthly: extra };
            let result = run_annuity(&input, &INCOME_TAX_2025_26).expect("salary is positive");
            prop_assert!(result.headroom >= 0.0);
            prop_assert!(result.deductible_extra <= result.headroom + 1e-9);
            prop_assert!(result.deductible_extra <= result.extra_annual + 1e-9);
            prop_assert!(result.max_deductible <= RA_DEDUCTION_CAP);
            prop_assert!(result.net_monthly_cost >= 0.0);
        }
    }
}
