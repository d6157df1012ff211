use super::tables::{LUMP_SUM_2024_25, TaxTable};
use super::types::{TaxBracket, TaxMode};

fn bracket_for(amount: f64, table: &TaxTable) -> Option<&TaxBracket> {
    // First bracket whose upper bound covers the amount. For whole-rand amounts
    // this is the bracket with lower <= amount <= upper; fractional amounts
    // between upper[i] and lower[i + 1] fall into bracket i + 1.
    table.brackets.iter().find(|bracket| amount <= bracket.upper())
}

/// Progressive tax owed on `amount` under `table`.
pub fn compute_tax(amount: f64, table: &TaxTable) -> f64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0.0;
    }

    match bracket_for(amount, table) {
        Some(bracket) => {
            bracket.base_tax + (amount - bracket.lower_bound).max(0.0) * bracket.rate
        }
        None => {
            log::debug!(
                "amount {amount} outside every bracket of {:?}; taxing as zero",
                table.label
            );
            0.0
        }
    }
}

/// Rate applied to the next rand of `income`.
pub fn marginal_rate(income: f64, table: &TaxTable) -> f64 {
    let income = if income.is_nan() { 0.0 } else { income.max(0.0) };
    bracket_for(income, table)
        .or_else(|| table.brackets.last())
        .map(|bracket| bracket.rate)
        .unwrap_or(0.0)
}

/// Tax on a withdrawal stacked on top of salary income.
pub fn withdrawal_tax(salary: f64, withdrawal: f64, table: &TaxTable) -> f64 {
    let salary = salary.max(0.0);
    let withdrawal = withdrawal.max(0.0);
    let before = compute_tax(salary, table);
    let after = compute_tax(salary + withdrawal, table);
    (after - before).max(0.0)
}

/// Withdrawal tax under the requested mode. Lump-sum mode ignores salary and
/// always uses the lump-sum table.
pub fn withdrawal_tax_for_mode(
    salary: f64,
    withdrawal: f64,
    mode: TaxMode,
    table: &TaxTable,
) -> f64 {
    match mode {
        TaxMode::Marginal => withdrawal_tax(salary, withdrawal, table),
        TaxMode::LumpSum => compute_tax(withdrawal, &LUMP_SUM_2024_25),
    }
}

/// Marginal rate of the last rand withdrawn under the requested mode.
pub fn marginal_rate_for_mode(salary: f64, withdrawal: f64, mode: TaxMode, table: &TaxTable) -> f64 {
    match mode {
        TaxMode::Marginal => marginal_rate(salary.max(0.0) + withdrawal.max(0.0), table),
        TaxMode::LumpSum => marginal_rate(withdrawal, &LUMP_SUM_2024_25),
    }
}
