use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use super::debounce::Debouncer;
use super::format::{max_withdrawal_helper, withdrawal_report};
use crate::core::{TaxMode, TaxTable, WithdrawalInput, max_withdrawal, parse_number, run_withdrawal};

/// Raw field values as typed; parsed on every recalculation.
#[derive(Debug, Clone, Default)]
pub struct WithdrawalForm {
    pub annual_salary: String,
    pub fund_value: String,
    pub withdrawal_amount: String,
    pub years_to_retirement: String,
    pub growth_rate: String,
    pub tax_mode: TaxMode,
}

#[derive(Debug, PartialEq)]
pub enum FieldUpdate {
    Fund,
    Other,
}

impl WithdrawalForm {
    /// Applies a `field=value` (or `field value`) line.
    pub fn apply(&mut self, line: &str) -> Result<FieldUpdate, String> {
        let line = line.trim();
        let (key, value) = line
            .split_once('=')
            .or_else(|| line.split_once(char::is_whitespace))
            .ok_or_else(|| format!("expected field=value, got {line:?}"))?;
        let value = value.trim().to_string();

        match key.trim().to_ascii_lowercase().as_str() {
            "salary" | "annual-salary" => self.annual_salary = value,
            "fund" | "fund-value" => {
                self.fund_value = value;
                return Ok(FieldUpdate::Fund);
            }
            "amount" | "withdrawal" | "withdrawal-amount" => self.withdrawal_amount = value,
            "years" | "years-to-retirement" => self.years_to_retirement = value,
            "growth" | "growth-rate" => self.growth_rate = value,
            "mode" | "tax-mode" => {
                self.tax_mode = match value.to_ascii_lowercase().as_str() {
                    "marginal" => TaxMode::Marginal,
                    "lump-sum" | "lumpsum" => TaxMode::LumpSum,
                    other => return Err(format!("unknown tax mode {other:?}")),
                }
            }
            other => return Err(format!("unknown field {other:?}")),
        }
        Ok(FieldUpdate::Other)
    }

    pub fn to_input(&self, default_years: f64, default_growth_percent: f64) -> WithdrawalInput {
        let years = if self.years_to_retirement.is_empty() {
            default_years
        } else {
            parse_number(&self.years_to_retirement)
        };
        let growth_percent = if self.growth_rate.is_empty() {
            default_growth_percent
        } else {
            parse_number(&self.growth_rate)
        };

        WithdrawalInput {
            annual_salary: parse_number(&self.annual_salary),
            fund_value: parse_number(&self.fund_value),
            withdrawal_amount: parse_number(&self.withdrawal_amount),
            years_to_retirement: years,
            growth_rate: growth_percent / 100.0,
            tax_mode: self.tax_mode,
        }
    }
}

pub fn render(form: &WithdrawalForm, table: &TaxTable, years: f64, growth_percent: f64) -> String {
    match run_withdrawal(&form.to_input(years, growth_percent), table) {
        Ok(result) => withdrawal_report(&result, table),
        Err(err) => format!("! {err}\n"),
    }
}

/// Reads field updates from stdin and prints a fresh calculation once input
/// has been idle for `delay`.
pub async fn run(
    table: Arc<TaxTable>,
    delay: Duration,
    years: f64,
    growth_percent: f64,
) -> std::io::Result<()> {
    let mut form = WithdrawalForm::default();
    let mut debouncer = Debouncer::new(delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Enter fields as name=value (salary, fund, amount, years, growth, mode). Ctrl-D to quit.");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match form.apply(&line) {
            Ok(update) => {
                if update == FieldUpdate::Fund {
                    let fund = parse_number(&form.fund_value);
                    if fund > 0.0 {
                        println!("{}", max_withdrawal_helper(max_withdrawal(fund)));
                    }
                }
                let snapshot = form.clone();
                let table = Arc::clone(&table);
                debouncer.schedule(move || {
                    print!("{}", render(&snapshot, &table, years, growth_percent));
                });
            }
            Err(msg) => eprintln!("{msg}"),
        }
    }

    debouncer.flush().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::INCOME_TAX_2025_26;

    #[test]
    fn apply_accepts_both_separators_and_currency_text() {
        let mut form = WithdrawalForm::default();
        assert_eq!(form.apply("salary=R 300 000"), Ok(FieldUpdate::Other));
        assert_eq!(form.apply("fund 1800000"), Ok(FieldUpdate::Fund));
        assert_eq!(form.apply("amount = 50,000"), Ok(FieldUpdate::Other));
        assert_eq!(form.apply("mode=lump-sum"), Ok(FieldUpdate::Other));

        let input = form.to_input(20.0, 10.0);
        assert_eq!(input.annual_salary, 300_000.0);
        assert_eq!(input.fund_value, 1_800_000.0);
        assert_eq!(input.withdrawal_amount, 50_000.0);
        assert_eq!(input.years_to_retirement, 20.0);
        assert_eq!(input.growth_rate, 0.1);
        assert_eq!(input.tax_mode, TaxMode::LumpSum);
    }

    #[test]
    fn apply_rejects_unknown_fields() {
        let mut form = WithdrawalForm::default();
        assert!(form.apply("colour=blue").is_err());
        assert!(form.apply("nonsense").is_err());
        assert!(form.apply("mode=flat").is_err());
    }

    #[test]
    fn render_surfaces_validation_messages() {
        let mut form = WithdrawalForm::default();
        form.apply("salary=300000").expect("field");
        form.apply("fund=900000").expect("field");
        form.apply("amount=35000").expect("field");
        let text = render(&form, &INCOME_TAX_2025_26, 20.0, 10.0);
        assert!(text.contains("maximum withdrawal is R 30000"), "{text}");

        form.apply("amount=30000").expect("field");
        let text = render(&form, &INCOME_TAX_2025_26, 20.0, 10.0);
        assert!(text.contains("Savings pot withdrawal"), "{text}");
    }

    #[test]
    fn render_reports_missing_fields() {
        let form = WithdrawalForm::default();
        let text = render(&form, &INCOME_TAX_2025_26, 20.0, 10.0);
        assert!(text.contains("please fill in annual salary"), "{text}");
    }
}
