use std::fmt::Write as _;

use serde::Serialize;

use crate::core::{Advice, AnnuityResult, TaxTable, WithdrawalResult};

/// `R 1 234 567`, rounded to whole rand. Empty for non-finite values.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("R -{grouped}")
    } else {
        format!("R {grouped}")
    }
}

/// Formats a value already expressed in percent, e.g. `26.0` -> `26.00%`.
pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    format!("{value:.2}%")
}

fn rate_percent(rate: f64) -> String {
    format_percent(rate * 100.0)
}

pub fn max_withdrawal_helper(max_withdrawal: f64) -> String {
    format!("Maximum you can withdraw: {}", format_currency(max_withdrawal))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalDisplay {
    pub gross_withdrawal: String,
    pub tax: String,
    pub net_amount: String,
    pub effective_tax_rate: String,
    pub marginal_tax_rate: String,
    pub future_value: String,
    pub headline: String,
    pub notes: Vec<String>,
}

pub fn withdrawal_display(result: &WithdrawalResult) -> WithdrawalDisplay {
    let notes = vec![
        format!(
            "Your savings pot is {} (1/3 of total fund)",
            format_currency(result.savings_pot)
        ),
        format!(
            "Maximum annual withdrawal: {} (10% of savings pot)",
            format_currency(result.max_withdrawal)
        ),
        format!(
            "Remaining in savings pot: {}",
            format_currency(result.remaining_savings_pot)
        ),
        format!(
            "Left invested for {} years at {}, this withdrawal would grow to {}",
            result.years_to_retirement,
            rate_percent(result.growth_rate),
            format_currency(result.future_value)
        ),
        "This withdrawal reduces your retirement savings permanently".to_string(),
    ];

    WithdrawalDisplay {
        gross_withdrawal: format_currency(result.gross_withdrawal),
        tax: format!("-{}", format_currency(result.tax)),
        net_amount: format_currency(result.net_amount),
        effective_tax_rate: rate_percent(result.effective_tax_rate),
        marginal_tax_rate: rate_percent(result.marginal_tax_rate),
        future_value: format_currency(result.future_value),
        headline: format!(
            "{} after {} tax",
            format_currency(result.net_amount),
            rate_percent(result.effective_tax_rate)
        ),
        notes,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnuityDisplay {
    pub max_deductible: String,
    pub headroom: String,
    pub annual_tax_saving: String,
    pub monthly_tax_saving: String,
    pub net_monthly_cost: String,
    pub marginal_tax_rate: String,
    pub warning: Option<String>,
}

pub fn annuity_display(result: &AnnuityResult) -> AnnuityDisplay {
    AnnuityDisplay {
        max_deductible: format_currency(result.max_deductible),
        headroom: format_currency(result.headroom),
        annual_tax_saving: format_currency(result.annual_tax_saving),
        monthly_tax_saving: format_currency(result.monthly_tax_saving),
        net_monthly_cost: format_currency(result.net_monthly_cost),
        marginal_tax_rate: rate_percent(result.marginal_tax_rate),
        warning: result.excess_monthly.map(|excess| {
            format!(
                "Your extra contribution exceeds your deduction headroom by {} per month",
                format_currency(excess)
            )
        }),
    }
}

pub fn withdrawal_report(result: &WithdrawalResult, table: &TaxTable) -> String {
    let display = withdrawal_display(result);
    let mut out = String::new();
    let _ = writeln!(out, "Savings pot withdrawal ({} tax table)", table.label);
    let _ = writeln!(out, "  Withdrawal:     {:>14}", display.gross_withdrawal);
    let _ = writeln!(out, "  Tax:            {:>14}", display.tax);
    let _ = writeln!(out, "  You receive:    {:>14}", display.net_amount);
    let _ = writeln!(out, "  Effective rate: {:>14}", display.effective_tax_rate);
    let _ = writeln!(out, "  Marginal rate:  {:>14}", display.marginal_tax_rate);
    let _ = writeln!(out, "  Foregone value: {:>14}", display.future_value);
    out.push('\n');
    for note in &display.notes {
        let _ = writeln!(out, "  - {note}");
    }
    out
}

pub fn annuity_report(result: &AnnuityResult) -> String {
    let display = annuity_display(result);
    let mut out = String::new();
    let _ = writeln!(out, "Retirement annuity deduction");
    let _ = writeln!(out, "  Max deductible / year: {:>14}", display.max_deductible);
    let _ = writeln!(out, "  Headroom / year:       {:>14}", display.headroom);
    let _ = writeln!(out, "  Tax saving / year:     {:>14}", display.annual_tax_saving);
    let _ = writeln!(out, "  Tax saving / month:    {:>14}", display.monthly_tax_saving);
    let _ = writeln!(out, "  Net cost / month:      {:>14}", display.net_monthly_cost);
    let _ = writeln!(out, "  Marginal rate:         {:>14}", display.marginal_tax_rate);
    if let Some(warning) = display.warning {
        let _ = writeln!(out, "\n  ! {warning}");
    }
    out
}

pub fn advice_report(advice: &Advice) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (score {})", advice.label, advice.score);
    let _ = writeln!(out, "{}", advice.summary);
    let _ = writeln!(out, "\nKey considerations:");
    for reason in &advice.reasons {
        let _ = writeln!(out, "  - {reason}");
    }
    let _ = writeln!(out, "\nAlternatives to consider:");
    for alternative in &advice.alternatives {
        let _ = writeln!(out, "  - {alternative}");
    }
    out
}

pub fn table_report(table: &TaxTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tax table {}", table.label);
    for bracket in table.brackets.iter() {
        let upper = match bracket.upper_bound {
            Some(upper) => format_currency(upper),
            None => "and above".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:>14} - {:<14} {:>7}  base {}",
            format_currency(bracket.lower_bound),
            upper,
            rate_percent(bracket.rate),
            format_currency(bracket.base_tax)
        );
    }
    out
}
