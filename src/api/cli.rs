use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

use super::format::{advice_report, annuity_report, format_currency, table_report, withdrawal_report};
use super::{AdviceResponse, AnnuityResponse, WithdrawalResponse, run_http_server, watch};
use crate::core::{
    ActiveTable, AdviceInput, AnnuityInput, BUILTIN_TABLES, DebtRate, EmergencyFund,
    INCOME_TAX_2025_26, RetirementHorizon, TaxMode, TaxTable, WithdrawalInput, WithdrawalReason,
    advise, compute_tax, marginal_rate, parse_number, run_annuity, run_withdrawal,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum CliTaxMode {
    Marginal,
    LumpSum,
}

impl From<CliTaxMode> for TaxMode {
    fn from(value: CliTaxMode) -> Self {
        match value {
            CliTaxMode::Marginal => TaxMode::Marginal,
            CliTaxMode::LumpSum => TaxMode::LumpSum,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum CliReason {
    Emergency,
    Debt,
    Expense,
    Investment,
}

impl From<CliReason> for WithdrawalReason {
    fn from(value: CliReason) -> Self {
        match value {
            CliReason::Emergency => WithdrawalReason::Emergency,
            CliReason::Debt => WithdrawalReason::Debt,
            CliReason::Expense => WithdrawalReason::Expense,
            CliReason::Investment => WithdrawalReason::Investment,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum CliEmergencyFund {
    Yes,
    #[value(name = "some")]
    Partial,
    No,
}

impl From<CliEmergencyFund> for EmergencyFund {
    fn from(value: CliEmergencyFund) -> Self {
        match value {
            CliEmergencyFund::Yes => EmergencyFund::Yes,
            CliEmergencyFund::Partial => EmergencyFund::Partial,
            CliEmergencyFund::No => EmergencyFund::No,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum CliDebtRate {
    High,
    Medium,
    Low,
    #[value(name = "none")]
    NotApplicable,
}

impl From<CliDebtRate> for DebtRate {
    fn from(value: CliDebtRate) -> Self {
        match value {
            CliDebtRate::High => DebtRate::High,
            CliDebtRate::Medium => DebtRate::Medium,
            CliDebtRate::Low => DebtRate::Low,
            CliDebtRate::NotApplicable => DebtRate::NotApplicable,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum CliHorizon {
    Far,
    Medium,
    Close,
}

impl From<CliHorizon> for RetirementHorizon {
    fn from(value: CliHorizon) -> Self {
        match value {
            CliHorizon::Far => RetirementHorizon::Far,
            CliHorizon::Medium => RetirementHorizon::Medium,
            CliHorizon::Close => RetirementHorizon::Close,
        }
    }
}

fn currency(raw: &str) -> Result<f64, String> {
    Ok(parse_number(raw))
}

#[derive(Parser, Debug)]
#[command(
    name = "twopot",
    about = "Two-pot retirement calculator: savings pot withdrawal tax, RA deduction headroom and withdrawal advice"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "2025/2026",
        help = "Built-in tax table to evaluate against"
    )]
    tax_year: String,
    #[arg(
        long,
        global = true,
        help = "JSON tax table file; overrides --tax-year"
    )]
    tax_table: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tax and opportunity cost of a savings pot withdrawal
    Withdraw(WithdrawArgs),
    /// Deduction headroom and tax saving of extra RA contributions
    Annuity(AnnuityArgs),
    /// Rule-based recommendation on whether to withdraw
    Advise(AdviseArgs),
    /// Tax on an income, or the active table when no income is given
    Tax(TaxArgs),
    /// Recalculate a withdrawal interactively as fields are typed on stdin
    Watch(WatchArgs),
    /// Serve the JSON API and web calculator
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct WithdrawArgs {
    #[arg(long, value_parser = currency, default_value = "0", help = "Annual salary, e.g. \"R 300 000\"")]
    pub(crate) salary: f64,
    #[arg(long, value_parser = currency, help = "Total retirement fund value")]
    pub(crate) fund: f64,
    #[arg(long, value_parser = currency, help = "Requested withdrawal")]
    pub(crate) amount: f64,
    #[arg(long, default_value_t = 20.0, help = "Years until retirement")]
    pub(crate) years: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Expected annual fund growth in percent"
    )]
    pub(crate) growth_rate: f64,
    #[arg(long, value_enum, default_value_t = CliTaxMode::Marginal)]
    pub(crate) tax_mode: CliTaxMode,
    #[arg(long, help = "Print JSON instead of a text report")]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct AnnuityArgs {
    #[arg(long, value_parser = currency, help = "Gross monthly salary")]
    pub(crate) monthly_salary: f64,
    #[arg(long, value_parser = currency, default_value = "0", help = "Current monthly RA contribution")]
    pub(crate) current: f64,
    #[arg(long, value_parser = currency, help = "Proposed additional monthly RA contribution")]
    pub(crate) extra: f64,
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct AdviseArgs {
    #[arg(long, value_enum)]
    pub(crate) reason: CliReason,
    #[arg(long, value_enum)]
    pub(crate) emergency_fund: CliEmergencyFund,
    #[arg(long, value_enum, default_value_t = CliDebtRate::NotApplicable)]
    pub(crate) debt_rate: CliDebtRate,
    #[arg(
        long,
        value_enum,
        help = "far: 20+ years, medium: 10-20 years, close: under 10 years"
    )]
    pub(crate) years_to_retirement: CliHorizon,
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Clone)]
struct TaxArgs {
    #[arg(long, value_parser = currency)]
    income: Option<f64>,
}

#[derive(Args, Debug, Clone)]
struct WatchArgs {
    #[arg(long, default_value_t = 300, help = "Idle delay before recalculating, in milliseconds")]
    delay_ms: u64,
    #[arg(long, default_value_t = 20.0)]
    years: f64,
    #[arg(long, default_value_t = 10.0, help = "Expected annual fund growth in percent")]
    growth_rate: f64,
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    #[arg(long, short, default_value_t = 8080)]
    port: u16,
}

pub(crate) fn build_withdrawal_input(args: &WithdrawArgs) -> Result<WithdrawalInput, String> {
    if !args.years.is_finite() || args.years < 0.0 {
        return Err("--years must be >= 0".to_string());
    }
    if !(0.0..=100.0).contains(&args.growth_rate) {
        return Err("--growth-rate must be between 0 and 100".to_string());
    }
    if args.salary < 0.0 || args.fund < 0.0 || args.amount < 0.0 {
        return Err("amounts must be >= 0".to_string());
    }

    Ok(WithdrawalInput {
        annual_salary: args.salary,
        fund_value: args.fund,
        withdrawal_amount: args.amount,
        years_to_retirement: args.years,
        growth_rate: args.growth_rate / 100.0,
        tax_mode: args.tax_mode.into(),
    })
}

pub(crate) fn build_annuity_input(args: &AnnuityArgs) -> Result<AnnuityInput, String> {
    if args.monthly_salary < 0.0 || args.current < 0.0 || args.extra < 0.0 {
        return Err("contributions and salary must be >= 0".to_string());
    }

    Ok(AnnuityInput {
        monthly_salary: args.monthly_salary,
        current_monthly: args.current,
        extra_monthly: args.extra,
    })
}

pub(crate) fn build_advice_input(args: &AdviseArgs) -> AdviceInput {
    AdviceInput {
        reason: args.reason.into(),
        emergency_fund: args.emergency_fund.into(),
        debt_rate: args.debt_rate.into(),
        horizon: args.years_to_retirement.into(),
    }
}

fn resolve_table(cli: &Cli) -> anyhow::Result<TaxTable> {
    if let Some(path) = &cli.tax_table {
        return TaxTable::load(path).with_context(|| format!("loading {}", path.display()));
    }
    match TaxTable::builtin(&cli.tax_year) {
        Some(table) => Ok(table.clone()),
        None => {
            let known: Vec<&str> = BUILTIN_TABLES.iter().map(|t| t.label.as_ref()).collect();
            anyhow::bail!(
                "unknown --tax-year {:?}; built-in tables: {}",
                cli.tax_year,
                known.join(", ")
            )
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let table = resolve_table(&cli)?;
    if table != INCOME_TAX_2025_26 {
        log::info!("using tax table {:?}", table.label);
    }

    match cli.command {
        Command::Withdraw(args) => {
            let input = build_withdrawal_input(&args).map_err(anyhow::Error::msg)?;
            let result = run_withdrawal(&input, &table)?;
            if args.json {
                let response = WithdrawalResponse::new(&table, result);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", withdrawal_report(&result, &table));
            }
        }
        Command::Annuity(args) => {
            let input = build_annuity_input(&args).map_err(anyhow::Error::msg)?;
            let result = run_annuity(&input, &table)?;
            if args.json {
                let response = AnnuityResponse::new(&table, result);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print!("{}", annuity_report(&result));
            }
        }
        Command::Advise(args) => {
            let advice = advise(&build_advice_input(&args));
            if args.json {
                println!("{}", serde_json::to_string_pretty(&AdviceResponse::from(advice))?);
            } else {
                print!("{}", advice_report(&advice));
            }
        }
        Command::Tax(args) => match args.income {
            Some(income) => {
                let tax = compute_tax(income, &table);
                println!("Income:         {}", format_currency(income));
                println!("Tax:            {}", format_currency(tax));
                println!(
                    "Effective rate: {:.2}%",
                    if income > 0.0 { tax / income * 100.0 } else { 0.0 }
                );
                println!("Marginal rate:  {:.2}%", marginal_rate(income, &table) * 100.0);
            }
            None => print!("{}", table_report(&table)),
        },
        Command::Watch(args) => {
            watch::run(
                Arc::new(table),
                Duration::from_millis(args.delay_ms),
                args.years,
                args.growth_rate,
            )
            .await?;
        }
        Command::Serve(args) => {
            run_http_server(args.port, ActiveTable::new(table)).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_withdraw_args() -> WithdrawArgs {
        WithdrawArgs {
            salary: 300_000.0,
            fund: 1_800_000.0,
            amount: 50_000.0,
            years: 20.0,
            growth_rate: 10.0,
            tax_mode: CliTaxMode::Marginal,
            json: false,
        }
    }

    #[test]
    fn cli_parses_currency_strings_and_percent_flags() {
        let cli = Cli::try_parse_from([
            "twopot",
            "withdraw",
            "--salary",
            "R 300 000",
            "--fund",
            "R1,800,000",
            "--amount",
            "50000",
            "--growth-rate",
            "8",
            "--tax-mode",
            "lump-sum",
        ])
        .expect("valid args");
        let Command::Withdraw(args) = cli.command else {
            panic!("expected withdraw command");
        };
        let input = build_withdrawal_input(&args).expect("valid input");
        assert_eq!(input.annual_salary, 300_000.0);
        assert_eq!(input.fund_value, 1_800_000.0);
        assert_eq!(input.withdrawal_amount, 50_000.0);
        assert!((input.growth_rate - 0.08).abs() < 1e-12);
        assert_eq!(input.tax_mode, TaxMode::LumpSum);
        assert_eq!(cli.tax_year, "2025/2026");
    }

    #[test]
    fn build_withdrawal_input_rejects_negative_years() {
        let mut args = sample_withdraw_args();
        args.years = -1.0;
        let err = build_withdrawal_input(&args).expect_err("must reject");
        assert!(err.contains("--years"));
    }

    #[test]
    fn build_withdrawal_input_rejects_growth_out_of_range() {
        let mut args = sample_withdraw_args();
        args.growth_rate = 150.0;
        let err = build_withdrawal_input(&args).expect_err("must reject");
        assert!(err.contains("--growth-rate"));
    }

    #[test]
    fn advise_args_map_to_core_enums() {
        let cli = Cli::try_parse_from([
            "twopot",
            "advise",
            "--reason",
            "emergency",
            "--emergency-fund",
            "no",
            "--years-to-retirement",
            "far",
        ])
        .expect("valid args");
        let Command::Advise(args) = cli.command else {
            panic!("expected advise command");
        };
        let input = build_advice_input(&args);
        assert_eq!(input.reason, WithdrawalReason::Emergency);
        assert_eq!(input.emergency_fund, EmergencyFund::No);
        assert_eq!(input.debt_rate, DebtRate::NotApplicable);
        assert_eq!(advise(&input).score, 2);
    }

    #[test]
    fn resolve_table_rejects_unknown_year() {
        let cli = Cli::try_parse_from(["twopot", "--tax-year", "1999", "tax"]).expect("valid args");
        let err = resolve_table(&cli).expect_err("unknown year");
        assert!(err.to_string().contains("2025/2026"));
    }

    #[test]
    fn resolve_table_selects_builtin_by_label() {
        let cli = Cli::try_parse_from(["twopot", "tax", "--tax-year", "2024/2025 lump sum"])
            .expect("valid args");
        let table = resolve_table(&cli).expect("known table");
        assert_eq!(table.label, "2024/2025 lump sum");
    }
}
