use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBracket {
    pub lower_bound: f64,
    /// `None` marks the open-ended top bracket.
    pub upper_bound: Option<f64>,
    pub rate: f64,
    /// Tax owed at `lower_bound` under the full schedule.
    pub base_tax: f64,
}

impl TaxBracket {
    pub const fn new(lower_bound: f64, upper_bound: Option<f64>, rate: f64, base_tax: f64) -> Self {
        Self {
            lower_bound,
            upper_bound,
            rate,
            base_tax,
        }
    }

    pub fn upper(&self) -> f64 {
        self.upper_bound.unwrap_or(f64::INFINITY)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TaxMode {
    /// Withdrawal is stacked on top of salary and taxed at the marginal slice.
    #[default]
    Marginal,
    /// Withdrawal is taxed on its own against the lump-sum table.
    LumpSum,
}

#[derive(Debug, Clone)]
pub struct WithdrawalInput {
    pub annual_salary: f64,
    pub fund_value: f64,
    pub withdrawal_amount: f64,
    pub years_to_retirement: f64,
    pub growth_rate: f64,
    pub tax_mode: TaxMode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResult {
    pub gross_withdrawal: f64,
    pub tax: f64,
    pub net_amount: f64,
    pub effective_tax_rate: f64,
    pub marginal_tax_rate: f64,
    pub savings_pot: f64,
    pub max_withdrawal: f64,
    pub remaining_savings_pot: f64,
    pub years_to_retirement: f64,
    pub growth_rate: f64,
    pub future_value: f64,
    pub foregone_growth: f64,
}

#[derive(Debug, Clone)]
pub struct AnnuityInput {
    pub monthly_salary: f64,
    pub current_monthly: f64,
    pub extra_monthly: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnuityResult {
    pub annual_salary: f64,
    pub max_deductible: f64,
    pub current_annual: f64,
    pub extra_annual: f64,
    pub headroom: f64,
    pub deductible_extra: f64,
    pub marginal_tax_rate: f64,
    pub annual_tax_saving: f64,
    pub monthly_tax_saving: f64,
    /// Costed on the full extra contribution, not on `deductible_extra`.
    pub net_monthly_cost: f64,
    /// Monthly amount above the remaining headroom, when the extra exceeds it.
    pub excess_monthly: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithdrawalReason {
    Emergency,
    Debt,
    #[serde(alias = "large-expense")]
    Expense,
    Investment,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmergencyFund {
    Yes,
    #[serde(rename = "some")]
    Partial,
    No,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebtRate {
    High,
    Medium,
    Low,
    #[serde(rename = "none", alias = "na")]
    NotApplicable,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetirementHorizon {
    /// 20 or more years away.
    Far,
    Medium,
    /// Less than 10 years away.
    Close,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AdviceInput {
    pub reason: WithdrawalReason,
    pub emergency_fund: EmergencyFund,
    pub debt_rate: DebtRate,
    pub horizon: RetirementHorizon,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    ConsiderWithdrawing,
    ProceedWithCaution,
    AvoidIfPossible,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub score: i32,
    pub recommendation: Recommendation,
    pub label: &'static str,
    pub color: &'static str,
    pub summary: &'static str,
    pub reasons: Vec<&'static str>,
    pub alternatives: Vec<&'static str>,
}
