mod advice;
mod engine;
mod error;
mod input;
mod tables;
mod tax;
mod types;

pub use advice::{GENERAL_ALTERNATIVES, advise, classify, score};
pub use engine::{
    LimitDecision, MIN_WITHDRAWAL, RA_DEDUCTION_CAP, RA_DEDUCTION_RATE, WithdrawalLimit,
    future_value, max_withdrawal, run_annuity, run_withdrawal, savings_pot, validate_withdrawal,
};
pub use error::{CalcError, TableError};
pub use input::parse_number;
pub use tables::{ActiveTable, BUILTIN_TABLES, INCOME_TAX_2025_26, LUMP_SUM_2024_25, TaxTable};
pub use tax::{compute_tax, marginal_rate, withdrawal_tax, withdrawal_tax_for_mode};
pub use types::{
    Advice, AdviceInput, AnnuityInput, AnnuityResult, DebtRate, EmergencyFund, Recommendation,
    RetirementHorizon, TaxBracket, TaxMode, WithdrawalInput, WithdrawalReason, WithdrawalResult,
};
