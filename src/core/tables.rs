use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::error::TableError;
use super::types::TaxBracket;

/// A progressive schedule for one tax year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxTable {
    pub label: Cow<'static, str>,
    pub brackets: Cow<'static, [TaxBracket]>,
}

/// SARS individual income tax, 2025/2026 year of assessment.
pub static INCOME_TAX_2025_26: TaxTable = TaxTable {
    label: Cow::Borrowed("2025/2026"),
    brackets: Cow::Borrowed(&[
        TaxBracket::new(0.0, Some(237_100.0), 0.18, 0.0),
        TaxBracket::new(237_101.0, Some(370_500.0), 0.26, 42_678.0),
        TaxBracket::new(370_501.0, Some(512_800.0), 0.31, 77_362.0),
        TaxBracket::new(512_801.0, Some(673_000.0), 0.36, 121_475.0),
        TaxBracket::new(673_001.0, Some(857_900.0), 0.39, 179_147.0),
        TaxBracket::new(857_901.0, Some(1_817_000.0), 0.41, 251_258.0),
        TaxBracket::new(1_817_001.0, None, 0.45, 644_489.0),
    ]),
};

/// Retirement lump-sum withdrawal table used before withdrawals were taxed at
/// the marginal rate.
pub static LUMP_SUM_2024_25: TaxTable = TaxTable {
    label: Cow::Borrowed("2024/2025 lump sum"),
    brackets: Cow::Borrowed(&[
        TaxBracket::new(0.0, Some(27_500.0), 0.0, 0.0),
        TaxBracket::new(27_501.0, Some(726_000.0), 0.18, 0.0),
        TaxBracket::new(726_001.0, Some(1_089_000.0), 0.27, 125_730.0),
        TaxBracket::new(1_089_001.0, Some(1_577_000.0), 0.36, 223_740.0),
        TaxBracket::new(1_577_001.0, None, 0.45, 399_420.0),
    ]),
};

pub static BUILTIN_TABLES: [&TaxTable; 2] = [&INCOME_TAX_2025_26, &LUMP_SUM_2024_25];

impl TaxTable {
    pub fn builtin(label: &str) -> Option<&'static TaxTable> {
        let wanted = label.trim();
        BUILTIN_TABLES
            .into_iter()
            .find(|table| table.label.eq_ignore_ascii_case(wanted))
    }

    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let table: TaxTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let json = fs::read_to_string(path)?;
        let table = Self::from_json(&json)?;
        log::info!(
            "loaded tax table {:?} ({} brackets) from {}",
            table.label,
            table.brackets.len(),
            path.display()
        );
        Ok(table)
    }

    /// Checks the bracket invariants every evaluator relies on.
    pub fn validate(&self) -> Result<(), TableError> {
        let invalid = |reason: String| TableError::Invalid {
            label: self.label.to_string(),
            reason,
        };

        let Some(first) = self.brackets.first() else {
            return Err(invalid("at least one bracket is required".to_string()));
        };
        if first.lower_bound != 0.0 {
            return Err(invalid("first bracket must start at 0".to_string()));
        }

        let last_index = self.brackets.len() - 1;
        for (i, bracket) in self.brackets.iter().enumerate() {
            if !(0.0..=1.0).contains(&bracket.rate) {
                return Err(invalid(format!("bracket {i}: rate must be between 0 and 1")));
            }
            if !bracket.base_tax.is_finite() || bracket.base_tax < 0.0 {
                return Err(invalid(format!("bracket {i}: base tax must be >= 0")));
            }
            match (bracket.upper_bound, i == last_index) {
                (Some(_), true) => {
                    return Err(invalid("last bracket must be unbounded".to_string()));
                }
                (None, false) => {
                    return Err(invalid(format!(
                        "bracket {i}: only the last bracket may be unbounded"
                    )));
                }
                (Some(upper), false) => {
                    if !upper.is_finite() || upper < bracket.lower_bound {
                        return Err(invalid(format!(
                            "bracket {i}: upper bound must be >= lower bound"
                        )));
                    }
                    let next = &self.brackets[i + 1];
                    if next.lower_bound != upper + 1.0 {
                        return Err(invalid(format!(
                            "bracket {}: lower bound must be {}",
                            i + 1,
                            upper + 1.0
                        )));
                    }
                }
                (None, true) => {}
            }
        }

        Ok(())
    }
}

/// The table the HTTP server evaluates against. Readers take a snapshot;
/// `replace` swaps the whole table at once.
#[derive(Debug, Clone)]
pub struct ActiveTable {
    inner: Arc<RwLock<Arc<TaxTable>>>,
}

impl ActiveTable {
    pub fn new(table: TaxTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    pub fn current(&self) -> Arc<TaxTable> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace(&self, table: TaxTable) -> Result<Arc<TaxTable>, TableError> {
        table.validate()?;
        let table = Arc::new(table);
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, Arc::clone(&table));
        log::info!(
            "active tax table swapped: {:?} -> {:?}",
            previous.label,
            table.label
        );
        Ok(table)
    }
}
