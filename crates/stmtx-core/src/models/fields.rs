//! Canonical field schema shared by every statement result.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The three standard financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    /// Income statement (statement of operations, 利润表).
    Income,
    /// Balance sheet (statement of financial position, 资产负债表).
    Balance,
    /// Cash flow statement (现金流量表).
    CashFlow,
}

impl StatementType {
    /// All statement types in canonical order.
    pub const ALL: [StatementType; 3] = [Self::Income, Self::Balance, Self::CashFlow];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::Income => "income",
            StatementType::Balance => "balance",
            StatementType::CashFlow => "cash_flow",
        }
    }

    /// Canonical fields that belong to this statement.
    pub fn fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        CanonicalField::ALL
            .iter()
            .copied()
            .filter(move |f| f.statement() == *self)
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized line item identifier, independent of source wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    // Income statement
    Revenue,
    OperatingCost,
    SellingExpense,
    AdminExpense,
    FinanceExpense,
    RdExpense,
    OperatingProfit,
    TotalProfit,
    TaxExpense,
    NetProfit,
    EpsBasic,
    EpsDiluted,

    // Balance sheet
    TotalAssets,
    CurrentAssets,
    NonCurrentAssets,
    CashAndEquivalents,
    AccountsReceivable,
    Inventory,
    FixedAssets,
    IntangibleAssets,
    Goodwill,
    TotalLiabilities,
    CurrentLiabilities,
    NonCurrentLiabilities,
    ShortTermBorrowing,
    LongTermBorrowing,
    AccountsPayable,
    TotalEquity,
    ShareCapital,
    RetainedEarnings,
    BookValuePerShare,

    // Cash flow statement
    OperatingCashFlow,
    InvestingCashFlow,
    FinancingCashFlow,
    NetCashFlow,
    CapitalExpenditure,
}

impl CanonicalField {
    /// Every field of the schema, in declaration order.
    pub const ALL: [CanonicalField; 36] = [
        Self::Revenue,
        Self::OperatingCost,
        Self::SellingExpense,
        Self::AdminExpense,
        Self::FinanceExpense,
        Self::RdExpense,
        Self::OperatingProfit,
        Self::TotalProfit,
        Self::TaxExpense,
        Self::NetProfit,
        Self::EpsBasic,
        Self::EpsDiluted,
        Self::TotalAssets,
        Self::CurrentAssets,
        Self::NonCurrentAssets,
        Self::CashAndEquivalents,
        Self::AccountsReceivable,
        Self::Inventory,
        Self::FixedAssets,
        Self::IntangibleAssets,
        Self::Goodwill,
        Self::TotalLiabilities,
        Self::CurrentLiabilities,
        Self::NonCurrentLiabilities,
        Self::ShortTermBorrowing,
        Self::LongTermBorrowing,
        Self::AccountsPayable,
        Self::TotalEquity,
        Self::ShareCapital,
        Self::RetainedEarnings,
        Self::BookValuePerShare,
        Self::OperatingCashFlow,
        Self::InvestingCashFlow,
        Self::FinancingCashFlow,
        Self::NetCashFlow,
        Self::CapitalExpenditure,
    ];

    /// Statement this field is reported on.
    pub fn statement(&self) -> StatementType {
        use CanonicalField::*;
        match self {
            Revenue | OperatingCost | SellingExpense | AdminExpense | FinanceExpense
            | RdExpense | OperatingProfit | TotalProfit | TaxExpense | NetProfit | EpsBasic
            | EpsDiluted => StatementType::Income,
            TotalAssets | CurrentAssets | NonCurrentAssets | CashAndEquivalents
            | AccountsReceivable | Inventory | FixedAssets | IntangibleAssets | Goodwill
            | TotalLiabilities | CurrentLiabilities | NonCurrentLiabilities
            | ShortTermBorrowing | LongTermBorrowing | AccountsPayable | TotalEquity
            | ShareCapital | RetainedEarnings | BookValuePerShare => StatementType::Balance,
            OperatingCashFlow | InvestingCashFlow | FinancingCashFlow | NetCashFlow
            | CapitalExpenditure => StatementType::CashFlow,
        }
    }

    /// Per-share figures are never scaled by the table unit.
    pub fn is_per_share(&self) -> bool {
        matches!(
            self,
            CanonicalField::EpsBasic | CanonicalField::EpsDiluted | CanonicalField::BookValuePerShare
        )
    }

    /// Multiplier to apply to a raw cell value of this field.
    pub fn effective_multiplier(&self, unit_multiplier: Decimal) -> Decimal {
        if self.is_per_share() {
            Decimal::ONE
        } else {
            unit_multiplier
        }
    }

    pub fn as_str(&self) -> &'static str {
        use CanonicalField::*;
        match self {
            Revenue => "revenue",
            OperatingCost => "operating_cost",
            SellingExpense => "selling_expense",
            AdminExpense => "admin_expense",
            FinanceExpense => "finance_expense",
            RdExpense => "rd_expense",
            OperatingProfit => "operating_profit",
            TotalProfit => "total_profit",
            TaxExpense => "tax_expense",
            NetProfit => "net_profit",
            EpsBasic => "eps_basic",
            EpsDiluted => "eps_diluted",
            TotalAssets => "total_assets",
            CurrentAssets => "current_assets",
            NonCurrentAssets => "non_current_assets",
            CashAndEquivalents => "cash_and_equivalents",
            AccountsReceivable => "accounts_receivable",
            Inventory => "inventory",
            FixedAssets => "fixed_assets",
            IntangibleAssets => "intangible_assets",
            Goodwill => "goodwill",
            TotalLiabilities => "total_liabilities",
            CurrentLiabilities => "current_liabilities",
            NonCurrentLiabilities => "non_current_liabilities",
            ShortTermBorrowing => "short_term_borrowing",
            LongTermBorrowing => "long_term_borrowing",
            AccountsPayable => "accounts_payable",
            TotalEquity => "total_equity",
            ShareCapital => "share_capital",
            RetainedEarnings => "retained_earnings",
            BookValuePerShare => "book_value_per_share",
            OperatingCashFlow => "operating_cash_flow",
            InvestingCashFlow => "investing_cash_flow",
            FinancingCashFlow => "financing_cash_flow",
            NetCashFlow => "net_cash_flow",
            CapitalExpenditure => "capital_expenditure",
        }
    }

    /// Parse a field from its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of every canonical field, `None` meaning "not found".
///
/// The map is complete by construction: every field of [`CanonicalField::ALL`]
/// has an entry, including after deserialization of partial input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<CanonicalField, Option<Decimal>>")]
#[serde(into = "BTreeMap<CanonicalField, Option<Decimal>>")]
pub struct FieldSet {
    values: BTreeMap<CanonicalField, Option<Decimal>>,
}

impl FieldSet {
    /// Create a set with every field unpopulated.
    pub fn new() -> Self {
        Self {
            values: CanonicalField::ALL.iter().map(|f| (*f, None)).collect(),
        }
    }

    /// Value of a field.
    pub fn get(&self, field: CanonicalField) -> Option<Decimal> {
        self.values.get(&field).copied().flatten()
    }

    pub fn is_present(&self, field: CanonicalField) -> bool {
        self.get(field).is_some()
    }

    /// Set a field value. Conflict arbitration happens in the resolver, not here.
    pub fn set(&mut self, field: CanonicalField, value: Option<Decimal>) {
        self.values.insert(field, value);
    }

    /// Builder-style setter, mostly useful for tests and synthetic sources.
    pub fn with(mut self, field: CanonicalField, value: Decimal) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Iterate over all fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, Option<Decimal>)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Number of populated fields among `fields`.
    pub fn count_present<I>(&self, fields: I) -> usize
    where
        I: IntoIterator<Item = CanonicalField>,
    {
        fields.into_iter().filter(|f| self.is_present(*f)).count()
    }

    /// Copy every populated field of `other` into this set.
    ///
    /// Fields of distinct statements never overlap, so merging the
    /// per-statement sets of one document is lossless.
    pub fn merge(&mut self, other: &FieldSet) {
        for (field, value) in other.iter() {
            if value.is_some() {
                self.set(field, value);
            }
        }
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<CanonicalField, Option<Decimal>>> for FieldSet {
    fn from(partial: BTreeMap<CanonicalField, Option<Decimal>>) -> Self {
        let mut set = FieldSet::new();
        for (field, value) in partial {
            set.set(field, value);
        }
        set
    }
}

impl From<FieldSet> for BTreeMap<CanonicalField, Option<Decimal>> {
    fn from(set: FieldSet) -> Self {
        set.values
    }
}
