//! Derived metric schema.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A secondary metric derived from extracted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ratio {
    GrossMargin,
    OperatingMargin,
    NetMargin,
    /// Total liabilities over total assets.
    AssetLiabilityRatio,
    CurrentRatio,
    QuickRatio,
    Roe,
    Roa,
    /// Operating cash flow net of capital expenditure (monetary, not a ratio).
    FreeCashFlow,
    FcfToRevenue,
    OcfToNetProfit,
    RdRatio,
    AssetTurnover,
    InventoryTurnover,
    ReceivableTurnover,
    /// In days.
    CashConversionCycle,
    RevenueYoy,
    NetProfitYoy,
}

impl Ratio {
    pub const ALL: [Ratio; 18] = [
        Self::GrossMargin,
        Self::OperatingMargin,
        Self::NetMargin,
        Self::AssetLiabilityRatio,
        Self::CurrentRatio,
        Self::QuickRatio,
        Self::Roe,
        Self::Roa,
        Self::FreeCashFlow,
        Self::FcfToRevenue,
        Self::OcfToNetProfit,
        Self::RdRatio,
        Self::AssetTurnover,
        Self::InventoryTurnover,
        Self::ReceivableTurnover,
        Self::CashConversionCycle,
        Self::RevenueYoy,
        Self::NetProfitYoy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ratio::GrossMargin => "gross_margin",
            Ratio::OperatingMargin => "operating_margin",
            Ratio::NetMargin => "net_margin",
            Ratio::AssetLiabilityRatio => "asset_liability_ratio",
            Ratio::CurrentRatio => "current_ratio",
            Ratio::QuickRatio => "quick_ratio",
            Ratio::Roe => "roe",
            Ratio::Roa => "roa",
            Ratio::FreeCashFlow => "free_cash_flow",
            Ratio::FcfToRevenue => "fcf_to_revenue",
            Ratio::OcfToNetProfit => "ocf_to_net_profit",
            Ratio::RdRatio => "rd_ratio",
            Ratio::AssetTurnover => "asset_turnover",
            Ratio::InventoryTurnover => "inventory_turnover",
            Ratio::ReceivableTurnover => "receivable_turnover",
            Ratio::CashConversionCycle => "cash_conversion_cycle",
            Ratio::RevenueYoy => "revenue_yoy",
            Ratio::NetProfitYoy => "net_profit_yoy",
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of every derived metric, `None` when it cannot be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Ratio, Option<Decimal>>")]
#[serde(into = "BTreeMap<Ratio, Option<Decimal>>")]
pub struct RatioSet {
    values: BTreeMap<Ratio, Option<Decimal>>,
}

impl RatioSet {
    pub fn new() -> Self {
        Self {
            values: Ratio::ALL.iter().map(|r| (*r, None)).collect(),
        }
    }

    pub fn get(&self, ratio: Ratio) -> Option<Decimal> {
        self.values.get(&ratio).copied().flatten()
    }

    pub fn set(&mut self, ratio: Ratio, value: Option<Decimal>) {
        self.values.insert(ratio, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ratio, Option<Decimal>)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

impl Default for RatioSet {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<Ratio, Option<Decimal>>> for RatioSet {
    fn from(partial: BTreeMap<Ratio, Option<Decimal>>) -> Self {
        let mut set = RatioSet::new();
        for (ratio, value) in partial {
            set.set(ratio, value);
        }
        set
    }
}

impl From<RatioSet> for BTreeMap<Ratio, Option<Decimal>> {
    fn from(set: RatioSet) -> Self {
        set.values
    }
}
