//! Derived metrics computed from extracted fields.
//!
//! Every function returns `None` when an input is missing or a
//! denominator is zero; no default is ever substituted.

use rust_decimal::Decimal;

use crate::models::fields::{CanonicalField::*, FieldSet};
use crate::models::metrics::{Ratio, RatioSet};

/// Decimal places kept in computed ratios.
pub const RATIO_SCALE: u32 = 6;

const DAYS_PER_YEAR: u32 = 365;

fn div(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator
        .checked_div(denominator)
        .map(|v| v.round_dp(RATIO_SCALE))
}

pub fn gross_margin(fields: &FieldSet) -> Option<Decimal> {
    let revenue = fields.get(Revenue)?;
    let cost = fields.get(OperatingCost)?;
    div(revenue.checked_sub(cost)?, revenue)
}

pub fn operating_margin(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(OperatingProfit)?, fields.get(Revenue)?)
}

pub fn net_margin(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(NetProfit)?, fields.get(Revenue)?)
}

/// Total liabilities over total assets.
pub fn asset_liability_ratio(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(TotalLiabilities)?, fields.get(TotalAssets)?)
}

pub fn current_ratio(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(CurrentAssets)?, fields.get(CurrentLiabilities)?)
}

pub fn quick_ratio(fields: &FieldSet) -> Option<Decimal> {
    let quick = fields.get(CurrentAssets)?.checked_sub(fields.get(Inventory)?)?;
    div(quick, fields.get(CurrentLiabilities)?)
}

/// Return on period-end equity.
pub fn roe(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(NetProfit)?, fields.get(TotalEquity)?)
}

pub fn roa(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(NetProfit)?, fields.get(TotalAssets)?)
}

/// Operating cash flow less capital expenditure.
///
/// Capex is reported with either sign, so its magnitude is subtracted.
/// Without a capex line the net investing cash flow stands in for it.
pub fn free_cash_flow(fields: &FieldSet) -> Option<Decimal> {
    let ocf = fields.get(OperatingCashFlow)?;
    match fields.get(CapitalExpenditure) {
        Some(capex) => ocf.checked_sub(capex.abs()),
        None => ocf.checked_add(fields.get(InvestingCashFlow)?),
    }
}

pub fn fcf_to_revenue(fields: &FieldSet) -> Option<Decimal> {
    div(free_cash_flow(fields)?, fields.get(Revenue)?)
}

pub fn ocf_to_net_profit(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(OperatingCashFlow)?, fields.get(NetProfit)?)
}

pub fn rd_ratio(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(RdExpense)?, fields.get(Revenue)?)
}

pub fn asset_turnover(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(Revenue)?, fields.get(TotalAssets)?)
}

pub fn inventory_turnover(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(OperatingCost)?, fields.get(Inventory)?)
}

pub fn receivable_turnover(fields: &FieldSet) -> Option<Decimal> {
    div(fields.get(Revenue)?, fields.get(AccountsReceivable)?)
}

fn days(balance: Decimal, flow: Decimal) -> Option<Decimal> {
    div(Decimal::from(DAYS_PER_YEAR).checked_mul(balance)?, flow)
}

/// Inventory days plus receivable days minus payable days.
pub fn cash_conversion_cycle(fields: &FieldSet) -> Option<Decimal> {
    let cost = fields.get(OperatingCost)?;
    let inventory_days = days(fields.get(Inventory)?, cost)?;
    let receivable_days = days(fields.get(AccountsReceivable)?, fields.get(Revenue)?)?;
    let payable_days = days(fields.get(AccountsPayable)?, cost)?;
    inventory_days
        .checked_add(receivable_days)?
        .checked_sub(payable_days)
}

/// Growth of `current` over `prior`, relative to the magnitude of `prior`.
pub fn growth(current: Decimal, prior: Decimal) -> Option<Decimal> {
    div(current.checked_sub(prior)?, prior.abs())
}

/// Computes every [`Ratio`] of a field set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioCalculator;

impl RatioCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Compute all ratios; growth rates need the prior-period fields.
    pub fn calculate(&self, fields: &FieldSet, prior: Option<&FieldSet>) -> RatioSet {
        let mut ratios = RatioSet::new();
        for ratio in Ratio::ALL {
            ratios.set(ratio, self.compute(ratio, fields, prior));
        }
        ratios
    }

    pub fn compute(&self, ratio: Ratio, fields: &FieldSet, prior: Option<&FieldSet>) -> Option<Decimal> {
        match ratio {
            Ratio::GrossMargin => gross_margin(fields),
            Ratio::OperatingMargin => operating_margin(fields),
            Ratio::NetMargin => net_margin(fields),
            Ratio::AssetLiabilityRatio => asset_liability_ratio(fields),
            Ratio::CurrentRatio => current_ratio(fields),
            Ratio::QuickRatio => quick_ratio(fields),
            Ratio::Roe => roe(fields),
            Ratio::Roa => roa(fields),
            Ratio::FreeCashFlow => free_cash_flow(fields),
            Ratio::FcfToRevenue => fcf_to_revenue(fields),
            Ratio::OcfToNetProfit => ocf_to_net_profit(fields),
            Ratio::RdRatio => rd_ratio(fields),
            Ratio::AssetTurnover => asset_turnover(fields),
            Ratio::InventoryTurnover => inventory_turnover(fields),
            Ratio::ReceivableTurnover => receivable_turnover(fields),
            Ratio::CashConversionCycle => cash_conversion_cycle(fields),
            Ratio::RevenueYoy => growth(fields.get(Revenue)?, prior?.get(Revenue)?),
            Ratio::NetProfitYoy => growth(fields.get(NetProfit)?, prior?.get(NetProfit)?),
        }
    }
}
