//! Built-in label dictionaries.
//!
//! Each entry is `(pattern, field, excluded terms)`. Priority is derived
//! from the pattern when the table is built, so declaration order here
//! carries no meaning.

use crate::models::fields::CanonicalField::{self, *};

use super::{Dictionary, RuleSpec};

type Entry = (&'static str, CanonicalField, &'static [&'static str]);

const REVENUE_EXCLUDED: &[&str] = &[
    "cost", "costs", "deferred", "unearned", "per share", "growth", "expense", "expenses",
];
const PROFIT_EXCLUDED: &[&str] = &[
    "per share", "per", "margin", "comprehensive", "noncontrolling", "non-controlling",
    "minority", "before",
];
const EPS_BASIC_EXCLUDED: &[&str] = &["diluted", "weighted"];
const EPS_DILUTED_EXCLUDED: &[&str] = &["basic", "weighted"];
const CURRENT_EXCLUDED: &[&str] = &["non-current", "noncurrent", "other", "prepaid"];
const NON_CURRENT_EXCLUDED: &[&str] = &["other"];
const LIABILITIES_EXCLUDED: &[&str] = &[
    "current", "non-current", "noncurrent", "equity", "deficit", "other",
];
const EQUITY_EXCLUDED: &[&str] = &["liabilities", "per share", "other", "statement", "statements"];
const OPERATING_EXCLUDED: &[&str] = &["other", "before", "non-operating", "nonoperating", "margin"];
const TAX_EXCLUDED: &[&str] = &["before", "deferred", "payable", "receivable", "net of"];
const CASH_FLOW_EXCLUDED: &[&str] = &["other", "adjustments", "changes in", "discontinued"];
const NONE: &[&str] = &[];

const ENGLISH: &[Entry] = &[
    // Income statement
    ("revenue", Revenue, REVENUE_EXCLUDED),
    ("revenues", Revenue, REVENUE_EXCLUDED),
    ("total revenue", Revenue, REVENUE_EXCLUDED),
    ("total revenues", Revenue, REVENUE_EXCLUDED),
    ("net revenue", Revenue, REVENUE_EXCLUDED),
    ("net revenues", Revenue, REVENUE_EXCLUDED),
    ("total net revenue", Revenue, REVENUE_EXCLUDED),
    ("total net revenues", Revenue, REVENUE_EXCLUDED),
    ("net sales", Revenue, REVENUE_EXCLUDED),
    ("total net sales", Revenue, REVENUE_EXCLUDED),
    ("operating revenues", Revenue, REVENUE_EXCLUDED),
    ("cost of revenue", OperatingCost, NONE),
    ("cost of revenues", OperatingCost, NONE),
    ("total cost of revenue", OperatingCost, NONE),
    ("total cost of revenues", OperatingCost, NONE),
    ("cost of sales", OperatingCost, NONE),
    ("total cost of sales", OperatingCost, NONE),
    ("cost of goods sold", OperatingCost, NONE),
    ("cost of products sold", OperatingCost, NONE),
    ("cogs", OperatingCost, NONE),
    ("selling general and administrative", SellingExpense, NONE),
    ("sales and marketing", SellingExpense, NONE),
    ("selling and marketing", SellingExpense, NONE),
    ("selling expenses", SellingExpense, NONE),
    ("general and administrative", AdminExpense, &["selling"]),
    ("administrative expenses", AdminExpense, &["selling"]),
    ("interest expense", FinanceExpense, &["income"]),
    ("finance costs", FinanceExpense, NONE),
    ("finance expense", FinanceExpense, NONE),
    ("finance expenses", FinanceExpense, NONE),
    ("research and development", RdExpense, NONE),
    ("r&d", RdExpense, NONE),
    ("operating income", OperatingProfit, OPERATING_EXCLUDED),
    ("income from operations", OperatingProfit, OPERATING_EXCLUDED),
    ("operating profit", OperatingProfit, OPERATING_EXCLUDED),
    ("profit from operations", OperatingProfit, OPERATING_EXCLUDED),
    ("income before income taxes", TotalProfit, &["per share"]),
    ("income before taxes", TotalProfit, &["per share"]),
    ("income before provision for income taxes", TotalProfit, &["per share"]),
    ("earnings before income taxes", TotalProfit, &["per share"]),
    ("profit before tax", TotalProfit, &["per share"]),
    ("pretax income", TotalProfit, &["per share"]),
    ("provision for income taxes", TaxExpense, TAX_EXCLUDED),
    ("income tax expense", TaxExpense, TAX_EXCLUDED),
    ("income taxes", TaxExpense, TAX_EXCLUDED),
    ("income tax", TaxExpense, TAX_EXCLUDED),
    ("tax expense", TaxExpense, TAX_EXCLUDED),
    ("net income", NetProfit, PROFIT_EXCLUDED),
    ("net earnings", NetProfit, PROFIT_EXCLUDED),
    ("net profit", NetProfit, PROFIT_EXCLUDED),
    ("net loss", NetProfit, PROFIT_EXCLUDED),
    ("net income attributable to", NetProfit, &["per share", "noncontrolling", "non-controlling"]),
    ("basic and diluted earnings per share", EpsBasic, NONE),
    ("earnings per share", EpsBasic, EPS_BASIC_EXCLUDED),
    ("basic earnings per share", EpsBasic, EPS_BASIC_EXCLUDED),
    ("earnings per share basic", EpsBasic, EPS_BASIC_EXCLUDED),
    ("basic net income per share", EpsBasic, EPS_BASIC_EXCLUDED),
    ("net income per share basic", EpsBasic, EPS_BASIC_EXCLUDED),
    ("diluted earnings per share", EpsDiluted, EPS_DILUTED_EXCLUDED),
    ("earnings per share diluted", EpsDiluted, EPS_DILUTED_EXCLUDED),
    ("diluted net income per share", EpsDiluted, EPS_DILUTED_EXCLUDED),
    ("net income per share diluted", EpsDiluted, EPS_DILUTED_EXCLUDED),
    // Balance sheet
    ("total assets", TotalAssets, NONE),
    ("current assets", CurrentAssets, CURRENT_EXCLUDED),
    ("total current assets", CurrentAssets, CURRENT_EXCLUDED),
    ("non-current assets", NonCurrentAssets, NON_CURRENT_EXCLUDED),
    ("noncurrent assets", NonCurrentAssets, NON_CURRENT_EXCLUDED),
    ("total non-current assets", NonCurrentAssets, NON_CURRENT_EXCLUDED),
    ("total noncurrent assets", NonCurrentAssets, NON_CURRENT_EXCLUDED),
    ("total long-term assets", NonCurrentAssets, NON_CURRENT_EXCLUDED),
    ("cash and cash equivalents", CashAndEquivalents, &["restricted", "end of", "beginning of"]),
    ("cash and equivalents", CashAndEquivalents, &["restricted", "end of", "beginning of"]),
    ("accounts receivable", AccountsReceivable, &["non-current", "noncurrent"]),
    ("trade receivables", AccountsReceivable, &["non-current", "noncurrent"]),
    ("trade and other receivables", AccountsReceivable, &["non-current", "noncurrent"]),
    ("inventory", Inventory, NONE),
    ("inventories", Inventory, NONE),
    ("property plant and equipment", FixedAssets, &["gross", "accumulated"]),
    ("property and equipment", FixedAssets, &["gross", "accumulated"]),
    ("fixed assets", FixedAssets, NONE),
    ("intangible assets", IntangibleAssets, &["goodwill"]),
    ("goodwill", Goodwill, &["intangible"]),
    ("total liabilities", TotalLiabilities, LIABILITIES_EXCLUDED),
    ("current liabilities", CurrentLiabilities, CURRENT_EXCLUDED),
    ("total current liabilities", CurrentLiabilities, CURRENT_EXCLUDED),
    ("non-current liabilities", NonCurrentLiabilities, NON_CURRENT_EXCLUDED),
    ("noncurrent liabilities", NonCurrentLiabilities, NON_CURRENT_EXCLUDED),
    ("total non-current liabilities", NonCurrentLiabilities, NON_CURRENT_EXCLUDED),
    ("total noncurrent liabilities", NonCurrentLiabilities, NON_CURRENT_EXCLUDED),
    ("total long-term liabilities", NonCurrentLiabilities, NON_CURRENT_EXCLUDED),
    ("short-term debt", ShortTermBorrowing, NONE),
    ("short-term borrowings", ShortTermBorrowing, NONE),
    ("commercial paper", ShortTermBorrowing, NONE),
    ("current portion of long-term debt", ShortTermBorrowing, NONE),
    ("long-term debt", LongTermBorrowing, &["current portion"]),
    ("long-term borrowings", LongTermBorrowing, &["current portion"]),
    ("accounts payable", AccountsPayable, NONE),
    ("trade payables", AccountsPayable, NONE),
    ("trade and other payables", AccountsPayable, NONE),
    ("total equity", TotalEquity, EQUITY_EXCLUDED),
    ("stockholders equity", TotalEquity, EQUITY_EXCLUDED),
    ("shareholders equity", TotalEquity, EQUITY_EXCLUDED),
    ("total stockholders equity", TotalEquity, EQUITY_EXCLUDED),
    ("total shareholders equity", TotalEquity, EQUITY_EXCLUDED),
    ("common stock", ShareCapital, &["repurchase", "repurchased", "treasury", "issuance", "dividends"]),
    ("share capital", ShareCapital, NONE),
    ("retained earnings", RetainedEarnings, NONE),
    ("accumulated deficit", RetainedEarnings, NONE),
    ("book value per share", BookValuePerShare, NONE),
    ("net assets per share", BookValuePerShare, NONE),
    // Cash flow statement
    ("operating activities", OperatingCashFlow, CASH_FLOW_EXCLUDED),
    ("net cash provided by operating activities", OperatingCashFlow, CASH_FLOW_EXCLUDED),
    ("net cash from operating activities", OperatingCashFlow, CASH_FLOW_EXCLUDED),
    ("cash generated by operating activities", OperatingCashFlow, CASH_FLOW_EXCLUDED),
    ("investing activities", InvestingCashFlow, CASH_FLOW_EXCLUDED),
    ("net cash used in investing activities", InvestingCashFlow, CASH_FLOW_EXCLUDED),
    ("net cash from investing activities", InvestingCashFlow, CASH_FLOW_EXCLUDED),
    ("financing activities", FinancingCashFlow, CASH_FLOW_EXCLUDED),
    ("net cash used in financing activities", FinancingCashFlow, CASH_FLOW_EXCLUDED),
    ("net cash from financing activities", FinancingCashFlow, CASH_FLOW_EXCLUDED),
    ("net increase in cash", NetCashFlow, NONE),
    ("net decrease in cash", NetCashFlow, NONE),
    ("net change in cash", NetCashFlow, NONE),
    ("increase decrease in cash", NetCashFlow, NONE),
    ("capital expenditures", CapitalExpenditure, NONE),
    ("purchases of property plant and equipment", CapitalExpenditure, NONE),
    ("purchases of property and equipment", CapitalExpenditure, NONE),
    ("payments for acquisition of property plant and equipment", CapitalExpenditure, NONE),
];

const CHINESE: &[Entry] = &[
    // 利润表
    ("营业收入", Revenue, &["成本"]),
    ("营业总收入", Revenue, NONE),
    ("营业成本", OperatingCost, NONE),
    ("营业总成本", OperatingCost, NONE),
    ("销售费用", SellingExpense, NONE),
    ("管理费用", AdminExpense, NONE),
    ("财务费用", FinanceExpense, NONE),
    ("研发费用", RdExpense, NONE),
    ("营业利润", OperatingProfit, NONE),
    ("利润总额", TotalProfit, NONE),
    ("净利润", NetProfit, &["扣除", "少数股东", "每股"]),
    ("归属于母公司所有者的净利润", NetProfit, &["扣除"]),
    ("所得税费用", TaxExpense, NONE),
    ("基本每股收益", EpsBasic, NONE),
    ("稀释每股收益", EpsDiluted, NONE),
    // 资产负债表
    ("资产总计", TotalAssets, NONE),
    ("总资产", TotalAssets, NONE),
    ("流动资产合计", CurrentAssets, &["非流动", "其他"]),
    ("流动资产", CurrentAssets, &["非流动", "其他"]),
    ("非流动资产合计", NonCurrentAssets, &["其他"]),
    ("非流动资产", NonCurrentAssets, &["其他"]),
    ("货币资金", CashAndEquivalents, NONE),
    ("应收账款", AccountsReceivable, NONE),
    ("存货", Inventory, NONE),
    ("固定资产", FixedAssets, &["清理"]),
    ("无形资产", IntangibleAssets, NONE),
    ("商誉", Goodwill, NONE),
    ("负债合计", TotalLiabilities, &["权益", "流动"]),
    ("总负债", TotalLiabilities, &["权益"]),
    ("流动负债合计", CurrentLiabilities, &["非流动", "其他"]),
    ("流动负债", CurrentLiabilities, &["非流动", "其他"]),
    ("非流动负债合计", NonCurrentLiabilities, &["其他"]),
    ("非流动负债", NonCurrentLiabilities, &["其他"]),
    ("短期借款", ShortTermBorrowing, NONE),
    ("长期借款", LongTermBorrowing, &["一年内到期"]),
    ("应付账款", AccountsPayable, NONE),
    ("股东权益合计", TotalEquity, &["负债"]),
    ("所有者权益合计", TotalEquity, &["负债"]),
    ("股本", ShareCapital, NONE),
    ("实收资本", ShareCapital, NONE),
    ("未分配利润", RetainedEarnings, NONE),
    ("每股净资产", BookValuePerShare, NONE),
    // 现金流量表
    ("经营活动产生的现金流量净额", OperatingCashFlow, NONE),
    ("经营活动现金流量净额", OperatingCashFlow, NONE),
    ("投资活动产生的现金流量净额", InvestingCashFlow, NONE),
    ("投资活动现金流量净额", InvestingCashFlow, NONE),
    ("筹资活动产生的现金流量净额", FinancingCashFlow, NONE),
    ("筹资活动现金流量净额", FinancingCashFlow, NONE),
    ("现金及现金等价物净增加额", NetCashFlow, NONE),
    ("购建固定资产、无形资产和其他长期资产支付的现金", CapitalExpenditure, NONE),
];

fn to_specs(entries: &[Entry]) -> impl Iterator<Item = RuleSpec> + '_ {
    entries.iter().map(|(pattern, field, excluded)| {
        RuleSpec::new(*pattern, *field).excluding(excluded.iter().copied())
    })
}

/// Rule specs of a built-in dictionary.
pub fn specs(dictionary: Dictionary) -> Vec<RuleSpec> {
    match dictionary {
        Dictionary::English => to_specs(ENGLISH).collect(),
        Dictionary::Chinese => to_specs(CHINESE).collect(),
        Dictionary::Bilingual => to_specs(ENGLISH).chain(to_specs(CHINESE)).collect(),
    }
}
