//! Statement classification of untagged tables by keyword scoring.

use lazy_static::lazy_static;
use tracing::trace;

use crate::models::document::CandidateTable;
use crate::models::fields::StatementType;

use super::rules::{NormalizedLabel, Phrase};

/// Title keywords count this many times more than row keywords.
const TITLE_WEIGHT: usize = 3;

const INCOME_TITLES: &[&str] = &[
    "income statement", "statement of operations", "statements of operations",
    "statement of earnings", "statements of income", "statement of income",
    "profit or loss", "利润表", "损益表",
];
const BALANCE_TITLES: &[&str] = &[
    "balance sheet", "balance sheets", "statement of financial position",
    "statements of financial position", "资产负债表",
];
const CASH_FLOW_TITLES: &[&str] = &[
    "cash flow", "cash flows", "statement of cash flows", "statements of cash flows", "现金流量表",
];

const INCOME_ROWS: &[&str] = &[
    "revenue", "revenues", "net sales", "net income", "operating income", "gross profit",
    "earnings per share", "营业收入", "净利润", "营业利润", "营业成本",
];
const BALANCE_ROWS: &[&str] = &[
    "total assets", "total liabilities", "stockholders equity", "shareholders equity",
    "current assets", "总资产", "资产总计", "流动资产", "负债合计", "股东权益", "所有者权益",
];
const CASH_FLOW_ROWS: &[&str] = &[
    "operating activities", "investing activities", "financing activities",
    "经营活动", "投资活动", "筹资活动",
];

struct Keywords {
    statement: StatementType,
    titles: Vec<Phrase>,
    rows: Vec<Phrase>,
}

fn phrases(words: &[&str]) -> Vec<Phrase> {
    words.iter().filter_map(|w| Phrase::parse(w)).collect()
}

lazy_static! {
    static ref KEYWORDS: [Keywords; 3] = [
        Keywords {
            statement: StatementType::Income,
            titles: phrases(INCOME_TITLES),
            rows: phrases(INCOME_ROWS),
        },
        Keywords {
            statement: StatementType::Balance,
            titles: phrases(BALANCE_TITLES),
            rows: phrases(BALANCE_ROWS),
        },
        Keywords {
            statement: StatementType::CashFlow,
            titles: phrases(CASH_FLOW_TITLES),
            rows: phrases(CASH_FLOW_ROWS),
        },
    ];
}

fn hits(keywords: &[Phrase], text: &NormalizedLabel) -> usize {
    keywords.iter().filter(|k| k.occurs_in(text)).count()
}

/// Guess which statement a table holds.
///
/// Returns `None` when no keyword occurs. Ties go to the income
/// statement, then the balance sheet.
pub fn classify_table(table: &CandidateTable) -> Option<StatementType> {
    let title = NormalizedLabel::new(&format!("{} {}", table.caption, table.preceding_text));
    let labels: Vec<NormalizedLabel> = table
        .rows
        .iter()
        .map(|row| NormalizedLabel::new(&row.label_text))
        .collect();

    let mut best: Option<(StatementType, usize)> = None;
    for keywords in KEYWORDS.iter() {
        let title_score = hits(&keywords.titles, &title) * TITLE_WEIGHT;
        let row_score = keywords
            .rows
            .iter()
            .filter(|k| labels.iter().any(|label| k.occurs_in(label)))
            .count();
        let score = title_score + row_score;
        trace!("Table {} scores {} for {}", table.id, score, keywords.statement);

        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((keywords.statement, score));
        }
    }

    best.map(|(statement, _)| statement)
}
