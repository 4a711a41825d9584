//! Common regex patterns for label normalization, numbers and unit notices.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Hyphen-like characters that should read as a plain hyphen inside words
    pub static ref HYPHENS: Regex = Regex::new(
        r"[\u{2010}\u{2011}\u{2012}\u{2013}\u{2212}]"
    ).unwrap();

    // Apostrophes are dropped so "stockholders' equity" reads "stockholders equity"
    pub static ref APOSTROPHES: Regex = Regex::new(
        r"['\u{2019}\u{2018}`]"
    ).unwrap();

    // Anything that is not part of a word token
    pub static ref NON_WORD: Regex = Regex::new(
        r"[^\p{Alphabetic}\p{Nd}&\-]+"
    ).unwrap();

    pub static ref CJK: Regex = Regex::new(
        r"[\p{Han}]"
    ).unwrap();

    // Currency symbols and codes tolerated around amounts
    pub static ref CURRENCY: Regex = Regex::new(
        r"(?i)US\$|HK\$|RMB|USD|HKD|CNY|EUR|GBP|[\$¥￥€£元]"
    ).unwrap();

    pub static ref NUMBER_SHAPE: Regex = Regex::new(
        r"^(?:\d+(?:\.\d+)?|\.\d+)$"
    ).unwrap();

    // Unit notices: "(In millions, except per share data)", "$ in thousands"
    pub static ref UNIT_EN: Regex = Regex::new(
        r"(?i)\bin\s+(thousands|millions|billions)\b"
    ).unwrap();

    // "(Dollars in 000s)", "US$'000"
    pub static ref UNIT_EN_ZEROS: Regex = Regex::new(
        r"(?i)(?:\$|usd|us\$|hk\$|rmb)\s*['\u{2019}]?000s?\b|\bin\s+000s\b"
    ).unwrap();

    // "单位：人民币万元", "金额单位：千元"
    pub static ref UNIT_ZH: Regex = Regex::new(
        r"单位\s*[:：]?\s*(?:人民币)?\s*(百万元|千元|万元|亿元|元)"
    ).unwrap();

    pub static ref UNIT_ZH_CURRENCY: Regex = Regex::new(
        r"人民币\s*(百万元|千元|万元|亿元)"
    ).unwrap();
}
