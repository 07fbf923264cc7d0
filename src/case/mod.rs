//! Case identifiers, query windows and status records
//!
//! A receipt number such as `IOE0912345678` is split once at startup into a
//! [`CaseSeries`] (prefix + pad width) and a numeric offset. Every query then
//! builds its [`CaseIdentifier`] from the series and an integer counter.

use anyhow::Result;
use std::fmt;

pub mod parser;
pub mod record;

pub use parser::{ParseOutcome, StatusPage, StatusParser, Unparseable};
pub use record::{CaseRecord, CaseType, UNRECOGNIZED_CASE};

/// Length of the alphanumeric receipt prefix
pub const PREFIX_LEN: usize = 3;

/// Prefix and pad width shared by every identifier of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSeries {
    prefix: String,
    width: usize,
}

impl CaseSeries {
    /// Create a series from a prefix and the zero-pad width of the number
    pub fn new(prefix: impl Into<String>, width: usize) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.len() != PREFIX_LEN || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!(
                "Case prefix must be {} ASCII letters or digits, got '{}'",
                PREFIX_LEN,
                prefix
            );
        }
        Ok(Self { prefix, width })
    }

    /// Split a full case number into its series and numeric part
    ///
    /// ```
    /// use casepoll::case::CaseSeries;
    ///
    /// let (series, number) = CaseSeries::parse("IOE0912345678").unwrap();
    /// assert_eq!(series.prefix(), "IOE");
    /// assert_eq!(number, 912345678);
    /// assert_eq!(series.identifier(number + 1).to_string(), "IOE0912345679");
    /// ```
    pub fn parse(case_num: &str) -> Result<(Self, u64)> {
        let case_num = case_num.trim();
        if case_num.len() <= PREFIX_LEN || !case_num.is_char_boundary(PREFIX_LEN) {
            anyhow::bail!(
                "Case number '{}' must be a {}-character prefix followed by digits",
                case_num,
                PREFIX_LEN
            );
        }

        let (prefix, digits) = case_num.split_at(PREFIX_LEN);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("Case number '{}' has a non-numeric suffix '{}'", case_num, digits);
        }

        let number: u64 = digits
            .parse()
            .map_err(|e| anyhow::anyhow!("Case number '{}' is out of range: {}", case_num, e))?;

        let series = Self::new(prefix, digits.len())?;
        Ok((series, number))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build the identifier for one numeric offset
    pub fn identifier(&self, number: u64) -> CaseIdentifier {
        CaseIdentifier {
            number,
            text: format!("{}{:0width$}", self.prefix, number, width = self.width),
        }
    }
}

/// Full receipt number for one query
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseIdentifier {
    number: u64,
    text: String,
}

impl CaseIdentifier {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for CaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Half-open range of offsets swept around the supplied case number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: u64,
    pub end: u64,
}

impl QueryWindow {
    /// `[number - half_width, number + half_width)`, saturating at zero
    pub fn around(number: u64, half_width: u64) -> Self {
        Self {
            start: number.saturating_sub(half_width),
            end: number.saturating_add(half_width),
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
