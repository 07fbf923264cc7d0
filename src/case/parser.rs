//! Status page parser
//!
//! The status endpoint answers with an HTML page whose `div.rows.text-center`
//! blocks carry the interesting text. Once their text is concatenated and
//! split on newlines, line 1 is the status headline and line 2 the detail
//! sentence, e.g. `On January 5, 2021, we received your Form I-130, ...`.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use std::fmt;

use super::record::CaseType;

lazy_static! {
    static ref STATUS_ROWS: Selector =
        Selector::parse("div.rows.text-center").expect("status selector is valid");

    /// Form code patterns, highest priority first
    static ref CASE_TYPE_PATTERNS: [Regex; 3] = [
        Regex::new(r"[[:word:]]*I-[[:word:]]*").expect("I- pattern is valid"),
        Regex::new(r"[[:word:]]*CR-[[:word:]]*").expect("CR- pattern is valid"),
        Regex::new(r"[[:word:]]*IR-[[:word:]]*").expect("IR- pattern is valid"),
    ];
}

const STATUS_LINE: usize = 1;
const DETAILS_LINE: usize = 2;

/// Fields extracted from one status page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPage {
    pub status: String,
    pub case_type: CaseType,
    pub received: Option<String>,
}

/// Why a page could not be turned into a [`StatusPage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unparseable {
    /// No `div.rows.text-center` element in the page
    NoStatusRows,
    /// Fewer than three text lines
    MissingDetails,
    /// Detail line has no comma-separated date field
    MissingDateField,
}

impl fmt::Display for Unparseable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unparseable::NoStatusRows => write!(f, "no status block in response"),
            Unparseable::MissingDetails => write!(f, "status block has no detail line"),
            Unparseable::MissingDateField => write!(f, "detail line has no date field"),
        }
    }
}

impl std::error::Error for Unparseable {}

pub type ParseOutcome = Result<StatusPage, Unparseable>;

/// Stateless parser for status pages
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusParser;

impl StatusParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a full HTML response body
    pub fn parse(&self, html: &str) -> ParseOutcome {
        let document = Html::parse_document(html);

        let mut found = false;
        let mut text = String::new();
        for element in document.select(&STATUS_ROWS) {
            found = true;
            text.extend(element.text());
        }

        if !found {
            return Err(Unparseable::NoStatusRows);
        }

        self.parse_text(&text)
    }

    /// Parse the concatenated text of the status blocks
    pub fn parse_text(&self, text: &str) -> ParseOutcome {
        let lines: Vec<&str> = text.split('\n').collect();
        let details = *lines.get(DETAILS_LINE).ok_or(Unparseable::MissingDetails)?;
        let status = lines[STATUS_LINE];

        let fields: Vec<&str> = details.split(',').collect();
        if fields.len() < 2 {
            return Err(Unparseable::MissingDateField);
        }

        Ok(StatusPage {
            status: status.trim().to_string(),
            case_type: extract_case_type(details),
            received: extract_received_date(fields[0], fields[1]),
        })
    }
}

/// First matching form code in priority order, or the sentinel
pub fn extract_case_type(details: &str) -> CaseType {
    CASE_TYPE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(details))
        .map(|m| CaseType::Known(m.as_str().to_string()))
        .unwrap_or(CaseType::Unrecognized)
}

/// `<token> <token> <year>` from `"On January 5"` and `" 2021"`
///
/// The year is the second field minus its first character and must be all
/// digits, anything else means the date is unknown.
pub fn extract_received_date(date_field: &str, year_field: &str) -> Option<String> {
    let year: String = year_field.chars().skip(1).collect();
    if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let tokens: Vec<&str> = date_field.split(' ').collect();
    let tail = &tokens[tokens.len().saturating_sub(2)..];

    let mut parts: Vec<&str> = tail.to_vec();
    parts.push(&year);
    Some(parts.join(" "))
}
