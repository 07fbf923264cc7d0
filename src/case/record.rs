use chrono::{Local, NaiveDateTime};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

use super::CaseIdentifier;
use super::parser::StatusPage;

/// Sentinel reported when no known form code appears in the status text
pub const UNRECOGNIZED_CASE: &str = "Unrecognized Case";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Form code extracted from the status text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseType {
    /// Matched code such as `I-130`, `CR-1` or `IR-5`
    Known(String),
    Unrecognized,
}

impl CaseType {
    pub fn as_str(&self) -> &str {
        match self {
            CaseType::Known(code) => code,
            CaseType::Unrecognized => UNRECOGNIZED_CASE,
        }
    }

    /// Exact-match check against a user supplied type filter
    pub fn matches(&self, filter: &str) -> bool {
        self.as_str() == filter
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CaseType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One successful, filter-passing status query
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    pub id: CaseIdentifier,
    pub queried: NaiveDateTime,
    pub case_type: CaseType,
    pub status: String,
    pub received: Option<String>,
}

impl CaseRecord {
    /// Build a record stamped with the current local time
    pub fn new(id: CaseIdentifier, page: StatusPage) -> Self {
        Self::at(id, page, Local::now().naive_local())
    }

    /// Build a record with an explicit query timestamp
    pub fn at(id: CaseIdentifier, page: StatusPage, queried: NaiveDateTime) -> Self {
        Self {
            id,
            queried,
            case_type: page.case_type,
            status: page.status,
            received: page.received,
        }
    }

    /// ISO-8601 query timestamp with microseconds
    pub fn queried_iso(&self) -> String {
        self.queried.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Report entry body, keys in the order the report has always used
struct RecordFields<'a>(&'a CaseRecord);

impl Serialize for RecordFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.0;
        let mut state = serializer.serialize_struct("CaseRecord", 4)?;
        state.serialize_field("Queried", &record.queried_iso())?;
        state.serialize_field("Received", &record.received)?;
        state.serialize_field("Status", &record.status)?;
        state.serialize_field("Type", &record.case_type)?;
        state.end()
    }
}

// A record serializes as a single-entry map keyed by its identifier.
impl Serialize for CaseRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.id.as_str(), &RecordFields(self))?;
        map.end()
    }
}
