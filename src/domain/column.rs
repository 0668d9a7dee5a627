// ============================================================
// Layer 3 - Column Catalogue
// ============================================================
// Every column the pipeline knows about, in canonical order.
//
// The dataset arrives as loosely-typed CSV, so the first thing
// we do is map each header onto a `Column`. From then on every
// stage talks about columns by enum, never by string, and the
// set of columns actually present in a batch travels with the
// rows as a `ColumnSet`.
//
// Three names exist per column:
//   header()   - the name in the CSV files (e.g. "race:Asian")
//   sql_name() - the normalised destination name ("race_asian")
//   kind()     - the value type (integer, float, text)

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::error::PipelineError;

/// Value type of a column, used for parsing and for the SQL schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

/// A known column of the diabetes dataset.
/// Declaration order is the canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Year,
    Gender,
    Age,
    Location,
    RaceAfricanAmerican,
    RaceAsian,
    RaceCaucasian,
    RaceHispanic,
    RaceOther,
    Hypertension,
    HeartDisease,
    SmokingHistory,
    Bmi,
    HbA1cLevel,
    BloodGlucoseLevel,
    Diabetes,
    GenderEncoded,
    SmokingEncoded,
    LocationEncoded,
}

impl Column {
    /// Columns of the raw source dataset
    pub const RAW: [Column; 16] = [
        Column::Year,
        Column::Gender,
        Column::Age,
        Column::Location,
        Column::RaceAfricanAmerican,
        Column::RaceAsian,
        Column::RaceCaucasian,
        Column::RaceHispanic,
        Column::RaceOther,
        Column::Hypertension,
        Column::HeartDisease,
        Column::SmokingHistory,
        Column::Bmi,
        Column::HbA1cLevel,
        Column::BloodGlucoseLevel,
        Column::Diabetes,
    ];

    /// Columns derived by the cleaner's encoding step
    pub const DERIVED: [Column; 3] = [
        Column::GenderEncoded,
        Column::SmokingEncoded,
        Column::LocationEncoded,
    ];

    /// Numeric columns standardised by the cleaner, in scaler order
    pub const SCALED: [Column; 4] = [
        Column::Age,
        Column::Bmi,
        Column::HbA1cLevel,
        Column::BloodGlucoseLevel,
    ];

    /// All 19 columns of the cleaned dataset
    pub fn all() -> impl Iterator<Item = Column> {
        Self::RAW.into_iter().chain(Self::DERIVED)
    }

    /// Name as it appears in the CSV header
    pub fn header(self) -> &'static str {
        match self {
            Column::Year                => "year",
            Column::Gender              => "gender",
            Column::Age                 => "age",
            Column::Location            => "location",
            Column::RaceAfricanAmerican => "race:AfricanAmerican",
            Column::RaceAsian           => "race:Asian",
            Column::RaceCaucasian       => "race:Caucasian",
            Column::RaceHispanic        => "race:Hispanic",
            Column::RaceOther           => "race:Other",
            Column::Hypertension        => "hypertension",
            Column::HeartDisease        => "heart_disease",
            Column::SmokingHistory      => "smoking_history",
            Column::Bmi                 => "bmi",
            Column::HbA1cLevel          => "hbA1c_level",
            Column::BloodGlucoseLevel   => "blood_glucose_level",
            Column::Diabetes            => "diabetes",
            Column::GenderEncoded       => "gender_encoded",
            Column::SmokingEncoded      => "smoking_encoded",
            Column::LocationEncoded     => "location_encoded",
        }
    }

    /// Look up a column by its CSV header name
    pub fn from_header(name: &str) -> Option<Column> {
        Self::all().find(|c| c.header() == name.trim())
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::Gender | Column::Location | Column::SmokingHistory => ColumnKind::Text,
            Column::Age
            | Column::Bmi
            | Column::HbA1cLevel
            | Column::BloodGlucoseLevel => ColumnKind::Float,
            _ => ColumnKind::Integer,
        }
    }

    /// Normalised name used in the relational store
    pub fn sql_name(self) -> String {
        normalize_column_name(self.header())
    }

    /// SQL type of the destination column
    pub fn sql_type(self) -> &'static str {
        match self {
            Column::Gender         => "VARCHAR(10)",
            Column::Location       => "VARCHAR(50)",
            Column::SmokingHistory => "VARCHAR(20)",
            c if c.kind() == ColumnKind::Float => "FLOAT",
            _ => "INTEGER",
        }
    }

    pub fn is_numeric(self) -> bool {
        self.kind() != ColumnKind::Text
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Normalise a CSV header into a destination column name.
///
/// `:` and any other non-alphanumeric character become `_`, the
/// CamelCase part after a `:` is split into words, and the whole
/// name is lower-cased:
///   "race:AfricanAmerican" → "race_african_american"
///   "hbA1c_level"          → "hba1c_level"
pub fn normalize_column_name(header: &str) -> String {
    let (prefix, suffix) = match header.split_once(':') {
        Some((p, s)) => (p, Some(s)),
        None => (header, None),
    };

    let mut out = sanitize(prefix);
    if let Some(suffix) = suffix {
        out.push('_');
        let mut prev_lower = false;
        for c in suffix.chars() {
            if c.is_uppercase() && prev_lower {
                out.push('_');
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
        out = sanitize(&out);
    }
    out.to_lowercase()
}

/// Accept `name` only if it is a plain SQL identifier
/// (ASCII letters, digits and `_`, not starting with a digit).
/// Table and column names are spliced into SQL text, so anything
/// else is refused.
pub fn checked_identifier(name: &str) -> Result<&str, PipelineError> {
    let ok = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if !ok {
        return Err(PipelineError::Schema(format!("'{name}' is not a valid SQL identifier")));
    }
    Ok(name)
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

// ─── ColumnSet ────────────────────────────────────────────────────────────────
/// The columns present in one batch, kept in canonical order.
/// This is how schema tolerance is made explicit: a step whose
/// source column is not in the set is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet(BTreeSet<Column>);

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, column: Column) -> bool {
        self.0.contains(&column)
    }

    pub fn insert(&mut self, column: Column) {
        self.0.insert(column);
    }

    pub fn iter(&self) -> impl Iterator<Item = Column> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the requested columns that are present, in request order
    pub fn filter_present(&self, wanted: &[Column]) -> Vec<Column> {
        wanted.iter().copied().filter(|c| self.contains(*c)).collect()
    }
}

impl FromIterator<Column> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
