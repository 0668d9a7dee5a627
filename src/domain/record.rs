// ============================================================
// Layer 3 - Records and Values
// ============================================================
// Typed rows flowing between the stages:
//
//   RawRecord      one row of the source CSV, as extracted
//   CleanedRecord  a RawRecord after imputation and scaling,
//                  plus the three encoded columns
//
// Every field is an Option. `None` means "no value in this
// row", whether the cell was empty or the column was absent
// from the batch entirely; column presence is tracked
// separately by `ColumnSet` (see column.rs).
//
// `Value` is the dynamically-typed cell used at the edges of
// the system: CSV cells, SQL parameters and query results.

use std::fmt;

use crate::domain::column::{Column, ColumnKind};

// ─── Value ────────────────────────────────────────────────────────────────────
/// A single dynamically-typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Parse a CSV cell according to the column's kind.
    /// Empty, `NA` and `NaN` cells, and cells that do not parse,
    /// become `Null`.
    pub fn parse(kind: ColumnKind, raw: &str) -> Value {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
            return Value::Null;
        }
        match kind {
            ColumnKind::Text => Value::Text(raw.to_string()),
            ColumnKind::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map_or(Value::Null, Value::Real),
            ColumnKind::Integer => match raw.parse::<i64>() {
                Ok(v) => Value::Integer(v),
                // whole numbers written as floats ("1.0")
                Err(_) => raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && v.fract() == 0.0)
                    .map_or(Value::Null, |v| Value::Integer(v as i64)),
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null       => Ok(()),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v)    => write!(f, "{v}"),
            Value::Text(s)    => f.write_str(s),
        }
    }
}

// ─── Row ──────────────────────────────────────────────────────────────────────
/// Column-addressed access to a typed record.
/// Lets the CSV reader/writer and the loader treat raw and
/// cleaned rows uniformly.
pub trait Row: Default {
    /// Value of `column` in this row (`Null` if the row has no such field)
    fn get(&self, column: Column) -> Value;

    /// Set `column` from a value; mismatched value types are ignored
    fn set(&mut self, column: Column, value: Value);
}

// ─── RawRecord ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub year:                  Option<i64>,
    pub gender:                Option<String>,
    pub age:                   Option<f64>,
    pub location:              Option<String>,
    pub race_african_american: Option<i64>,
    pub race_asian:            Option<i64>,
    pub race_caucasian:        Option<i64>,
    pub race_hispanic:         Option<i64>,
    pub race_other:            Option<i64>,
    pub hypertension:          Option<i64>,
    pub heart_disease:         Option<i64>,
    pub smoking_history:       Option<String>,
    pub bmi:                   Option<f64>,
    pub hba1c_level:           Option<f64>,
    pub blood_glucose_level:   Option<f64>,
    pub diabetes:              Option<i64>,
}

impl RawRecord {
    /// Mutable handle on an integer field
    pub fn integer_mut(&mut self, column: Column) -> Option<&mut Option<i64>> {
        Some(match column {
            Column::Year                => &mut self.year,
            Column::RaceAfricanAmerican => &mut self.race_african_american,
            Column::RaceAsian           => &mut self.race_asian,
            Column::RaceCaucasian       => &mut self.race_caucasian,
            Column::RaceHispanic        => &mut self.race_hispanic,
            Column::RaceOther           => &mut self.race_other,
            Column::Hypertension        => &mut self.hypertension,
            Column::HeartDisease        => &mut self.heart_disease,
            Column::Diabetes            => &mut self.diabetes,
            _ => return None,
        })
    }

    /// Mutable handle on a float field
    pub fn float_mut(&mut self, column: Column) -> Option<&mut Option<f64>> {
        Some(match column {
            Column::Age               => &mut self.age,
            Column::Bmi               => &mut self.bmi,
            Column::HbA1cLevel        => &mut self.hba1c_level,
            Column::BloodGlucoseLevel => &mut self.blood_glucose_level,
            _ => return None,
        })
    }

    /// Mutable handle on a text field
    pub fn text_mut(&mut self, column: Column) -> Option<&mut Option<String>> {
        Some(match column {
            Column::Gender         => &mut self.gender,
            Column::Location       => &mut self.location,
            Column::SmokingHistory => &mut self.smoking_history,
            _ => return None,
        })
    }
}

impl Row for RawRecord {
    fn get(&self, column: Column) -> Value {
        let int = |v: Option<i64>| v.map_or(Value::Null, Value::Integer);
        let real = |v: Option<f64>| v.map_or(Value::Null, Value::Real);
        let text = |v: &Option<String>| v.clone().map_or(Value::Null, Value::Text);
        match column {
            Column::Year                => int(self.year),
            Column::Gender              => text(&self.gender),
            Column::Age                 => real(self.age),
            Column::Location            => text(&self.location),
            Column::RaceAfricanAmerican => int(self.race_african_american),
            Column::RaceAsian           => int(self.race_asian),
            Column::RaceCaucasian       => int(self.race_caucasian),
            Column::RaceHispanic        => int(self.race_hispanic),
            Column::RaceOther           => int(self.race_other),
            Column::Hypertension        => int(self.hypertension),
            Column::HeartDisease        => int(self.heart_disease),
            Column::SmokingHistory      => text(&self.smoking_history),
            Column::Bmi                 => real(self.bmi),
            Column::HbA1cLevel          => real(self.hba1c_level),
            Column::BloodGlucoseLevel   => real(self.blood_glucose_level),
            Column::Diabetes            => int(self.diabetes),
            Column::GenderEncoded | Column::SmokingEncoded | Column::LocationEncoded => Value::Null,
        }
    }

    fn set(&mut self, column: Column, value: Value) {
        if let Some(slot) = self.integer_mut(column) {
            *slot = match value {
                Value::Integer(v) => Some(v),
                _ => None,
            };
        } else if let Some(slot) = self.float_mut(column) {
            *slot = value.as_f64();
        } else if let Some(slot) = self.text_mut(column) {
            *slot = match value {
                Value::Text(s) => Some(s),
                _ => None,
            };
        }
    }
}

// ─── CleanedRecord ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedRecord {
    /// Source fields after imputation and scaling
    pub base:             RawRecord,
    pub gender_encoded:   Option<i64>,
    pub smoking_encoded:  Option<i64>,
    pub location_encoded: Option<i64>,
}

impl From<RawRecord> for CleanedRecord {
    fn from(base: RawRecord) -> Self {
        Self { base, ..Default::default() }
    }
}

impl Row for CleanedRecord {
    fn get(&self, column: Column) -> Value {
        let int = |v: Option<i64>| v.map_or(Value::Null, Value::Integer);
        match column {
            Column::GenderEncoded   => int(self.gender_encoded),
            Column::SmokingEncoded  => int(self.smoking_encoded),
            Column::LocationEncoded => int(self.location_encoded),
            other => self.base.get(other),
        }
    }

    fn set(&mut self, column: Column, value: Value) {
        let int = match value {
            Value::Integer(v) => Some(v),
            _ => None,
        };
        match column {
            Column::GenderEncoded   => self.gender_encoded = int,
            Column::SmokingEncoded  => self.smoking_encoded = int,
            Column::LocationEncoded => self.location_encoded = int,
            other => self.base.set(other, value),
        }
    }
}

// ─── Categorical vocabularies ─────────────────────────────────────────────────
/// Label used by the source data for "smoking history not recorded"
pub const SMOKING_SENTINEL: &str = "No Info";

/// Smoking history, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SmokingStatus {
    Never,
    NoInfo,
    Former,
    NotCurrent,
    Ever,
    Current,
}

impl SmokingStatus {
    /// Parse a source label. Anything unrecognised, including the
    /// alternative spelling "unknown", maps to the sentinel.
    pub fn from_label(label: &str) -> SmokingStatus {
        match label.trim() {
            "never"       => SmokingStatus::Never,
            "former"      => SmokingStatus::Former,
            "not current" => SmokingStatus::NotCurrent,
            "ever"        => SmokingStatus::Ever,
            "current"     => SmokingStatus::Current,
            _             => SmokingStatus::NoInfo,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SmokingStatus::Never      => "never",
            SmokingStatus::NoInfo     => SMOKING_SENTINEL,
            SmokingStatus::Former     => "former",
            SmokingStatus::NotCurrent => "not current",
            SmokingStatus::Ever       => "ever",
            SmokingStatus::Current    => "current",
        }
    }

    /// Ordinal code: never=0, sentinel=1, former/not current/ever=2, current=3
    pub fn ordinal(self) -> i64 {
        match self {
            SmokingStatus::Never      => 0,
            SmokingStatus::NoInfo     => 1,
            SmokingStatus::Former
            | SmokingStatus::NotCurrent
            | SmokingStatus::Ever     => 2,
            SmokingStatus::Current    => 3,
        }
    }

    pub fn is_known(self) -> bool {
        self != SmokingStatus::NoInfo
    }
}

/// Binary gender code; anything else is explicitly undefined
pub fn gender_code(label: &str) -> Option<i64> {
    match label.trim() {
        "Male"   => Some(1),
        "Female" => Some(0),
        _        => None,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cells() {
        assert_eq!(Value::parse(ColumnKind::Integer, "1.0"), Value::Integer(1));
        assert_eq!(Value::parse(ColumnKind::Integer, "1.5"), Value::Null);
        assert_eq!(Value::parse(ColumnKind::Float, "25.19"), Value::Real(25.19));
        assert_eq!(Value::parse(ColumnKind::Float, ""), Value::Null);
        assert_eq!(Value::parse(ColumnKind::Float, "NaN"), Value::Null);
        assert_eq!(Value::parse(ColumnKind::Text, " Female "), Value::Text("Female".into()));
    }

    #[test]
    fn test_row_get_set_roundtrip() {
        let mut row = CleanedRecord::default();
        row.set(Column::RaceAsian, Value::Integer(1));
        row.set(Column::Bmi, Value::Real(27.3));
        row.set(Column::Gender, Value::Text("Male".into()));
        row.set(Column::SmokingEncoded, Value::Integer(3));

        assert_eq!(row.get(Column::RaceAsian), Value::Integer(1));
        assert_eq!(row.get(Column::Bmi), Value::Real(27.3));
        assert_eq!(row.get(Column::Gender), Value::Text("Male".into()));
        assert_eq!(row.get(Column::SmokingEncoded), Value::Integer(3));
        assert!(row.get(Column::Year).is_null());
    }

    #[test]
    fn test_smoking_ordinals() {
        assert_eq!(SmokingStatus::from_label("never").ordinal(), 0);
        assert_eq!(SmokingStatus::from_label("No Info").ordinal(), 1);
        assert_eq!(SmokingStatus::from_label("unknown"), SmokingStatus::NoInfo);
        assert_eq!(SmokingStatus::from_label("former").ordinal(), 2);
        assert_eq!(SmokingStatus::from_label("not current").ordinal(), 2);
        assert_eq!(SmokingStatus::from_label("ever").ordinal(), 2);
        assert_eq!(SmokingStatus::from_label("current").ordinal(), 3);
    }

    #[test]
    fn test_gender_code_is_explicit_about_unmapped() {
        assert_eq!(gender_code("Male"), Some(1));
        assert_eq!(gender_code("Female"), Some(0));
        assert_eq!(gender_code("Other"), None);
    }
}
