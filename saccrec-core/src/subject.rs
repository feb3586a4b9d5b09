//! Subject metadata and its validated decoding.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SubjectError;

pub const DATE_FORMAT: &str = "%d/%m/%Y";

const FULL_NAME_FIELD: &str = "full_name";
const GENRE_FIELD: &str = "genre";
const BIRTH_DATE_FIELD: &str = "borndate";
const STATUS_FIELD: &str = "status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Genre {
    #[default]
    Unknown,
    Male,
    Female,
}

impl FromStr for Genre {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unknown" => Ok(Genre::Unknown),
            "Male" => Ok(Genre::Male),
            "Female" => Ok(Genre::Female),
            other => Err(SubjectError::UnknownGenre(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SubjectStatus {
    #[default]
    Unknown,
    Control,
    Presymptomatic,
    #[serde(rename = "SCA2")]
    Sca2,
}

impl FromStr for SubjectStatus {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unknown" => Ok(SubjectStatus::Unknown),
            "Control" => Ok(SubjectStatus::Control),
            "Presymptomatic" => Ok(SubjectStatus::Presymptomatic),
            "SCA2" => Ok(SubjectStatus::Sca2),
            other => Err(SubjectError::UnknownStatus(other.to_string())),
        }
    }
}

/// Person undergoing the saccadic tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub full_name: String,
    pub genre: Genre,
    #[serde(rename = "borndate", with = "day_month_year")]
    pub birth_date: NaiveDate,
    pub status: SubjectStatus,
}

impl Subject {
    /// Decodes a subject from its JSON form, reporting every malformed or
    /// missing field instead of silently defaulting it.
    pub fn decode(value: &Value) -> Result<Self, SubjectError> {
        let object = value.as_object().ok_or(SubjectError::NotAnObject)?;

        let full_name = required_str(object, FULL_NAME_FIELD)?.to_string();
        let genre = required_str(object, GENRE_FIELD)?.parse()?;
        let status = required_str(object, STATUS_FIELD)?.parse()?;
        let birth_date = parse_birth_date(required_str(object, BIRTH_DATE_FIELD)?)?;

        Ok(Self {
            full_name,
            genre,
            birth_date,
            status,
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, SubjectError> {
        let value: Value = serde_json::from_str(text)?;
        Self::decode(&value)
    }
}

fn required_str<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, SubjectError> {
    object
        .get(field)
        .ok_or(SubjectError::MissingField(field))?
        .as_str()
        .ok_or(SubjectError::WrongType { field })
}

fn parse_birth_date(value: &str) -> Result<NaiveDate, SubjectError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| SubjectError::BirthDate {
        value: value.to_string(),
        source,
    })
}

/// `DD/MM/YYYY` dates.
mod day_month_year {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_birth_date(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject() -> Subject {
        Subject {
            full_name: "Ana Pérez".into(),
            genre: Genre::Female,
            birth_date: NaiveDate::from_ymd_opt(1984, 3, 7).unwrap(),
            status: SubjectStatus::Sca2,
        }
    }

    #[test]
    fn encodes_canonical_strings() {
        let value = serde_json::to_value(subject()).unwrap();
        assert_eq!(value["borndate"], "07/03/1984");
        assert_eq!(value["status"], "SCA2");
        assert_eq!(value["genre"], "Female");
        assert_eq!(Subject::decode(&value).unwrap(), subject());
        assert_eq!(serde_json::from_value::<Subject>(value).unwrap(), subject());
    }

    #[test]
    fn derived_form_rejects_bad_dates() {
        let value = json!({
            "full_name": "X",
            "genre": "Male",
            "borndate": "31/02/1990",
            "status": "Unknown",
        });
        assert!(serde_json::from_value::<Subject>(value).is_err());
    }

    #[test]
    fn reports_missing_fields() {
        let err = Subject::decode(&json!({ "full_name": "X", "genre": "Male", "status": "Control" }))
            .unwrap_err();
        assert!(matches!(err, SubjectError::MissingField("borndate")));
    }

    #[test]
    fn reports_bad_values() {
        let base = json!({
            "full_name": "X",
            "genre": "Male",
            "borndate": "1984-03-07",
            "status": "Control",
        });
        assert!(matches!(
            Subject::decode(&base),
            Err(SubjectError::BirthDate { .. })
        ));

        let mut bad_genre = base.clone();
        bad_genre["borndate"] = json!("07/03/1984");
        bad_genre["genre"] = json!("Other");
        assert!(matches!(
            Subject::decode(&bad_genre),
            Err(SubjectError::UnknownGenre(g)) if g == "Other"
        ));

        let mut bad_type = base;
        bad_type["full_name"] = json!(42);
        assert!(matches!(
            Subject::decode(&bad_type),
            Err(SubjectError::WrongType { field: "full_name" })
        ));

        assert!(matches!(Subject::decode(&json!([])), Err(SubjectError::NotAnObject)));
    }
}
