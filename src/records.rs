//! Decoding raw candidate rows into records, with a skip report for unusable ones

use crate::types::{CandidateDisplay, CandidateRecord, SkipReason, SkippedCandidate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashSet;

/// Placeholder the profile export writes for absent values
const MISSING_SENTINEL: &str = "N/A";

/// Wire shape of a candidate row.
///
/// Accepts both the canonical field names and the column names of the profile
/// export. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(default, deserialize_with = "lenient_text", alias = "Skills")]
    skills: String,
    #[serde(default, deserialize_with = "lenient_text", alias = "job title", alias = "Job Title")]
    job_title: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        alias = "Past Job Titles",
        alias = "past_job_titles_str"
    )]
    past_job_titles: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        alias = "Experience",
        alias = "experience_str"
    )]
    experience: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        alias = "experience level",
        alias = "level"
    )]
    experience_level: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        alias = "Education",
        alias = "education_str"
    )]
    education: String,
    #[serde(default, deserialize_with = "lenient_text", alias = "Location")]
    location: String,
    #[serde(default, deserialize_with = "lenient_list", alias = "Certifications")]
    certifications: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    name: String,
    #[serde(default, deserialize_with = "lenient_text", alias = "link to profile")]
    profile_url: String,
    #[serde(default, deserialize_with = "lenient_text", alias = "profile image URL")]
    image_url: String,
    #[serde(default)]
    display: Option<CandidateDisplay>,
}

fn clean_text(value: Value) -> String {
    match value {
        Value::String(s) if s.trim() == MISSING_SENTINEL => String::new(),
        Value::String(s) => s,
        _ => String::new(),
    }
}

/// Strings pass through; anything else (numbers, null, objects) is absent
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(clean_text(Value::deserialize(deserializer)?))
}

/// An array of strings, or one delimited string as written by the export
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(clean_text).collect(),
        Value::String(s) if s.trim() == MISSING_SENTINEL => Vec::new(),
        Value::String(s) => s.split(';').map(|p| p.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    Ok(items.into_iter().filter(|s: &String| !s.trim().is_empty()).collect())
}

fn extract_id(row: &serde_json::Map<String, Value>) -> Option<String> {
    let raw = ["id", "urn id", "urn_id"].iter().find_map(|k| row.get(*k))?;
    match raw {
        Value::String(s) if !s.trim().is_empty() && s.trim() != MISSING_SENTINEL => {
            Some(s.trim().to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_non_empty(flat: String, nested: &str) -> String {
    if flat.is_empty() {
        nested.to_string()
    } else {
        flat
    }
}

/// Decode one row; `Err` carries the reason it must be skipped
pub fn parse_candidate(value: Value) -> Result<CandidateRecord, SkipReason> {
    let Value::Object(mut row) = value else {
        return Err(SkipReason::NotAnObject);
    };

    let id = extract_id(&row).ok_or(SkipReason::MissingIdentifier)?;
    for key in ["id", "urn id", "urn_id"] {
        row.remove(key);
    }

    let raw: RawCandidate = serde_json::from_value(Value::Object(row))
        .map_err(|e| SkipReason::Malformed(e.to_string()))?;

    let nested = raw.display.unwrap_or_default();
    let display = CandidateDisplay {
        name: first_non_empty(raw.name, &nested.name),
        profile_url: first_non_empty(raw.profile_url, &nested.profile_url),
        image_url: first_non_empty(raw.image_url, &nested.image_url),
    };

    Ok(CandidateRecord {
        id,
        skills: raw.skills,
        job_title: raw.job_title,
        past_job_titles: raw.past_job_titles,
        experience: raw.experience,
        experience_level: raw.experience_level,
        education: raw.education,
        location: raw.location,
        certifications: raw.certifications,
        display,
    })
}

/// Decode a batch, keeping input order. Unusable rows go to the skip report.
pub fn parse_candidates(rows: Vec<Value>) -> (Vec<(usize, CandidateRecord)>, Vec<SkippedCandidate>) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        let id = row.as_object().and_then(extract_id);
        match parse_candidate(row) {
            Ok(record) => records.push((index, record)),
            Err(reason) => skipped.push(SkippedCandidate { index, id, reason }),
        }
    }

    (records, skipped)
}

/// Keep the first record per identifier; later duplicates are reported, not merged.
///
/// Records whose identifier is blank are skipped as missing, whichever way they
/// were decoded.
pub fn dedupe_candidates(
    records: Vec<(usize, CandidateRecord)>,
) -> (Vec<CandidateRecord>, Vec<SkippedCandidate>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, record) in records {
        let id = record.id.trim();
        if id.is_empty() || id == MISSING_SENTINEL {
            skipped.push(SkippedCandidate {
                index,
                id: None,
                reason: SkipReason::MissingIdentifier,
            });
        } else if seen.insert(record.id.clone()) {
            unique.push(record);
        } else {
            skipped.push(SkippedCandidate {
                index,
                id: Some(record.id),
                reason: SkipReason::DuplicateIdentifier,
            });
        }
    }

    (unique, skipped)
}
