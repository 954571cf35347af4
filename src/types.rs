//! Core type definitions for candidate ranking

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use crate::error::RankError;
use crate::normalize::{collapse_whitespace, normalize};

/// Field names a [`FieldSpec`] may bind on the requirement side.
pub const REQUIREMENT_FIELDS: &[&str] = &[
    "description",
    "job_title",
    "skills",
    "responsibilities",
    "education",
    "location",
    "experience_level",
    "certifications",
];

/// Field names a [`FieldSpec`] may bind on the candidate side.
pub const CANDIDATE_FIELDS: &[&str] = &[
    "skills",
    "job_title",
    "past_job_titles",
    "experience",
    "experience_level",
    "education",
    "location",
    "certifications",
];

/// The ranking query. Immutable for the duration of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobRequirement {
    pub job_title: String,
    /// Full job description text, as produced by the description builder
    pub description: String,
    pub skills: String,
    pub responsibilities: String,
    pub education: String,
    pub location: String,
    pub experience_level: String,
    pub certifications: Vec<String>,
}

impl JobRequirement {
    /// Look up a requirement field by its schema name
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name {
            "description" => FieldValue::Text(&self.description),
            "job_title" => FieldValue::Text(&self.job_title),
            "skills" => FieldValue::Text(&self.skills),
            "responsibilities" => FieldValue::Text(&self.responsibilities),
            "education" => FieldValue::Text(&self.education),
            "location" => FieldValue::Text(&self.location),
            "experience_level" => FieldValue::Text(&self.experience_level),
            "certifications" => FieldValue::List(&self.certifications),
            _ => return None,
        };
        Some(value)
    }
}

/// Display metadata carried through a run untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateDisplay {
    pub name: String,
    pub profile_url: String,
    pub image_url: String,
}

/// One candidate profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub past_job_titles: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub experience_level: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub display: CandidateDisplay,
}

impl CandidateRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Look up a candidate field by its schema name
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name {
            "skills" => FieldValue::Text(&self.skills),
            "job_title" => FieldValue::Text(&self.job_title),
            "past_job_titles" => FieldValue::Text(&self.past_job_titles),
            "experience" => FieldValue::Text(&self.experience),
            "experience_level" => FieldValue::Text(&self.experience_level),
            "education" => FieldValue::Text(&self.education),
            "location" => FieldValue::Text(&self.location),
            "certifications" => FieldValue::List(&self.certifications),
            _ => return None,
        };
        Some(value)
    }
}

/// Borrowed view of one record field
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Text(&'a str),
    List(&'a [String]),
}

impl<'a> FieldValue<'a> {
    /// Field as a single text; list items are joined with "; "
    pub fn text(&self) -> Cow<'a, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::List(items) => Cow::Owned(items.join("; ")),
        }
    }
}

/// Comparison semantic applied to one field pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Semantic,
    Exact,
    Ordinal,
    #[serde(alias = "set-overlap")]
    SetOverlap,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::Semantic => "semantic",
            ScorerKind::Exact => "exact",
            ScorerKind::Ordinal => "ordinal",
            ScorerKind::SetOverlap => "set_overlap",
        }
    }
}

/// A total order over a finite set of named levels, lowest first.
///
/// Level names are stored normalized, so "Senior" and "senior" are the same level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct OrdinalScale {
    levels: Vec<String>,
}

impl OrdinalScale {
    pub fn new<I, S>(levels: I) -> Result<Self, RankError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let levels: Vec<String> = levels
            .into_iter()
            .map(|l| collapse_whitespace(&normalize(l.as_ref())))
            .collect();

        if levels.is_empty() {
            return Err(RankError::InvalidSchema("ordinal scale has no levels".into()));
        }

        let mut seen = HashSet::new();
        for level in &levels {
            if level.is_empty() {
                return Err(RankError::InvalidSchema(
                    "ordinal scale contains an empty level name".into(),
                ));
            }
            if !seen.insert(level.as_str()) {
                return Err(RankError::InvalidSchema(format!(
                    "ordinal scale repeats level '{}'",
                    level
                )));
            }
        }

        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl Default for OrdinalScale {
    fn default() -> Self {
        Self {
            levels: vec!["entry".into(), "mid".into(), "senior".into()],
        }
    }
}

impl TryFrom<Vec<String>> for OrdinalScale {
    type Error = RankError;

    fn try_from(levels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<OrdinalScale> for Vec<String> {
    fn from(scale: OrdinalScale) -> Self {
        scale.levels
    }
}

/// Binds one requirement field to one candidate field with a scorer and weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    /// Key used in the score breakdown
    pub name: String,
    pub requirement_field: String,
    pub candidate_field: String,
    pub scorer: ScorerKind,
    pub weight: f64,
    /// Per-field scale override; only meaningful for ordinal fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<OrdinalScale>,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        requirement_field: impl Into<String>,
        candidate_field: impl Into<String>,
        scorer: ScorerKind,
        weight: f64,
    ) -> Self {
        Self {
            name: name.into(),
            requirement_field: requirement_field.into(),
            candidate_field: candidate_field.into(),
            scorer,
            weight,
            scale: None,
        }
    }

    pub fn with_scale(mut self, scale: OrdinalScale) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// The set of field bindings for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankingSchema {
    pub fields: Vec<FieldSpec>,
    /// Scale used by ordinal fields without their own
    #[serde(default)]
    pub ordinal_scale: OrdinalScale,
}

impl RankingSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            ordinal_scale: OrdinalScale::default(),
        }
    }

    pub fn with_ordinal_scale(mut self, scale: OrdinalScale) -> Self {
        self.ordinal_scale = scale;
        self
    }

    /// Check the schema before any scoring starts
    pub fn validate(&self) -> Result<(), RankError> {
        if self.fields.is_empty() {
            return Err(RankError::InvalidSchema("ranking schema has no fields".into()));
        }

        let mut names = HashSet::new();
        for spec in &self.fields {
            if spec.name.trim().is_empty() {
                return Err(RankError::InvalidSchema("field spec with empty name".into()));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(RankError::InvalidSchema(format!(
                    "field spec '{}' is declared more than once",
                    spec.name
                )));
            }
            if !REQUIREMENT_FIELDS.contains(&spec.requirement_field.as_str()) {
                return Err(RankError::InvalidSchema(format!(
                    "field spec '{}': unknown requirement field '{}'",
                    spec.name, spec.requirement_field
                )));
            }
            if !CANDIDATE_FIELDS.contains(&spec.candidate_field.as_str()) {
                return Err(RankError::InvalidSchema(format!(
                    "field spec '{}': unknown candidate field '{}'",
                    spec.name, spec.candidate_field
                )));
            }
            if !spec.weight.is_finite() || spec.weight < 0.0 {
                return Err(RankError::InvalidSchema(format!(
                    "field spec '{}': weight must be a non-negative number, got {}",
                    spec.name, spec.weight
                )));
            }
            if spec.scale.is_some() && spec.scorer != ScorerKind::Ordinal {
                return Err(RankError::InvalidSchema(format!(
                    "field spec '{}': a {} scorer does not take a scale, only ordinal does",
                    spec.name,
                    spec.scorer.as_str()
                )));
            }
        }

        Ok(())
    }

    pub fn total_weight(&self) -> f64 {
        self.fields.iter().map(|f| f.weight).sum()
    }

    /// Field name to weight, in schema order
    pub fn weights(&self) -> Vec<(&str, f64)> {
        self.fields.iter().map(|f| (f.name.as_str(), f.weight)).collect()
    }

    pub fn has_semantic_fields(&self) -> bool {
        self.fields.iter().any(|f| f.scorer == ScorerKind::Semantic)
    }

    /// Scale for an ordinal field: its own override, else the schema default
    pub fn scale_for<'a>(&'a self, spec: &'a FieldSpec) -> &'a OrdinalScale {
        spec.scale.as_ref().unwrap_or(&self.ordinal_scale)
    }
}

/// What to do when the embedding provider is down for the whole run.
///
/// There is deliberately no default: every run names its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPolicy {
    /// Score semantic fields as 0.0 for every candidate and flag the run
    Degrade,
    /// Fail the run before scoring
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    EmbeddingFailed,
    EmbeddingTimeout,
    RequirementEmbeddingFailed,
    UnrecognizedLevel,
}

/// A recovered field-level fault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFault {
    pub field: String,
    pub kind: FaultKind,
    pub detail: String,
}

/// Per-candidate scores: field name to [0,1] score plus the weighted total
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub fields: BTreeMap<String, f64>,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<FieldFault>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based position in the result
    pub rank: usize,
    pub candidate: CandidateRecord,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    NotAnObject,
    MissingIdentifier,
    DuplicateIdentifier,
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    /// Position in the submitted batch
    pub index: usize,
    pub id: Option<String>,
    pub reason: SkipReason,
}

/// Run-level accounting, so a partial result is never mistaken for a complete one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub candidates_received: usize,
    pub candidates_scored: usize,
    /// Left unscored because the run was cancelled
    pub candidates_not_scored: usize,
    pub skipped: Vec<SkippedCandidate>,
    /// Field name to number of recovered faults
    pub field_faults: BTreeMap<String, usize>,
    pub semantic_degraded: bool,
    pub degenerate_weights: bool,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.skipped.is_empty() && self.candidates_not_scored == 0
    }

    pub fn total_field_faults(&self) -> usize {
        self.field_faults.values().sum()
    }
}

/// Ranked candidates, best first, plus the run summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub entries: Vec<RankedCandidate>,
    pub summary: RunSummary,
}

impl RankedResult {
    /// The first `n` entries
    pub fn top(&self, n: usize) -> &[RankedCandidate] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.candidate.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_scale_normalizes_and_rejects_duplicates() {
        let scale = OrdinalScale::new(["Entry", "Mid", "SENIOR"]).unwrap();
        assert_eq!(scale.levels(), &["entry", "mid", "senior"]);

        assert!(OrdinalScale::new(["junior", "Junior"]).is_err());
        assert!(OrdinalScale::new(Vec::<String>::new()).is_err());
        assert!(OrdinalScale::new(["lead", "!!"]).is_err());
    }

    #[test]
    fn test_ordinal_scale_decodes_through_validation() {
        let ok: OrdinalScale = serde_json::from_str(r#"["intern","entry","mid"]"#).unwrap();
        assert_eq!(ok.len(), 3);

        let err = serde_json::from_str::<OrdinalScale>(r#"["mid","mid"]"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_schema_validation() {
        let good = RankingSchema::new(vec![FieldSpec::new(
            "skills",
            "skills",
            "skills",
            ScorerKind::Semantic,
            1.0,
        )]);
        assert!(good.validate().is_ok());

        assert!(RankingSchema::new(vec![]).validate().is_err());

        let unknown = RankingSchema::new(vec![FieldSpec::new(
            "salary",
            "salary",
            "skills",
            ScorerKind::Exact,
            1.0,
        )]);
        assert!(unknown.validate().is_err());

        let negative = RankingSchema::new(vec![FieldSpec::new(
            "loc",
            "location",
            "location",
            ScorerKind::Exact,
            -0.5,
        )]);
        assert!(negative.validate().is_err());

        let dup = RankingSchema::new(vec![
            FieldSpec::new("loc", "location", "location", ScorerKind::Exact, 1.0),
            FieldSpec::new("loc", "location", "location", ScorerKind::Exact, 1.0),
        ]);
        assert!(dup.validate().is_err());

        let misplaced_scale = RankingSchema::new(vec![FieldSpec::new(
            "loc",
            "location",
            "location",
            ScorerKind::Exact,
            1.0,
        )
        .with_scale(OrdinalScale::default())]);
        let err = misplaced_scale.validate().unwrap_err();
        assert!(err.to_string().contains("exact scorer"), "{}", err);
    }

    #[test]
    fn test_scorer_kind_accepts_hyphenated_set_overlap() {
        let kind: ScorerKind = serde_json::from_str(r#""set-overlap""#).unwrap();
        assert_eq!(kind, ScorerKind::SetOverlap);
        assert!(serde_json::from_str::<ScorerKind>(r#""fuzzy""#).is_err());
    }

    #[test]
    fn test_field_lookup() {
        let mut cand = CandidateRecord::new("c1");
        cand.certifications = vec!["PMP".into(), "Cvent".into()];
        assert_eq!(cand.field("certifications").unwrap().text(), "PMP; Cvent");
        assert!(cand.field("display").is_none());

        let req = JobRequirement {
            location: "Paris".into(),
            ..Default::default()
        };
        assert_eq!(req.field("location").unwrap().text(), "Paris");
        assert!(req.field("past_job_titles").is_none());
    }

    #[test]
    fn test_top_clamps() {
        let result = RankedResult {
            entries: vec![],
            summary: RunSummary::default(),
        };
        assert!(result.top(10).is_empty());
    }
}
