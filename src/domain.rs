use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

const OPENALEX_PREFIXES: &[&str] = &[
    "https://api.openalex.org/works/",
    "https://api.openalex.org/authors/",
    "https://api.openalex.org/",
    "http://api.openalex.org/",
    "https://openalex.org/",
    "http://openalex.org/",
];

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

pub const DOI_RESOLVER: &str = "https://doi.org/";

static OPENALEX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[WwAa][0-9]+$").expect("static regex"));

/// OpenAlex ids and URLs become the bare id, DOIs become
/// `https://doi.org/<lowercased doi>`, anything else becomes "".
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(doi) = strip_doi(trimmed) {
        return format!("{DOI_RESOLVER}{}", doi.to_lowercase());
    }

    let candidate = match strip_prefix_ci(trimmed, OPENALEX_PREFIXES) {
        Some(rest) => last_segment(rest),
        None => trimmed,
    };

    if OPENALEX_ID.is_match(candidate) {
        let mut chars = candidate.chars();
        match chars.next() {
            Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => String::new(),
        }
    } else {
        String::new()
    }
}

fn strip_doi(value: &str) -> Option<&str> {
    let rest = strip_prefix_ci(value, DOI_PREFIXES).unwrap_or(value);
    let rest = rest.trim();
    (rest.starts_with("10.") && rest.contains('/')).then_some(rest)
}

fn strip_prefix_ci<'a>(value: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        let head = value.get(..prefix.len())?;
        head.eq_ignore_ascii_case(prefix)
            .then(|| &value[prefix.len()..])
    })
}

fn last_segment(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn normalized(value: &str) -> Option<Self> {
        let normalized = normalize(value);
        (!normalized.is_empty()).then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_work(&self) -> bool {
        self.0.starts_with('W')
    }

    pub fn is_author(&self) -> bool {
        self.0.starts_with('A')
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CanonicalId {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::normalized(value).ok_or_else(|| KiraError::InvalidIdentifier(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlimRecord {
    pub id: CanonicalId,
    pub year: i32,
    pub citation_count: u64,
    pub references: Vec<CanonicalId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub work_type: Option<String>,
    pub open_access: bool,
    pub topics: Vec<String>,
    pub sdgs: Vec<String>,
    pub keywords: Vec<String>,
    pub citation_percentile: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullRecord {
    #[serde(flatten)]
    pub record: SlimRecord,
    pub metadata: DisplayMetadata,
}

impl FullRecord {
    pub fn id(&self) -> &CanonicalId {
        &self.record.id
    }
}

pub trait Identified {
    fn id(&self) -> &CanonicalId;
}

impl Identified for SlimRecord {
    fn id(&self) -> &CanonicalId {
        &self.id
    }
}

impl Identified for FullRecord {
    fn id(&self) -> &CanonicalId {
        &self.record.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchProfile {
    Slim,
    Full,
}

impl fmt::Display for FetchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchProfile::Slim => write!(f, "slim"),
            FetchProfile::Full => write!(f, "full"),
        }
    }
}
