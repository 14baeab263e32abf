use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::domain::{CanonicalId, DisplayMetadata, FullRecord, SlimRecord};
use crate::error::KiraError;

pub const OPENALEX_BASE: &str = "https://api.openalex.org";

pub const MAX_PAGE_SIZE: usize = 200;

const SLIM_FIELDS: &str = "id,publication_year,cited_by_count,referenced_works";
const FULL_FIELDS: &str = "id,publication_year,cited_by_count,referenced_works,doi,title,\
display_name,type,authorships,abstract_inverted_index,primary_location,open_access,topics,\
sustainable_development_goals,keywords,citation_normalized_percentile";

#[async_trait]
pub trait MetadataApi: Send + Sync {
    async fn work(&self, id: &CanonicalId) -> Result<FullRecord, KiraError>;

    async fn works_slim(&self, ids: &[CanonicalId]) -> Result<Vec<SlimRecord>, KiraError>;

    async fn works_full(&self, ids: &[CanonicalId]) -> Result<Vec<FullRecord>, KiraError>;

    async fn citing_ids(
        &self,
        subjects: &[CanonicalId],
        limit: usize,
    ) -> Result<Vec<CanonicalId>, KiraError>;
}

#[derive(Clone)]
pub struct OpenAlexHttpClient {
    client: Client,
    base_url: String,
    mailto: Option<String>,
}

impl OpenAlexHttpClient {
    pub fn new(config: &ApiConfig) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-cg/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::OpenAlexHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| KiraError::OpenAlexHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&'static str, String)>,
    ) -> Result<T, KiraError> {
        if let Some(mailto) = &self.mailto {
            query.push(("mailto", mailto.clone()));
        }
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "openalex request");
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|err| KiraError::OpenAlexHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "OpenAlex request failed".to_string());
            return Err(KiraError::OpenAlexStatus { status, message });
        }
        response
            .json()
            .await
            .map_err(|err| KiraError::OpenAlexDecode(err.to_string()))
    }

    async fn filtered_works(
        &self,
        filter: String,
        per_page: usize,
        select: &str,
    ) -> Result<Vec<WorkPayload>, KiraError> {
        let page: WorksPage = self
            .get_json(
                "/works",
                vec![
                    ("filter", filter),
                    ("per-page", per_page.clamp(1, MAX_PAGE_SIZE).to_string()),
                    ("select", select.to_string()),
                ],
            )
            .await?;
        Ok(page.results.unwrap_or_default())
    }
}

#[async_trait]
impl MetadataApi for OpenAlexHttpClient {
    async fn work(&self, id: &CanonicalId) -> Result<FullRecord, KiraError> {
        let payload: WorkPayload = self
            .get_json(
                &format!("/works/{}", id.as_str()),
                vec![("select", FULL_FIELDS.to_string())],
            )
            .await?;
        payload
            .into_full()
            .ok_or_else(|| KiraError::OpenAlexDecode(format!("record for {id} has no usable id")))
    }

    async fn works_slim(&self, ids: &[CanonicalId]) -> Result<Vec<SlimRecord>, KiraError> {
        let works = self
            .filtered_works(id_filter("openalex", ids), ids.len(), SLIM_FIELDS)
            .await?;
        Ok(works.into_iter().filter_map(WorkPayload::into_slim).collect())
    }

    async fn works_full(&self, ids: &[CanonicalId]) -> Result<Vec<FullRecord>, KiraError> {
        let works = self
            .filtered_works(id_filter("openalex", ids), ids.len(), FULL_FIELDS)
            .await?;
        Ok(works.into_iter().filter_map(WorkPayload::into_full).collect())
    }

    async fn citing_ids(
        &self,
        subjects: &[CanonicalId],
        limit: usize,
    ) -> Result<Vec<CanonicalId>, KiraError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let works = self
            .filtered_works(id_filter("cites", subjects), limit, "id")
            .await?;
        Ok(works
            .into_iter()
            .filter_map(|work| work.id.as_deref().and_then(CanonicalId::normalized))
            .collect())
    }
}

fn id_filter(field: &str, ids: &[CanonicalId]) -> String {
    let joined = ids
        .iter()
        .map(CanonicalId::as_str)
        .collect::<Vec<_>>()
        .join("|");
    format!("{field}:{joined}")
}

#[derive(Debug, Deserialize)]
struct WorksPage {
    results: Option<Vec<WorkPayload>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkPayload {
    id: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    display_name: Option<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    publication_year: Option<i32>,
    cited_by_count: Option<u64>,
    referenced_works: Option<Vec<String>>,
    authorships: Option<Vec<Authorship>>,
    abstract_inverted_index: Option<BTreeMap<String, Vec<usize>>>,
    primary_location: Option<Location>,
    open_access: Option<OpenAccess>,
    topics: Option<Vec<Named>>,
    sustainable_development_goals: Option<Vec<Named>>,
    keywords: Option<Vec<Named>>,
    citation_normalized_percentile: Option<Percentile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Authorship {
    author: Option<Named>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Location {
    source: Option<Named>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenAccess {
    is_oa: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Percentile {
    value: Option<f64>,
}

impl WorkPayload {
    pub fn into_slim(self) -> Option<SlimRecord> {
        let id = self.id.as_deref().and_then(CanonicalId::normalized)?;
        let references = self
            .referenced_works
            .unwrap_or_default()
            .iter()
            .filter_map(|reference| CanonicalId::normalized(reference))
            .collect();
        Some(SlimRecord {
            id,
            year: self.publication_year.unwrap_or_default(),
            citation_count: self.cited_by_count.unwrap_or_default(),
            references,
        })
    }

    pub fn into_full(mut self) -> Option<FullRecord> {
        let metadata = DisplayMetadata {
            title: self.title.take().or_else(|| self.display_name.take()),
            authors: names(self.authorships.take().map(|items| {
                items
                    .into_iter()
                    .filter_map(|authorship| authorship.author)
                    .collect()
            })),
            abstract_text: self
                .abstract_inverted_index
                .take()
                .map(|index| reconstruct_abstract(&index))
                .filter(|text| !text.is_empty()),
            venue: self
                .primary_location
                .take()
                .and_then(|location| location.source)
                .and_then(|source| source.display_name),
            doi: self.doi.take(),
            work_type: self.work_type.take(),
            open_access: self
                .open_access
                .take()
                .and_then(|oa| oa.is_oa)
                .unwrap_or(false),
            topics: names(self.topics.take()),
            sdgs: names(self.sustainable_development_goals.take()),
            keywords: names(self.keywords.take()),
            citation_percentile: self
                .citation_normalized_percentile
                .take()
                .and_then(|percentile| percentile.value),
        };
        let record = self.into_slim()?;
        Some(FullRecord { record, metadata })
    }
}

fn names(items: Option<Vec<Named>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| item.display_name)
        .collect()
}

pub fn reconstruct_abstract(index: &BTreeMap<String, Vec<usize>>) -> String {
    let mut positioned = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |pos| (*pos, word.as_str())))
        .collect::<Vec<_>>();
    positioned.sort_unstable();
    positioned
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}
