//! PubMed via NCBI E-utilities: `esearch` for ids, `esummary` for metadata,
//! then `efetch` for abstracts.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::CollaboratorError;
use crate::search::{SearchHit, SearchTool};

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

fn eutils_base() -> String {
    std::env::var("PUBMED_EUTILS_URL").unwrap_or_else(|_| EUTILS_BASE.to_string())
}

#[derive(Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

fn xml_patterns() -> Option<&'static [Regex; 4]> {
    static PATTERNS: OnceLock<Option<[Regex; 4]>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some([
                Regex::new(r"(?s)<PubmedArticle>(.*?)</PubmedArticle>").ok()?,
                Regex::new(r"<PMID[^>]*>\s*(\d+)\s*</PMID>").ok()?,
                Regex::new(r#"(?s)<AbstractText([^>]*)>(.*?)</AbstractText>"#).ok()?,
                Regex::new(r#"Label="([^"]*)""#).ok()?,
            ])
        })
        .as_ref()
}

fn inline_tags() -> Option<&'static Regex> {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]+>").ok()).as_ref()
}

fn xml_text(raw: &str) -> String {
    let stripped = match inline_tags() {
        Some(re) => re.replace_all(raw, ""),
        None => raw.into(),
    };
    let text = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Abstracts by PMID from an efetch `PubmedArticleSet` document.
///
/// Structured abstracts keep their section labels (`METHODS: ...`). Articles
/// without an abstract are left out.
fn abstracts_from_efetch(xml: &str) -> HashMap<String, String> {
    let Some([article, pmid, abstract_text, label]) = xml_patterns() else {
        return HashMap::new();
    };
    article
        .captures_iter(xml)
        .filter_map(|a| {
            let body = a.get(1)?.as_str();
            let id = pmid.captures(body)?.get(1)?.as_str().to_string();
            let sections: Vec<String> = abstract_text
                .captures_iter(body)
                .filter_map(|c| {
                    let text = xml_text(c.get(2)?.as_str());
                    if text.is_empty() {
                        return None;
                    }
                    let section = c
                        .get(1)
                        .and_then(|attrs| label.captures(attrs.as_str()))
                        .and_then(|l| l.get(1))
                        .map(|l| l.as_str().trim())
                        .filter(|l| !l.is_empty());
                    Some(match section {
                        Some(l) => format!("{}: {}", l, text),
                        None => text,
                    })
                })
                .collect();
            (!sections.is_empty()).then(|| (id, sections.join("\n")))
        })
        .collect()
}

/// Builds hits from an esummary `result` object, in `ids` order. The abstract,
/// when known, becomes the hit's content.
fn hits_from_summary(
    ids: &[String],
    result: &JsonValue,
    abstracts: &HashMap<String, String>,
) -> Vec<SearchHit> {
    ids.iter()
        .filter_map(|id| result.get(id).map(|doc| (id, doc)))
        .map(|(id, doc)| {
            let field = |key: &str| doc.get(key).and_then(JsonValue::as_str).unwrap_or("").trim().to_string();
            let title = field("title");
            let authors: Vec<&str> = doc
                .get("authors")
                .and_then(JsonValue::as_array)
                .into_iter()
                .flatten()
                .filter_map(|a| a.get("name").and_then(JsonValue::as_str))
                .collect();
            let snippet = format!(
                "{} {} ({}). {}",
                title,
                field("fulljournalname"),
                field("pubdate"),
                authors.join(", ")
            );
            SearchHit {
                url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", id)),
                title: (!title.is_empty()).then_some(title),
                content: abstracts.get(id.as_str()).cloned(),
                snippet: Some(snippet.trim().to_string()),
            }
        })
        .collect()
}

/// Academic search over PubMed.
pub struct PubMedSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    email: Option<String>,
}

impl PubMedSearch {
    pub const NAME: &'static str = "pubmed_search";

    pub fn new(api_key: Option<String>, email: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            email,
        }
    }

    /// Reads optional `ENTREZ_API_KEY` and `ENTREZ_EMAIL`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("ENTREZ_API_KEY").ok(), std::env::var("ENTREZ_EMAIL").ok())
    }

    fn error(message: impl Into<String>) -> CollaboratorError {
        CollaboratorError::Search {
            tool: Self::NAME.into(),
            message: message.into(),
        }
    }

    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        params
    }

    async fn get(&self, endpoint: &str, extra: &[(&'static str, String)]) -> Result<reqwest::Response, CollaboratorError> {
        let mut params = self.common_params();
        params.extend_from_slice(extra);
        let res = self
            .client
            .get(format!("{}/{}", eutils_base(), endpoint))
            .query(&params)
            .send()
            .await
            .map_err(|e| Self::error(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Self::error(format!("E-utilities {} error {}: {}", endpoint, status, body)));
        }
        Ok(res)
    }

    async fn get_json(&self, endpoint: &str, extra: &[(&'static str, String)]) -> Result<JsonValue, CollaboratorError> {
        let mut params = vec![("retmode", "json".to_string())];
        params.extend_from_slice(extra);
        self.get(endpoint, &params)
            .await?
            .json()
            .await
            .map_err(|e| Self::error(e.to_string()))
    }

    async fn fetch_abstracts(&self, ids: &[String]) -> Result<HashMap<String, String>, CollaboratorError> {
        let xml = self
            .get(
                "efetch.fcgi",
                &[
                    ("id", ids.join(",")),
                    ("rettype", "abstract".to_string()),
                    ("retmode", "xml".to_string()),
                ],
            )
            .await?
            .text()
            .await
            .map_err(|e| Self::error(e.to_string()))?;
        Ok(abstracts_from_efetch(&xml))
    }
}

#[async_trait]
impl SearchTool for PubMedSearch {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Peer-reviewed biomedical literature (PubMed). Use for clinical trials, dosage studies and systematic reviews."
    }

    async fn run(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError> {
        let search = self
            .get_json(
                "esearch.fcgi",
                &[("term", query.to_string()), ("retmax", limit.max(1).to_string())],
            )
            .await?;
        let ids = serde_json::from_value::<ESearchResponse>(search)
            .map_err(|e| Self::error(e.to_string()))?
            .esearchresult
            .idlist;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let summary = self
            .get_json("esummary.fcgi", &[("id", ids.join(","))])
            .await?;
        let result = summary.get("result").cloned().unwrap_or(JsonValue::Null);
        let abstracts = match self.fetch_abstracts(&ids).await {
            Ok(abstracts) => abstracts,
            Err(e) => {
                tracing::warn!(error = %e, "efetch failed, hits carry metadata only");
                HashMap::new()
            }
        };
        Ok(hits_from_summary(&ids, &result, &abstracts))
    }
}
