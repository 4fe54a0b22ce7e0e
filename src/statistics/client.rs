//! PxWeb (v1) statistics API client.

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const SCB_API_BASE: &str = "https://api.scb.se/OV0104/v1/doris/sv/ssd";

/// One dimension of a table: its codes and their human-readable labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub code: String,
    pub text: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub value_texts: Vec<String>,
    #[serde(default)]
    pub time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub title: String,
    pub variables: Vec<Variable>,
}

impl TableMetadata {
    pub fn variable(&self, code: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.code == code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub filter: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryItem {
    pub code: String,
    pub selection: Selection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQuery {
    pub query: Vec<QueryItem>,
    pub response: ResponseFormat,
}

impl TableQuery {
    /// Select every value of every variable in `metadata`, narrowing the
    /// variables named in `selections` to the listed codes.
    pub fn build(metadata: &TableMetadata, selections: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        for code in selections.keys() {
            if metadata.variable(code).is_none() {
                return Err(PipelineError::Config(format!(
                    "table '{}' has no variable '{}'",
                    metadata.title, code
                )));
            }
        }

        let query = metadata
            .variables
            .iter()
            .map(|v| {
                let selection = match selections.get(&v.code) {
                    Some(values) => Selection {
                        filter: "item".to_string(),
                        values: values.clone(),
                    },
                    None => Selection {
                        filter: "all".to_string(),
                        values: vec!["*".to_string()],
                    },
                };
                QueryItem {
                    code: v.code.clone(),
                    selection,
                }
            })
            .collect();

        Ok(Self {
            query,
            response: ResponseFormat {
                format: "json".to_string(),
            },
        })
    }
}

/// Column descriptor in a query response. `type` is `d` (dimension),
/// `t` (time) or `c` (content).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseColumn {
    pub code: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseColumn {
    pub fn is_content(&self) -> bool {
        self.kind == "c"
    }
}

/// One observation: dimension codes in column order plus content values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub key: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub columns: Vec<ResponseColumn>,
    #[serde(default)]
    pub data: Vec<Observation>,
}

#[async_trait]
pub trait StatisticsApi: Send + Sync {
    async fn table_metadata(&self, table: &str) -> Result<TableMetadata>;
    async fn query(&self, table: &str, query: &TableQuery) -> Result<QueryResponse>;
}

pub struct PxWebClient {
    client: Client,
    base_url: String,
}

impl PxWebClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            table.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl StatisticsApi for PxWebClient {
    async fn table_metadata(&self, table: &str) -> Result<TableMetadata> {
        let url = self.table_url(table);
        info!("Fetching table metadata from {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api(format!("GET {} returned {}: {}", url, status, body)));
        }
        Ok(response.json::<TableMetadata>().await?)
    }

    async fn query(&self, table: &str, query: &TableQuery) -> Result<QueryResponse> {
        let url = self.table_url(table);
        debug!("Query body: {}", serde_json::to_string(query)?);
        info!("Querying {}", url);
        let response = self.client.post(&url).json(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api(format!("POST {} returned {}: {}", url, status, body)));
        }
        Ok(response.json::<QueryResponse>().await?)
    }
}
