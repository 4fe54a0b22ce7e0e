use crate::error::{PipelineError, Result};
use crate::statistics::client::Variable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to do with a code that has no label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnmappedPolicy {
    /// Keep the code itself as the label.
    PassThrough,
    /// Leave the label null.
    #[default]
    Null,
    /// Fail with `UnmappedCode`.
    Error,
}

/// Code-to-label dictionary for one dimension.
#[derive(Debug, Clone)]
pub struct LabelMap {
    dimension: String,
    labels: HashMap<String, String>,
    policy: UnmappedPolicy,
}

impl LabelMap {
    pub fn new(
        dimension: impl Into<String>,
        labels: HashMap<String, String>,
        policy: UnmappedPolicy,
    ) -> Self {
        Self {
            dimension: dimension.into(),
            labels,
            policy,
        }
    }

    /// Pair a variable's `values` with its `valueTexts`.
    pub fn from_variable(variable: &Variable, policy: UnmappedPolicy) -> Self {
        let labels = variable
            .values
            .iter()
            .cloned()
            .zip(variable.value_texts.iter().cloned())
            .collect();
        Self::new(variable.code.clone(), labels, policy)
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn lookup(&self, code: &str) -> Result<Option<String>> {
        if let Some(label) = self.labels.get(code) {
            return Ok(Some(label.clone()));
        }
        match self.policy {
            UnmappedPolicy::PassThrough => Ok(Some(code.to_string())),
            UnmappedPolicy::Null => Ok(None),
            UnmappedPolicy::Error => Err(PipelineError::UnmappedCode {
                dimension: self.dimension.clone(),
                code: code.to_string(),
            }),
        }
    }

    /// Replace every code in a column, honouring the policy.
    pub fn apply<'a>(&self, codes: impl IntoIterator<Item = &'a str>) -> Result<Vec<Option<String>>> {
        codes.into_iter().map(|c| self.lookup(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sex(policy: UnmappedPolicy) -> LabelMap {
        let labels = [("1", "men"), ("2", "women")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LabelMap::new("Kon", labels, policy)
    }

    #[test]
    fn test_mapped_codes_are_replaced() {
        let out = sex(UnmappedPolicy::Error).apply(["2", "1"]).unwrap();
        assert_eq!(out, vec![Some("women".to_string()), Some("men".to_string())]);
    }

    #[test]
    fn test_unmapped_policies() {
        assert_eq!(sex(UnmappedPolicy::PassThrough).lookup("9").unwrap(), Some("9".to_string()));
        assert_eq!(sex(UnmappedPolicy::Null).lookup("9").unwrap(), None);
        match sex(UnmappedPolicy::Error).lookup("9") {
            Err(PipelineError::UnmappedCode { dimension, code }) => {
                assert_eq!(dimension, "Kon");
                assert_eq!(code, "9");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_from_variable_pairs_values_with_texts() {
        let variable = Variable {
            code: "Yrke2012".to_string(),
            text: "occupation".to_string(),
            values: vec!["1".to_string(), "2".to_string()],
            value_texts: vec!["Managers".to_string()],
            time: false,
        };
        let map = LabelMap::from_variable(&variable, UnmappedPolicy::Null);
        assert_eq!(map.len(), 1);
        assert_eq!(map.lookup("1").unwrap(), Some("Managers".to_string()));
        assert_eq!(map.lookup("2").unwrap(), None);
    }
}
