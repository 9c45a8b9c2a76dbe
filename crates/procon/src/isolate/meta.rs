//! Isolate meta files
//!
//! After every `--run`, isolate writes one `key:value` pair per line. Unknown
//! keys are kept; lines without a colon or with an empty key are dropped.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::isolate::IsolateError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaFile {
    entries: BTreeMap<String, String>,
}

impl MetaFile {
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_owned(), value.trim().to_owned()))
            })
            .collect();
        Self { entries }
    }

    pub async fn load(path: &Path) -> Result<Self, IsolateError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value of `key` parsed as `T`; unparsable values count as absent
    pub fn value<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key)?.parse().ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
