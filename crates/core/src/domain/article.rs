// Article Domain Model

use serde::{Deserialize, Deserializer, Serialize};

/// One article extracted from a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub article_number: String,
    #[serde(default)]
    pub article_title: Option<String>,
    pub article_text: String,
}

impl ArticleRecord {
    pub fn new(
        number: impl Into<String>,
        title: Option<&str>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            article_number: number.into(),
            article_title: title.map(str::to_string),
            article_text: text.into(),
        }
    }
}

/// Models number articles either as `"Art. 3"` or as a bare `3`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "article_number must be a string or number, got {}",
            other
        ))),
    }
}
