use serde::{Deserialize, Serialize};

/// Clean show name and optional season derived from a release string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
}

impl ParseResult {
    pub fn new(name: impl Into<String>, season: Option<u32>) -> Self {
        Self {
            name: name.into(),
            season,
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}
