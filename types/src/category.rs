//! Content categories. Each category has its own ledger topic.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of knowledge categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Findings, analyses, literature notes.
    Research,
    /// Code snippets, recipes, tooling knowledge.
    Code,
    /// Datasets and data-source descriptions.
    Data,
    /// How-to guides and procedures.
    Guide,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Research,
        Category::Code,
        Category::Data,
        Category::Guide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Research => "research",
            Category::Code => "code",
            Category::Data => "data",
            Category::Guide => "guide",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TypeError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Research".parse::<Category>().unwrap(), Category::Research);
        assert_eq!(" data ".parse::<Category>().unwrap(), Category::Data);
        assert!("poetry".parse::<Category>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Category::Guide).unwrap();
        assert_eq!(json, "\"guide\"");
    }
}
