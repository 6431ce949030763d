//! Opaque string identifiers: agents, knowledge items and ledger topics.
//!
//! All three are chosen outside the engine (the identity service, the submitter
//! and the ledger respectively) and are never interpreted beyond equality.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Build an identifier, rejecting empty or whitespace-only input.
            pub fn parse(raw: impl Into<String>) -> Result<Self, TypeError> {
                let s = raw.into();
                if s.trim().is_empty() {
                    return Err(TypeError::EmptyIdentifier);
                }
                Ok(Self(s))
            }

            /// Return the raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Stable identity of an agent (submitter or voter), as issued by the
    /// identity-resolution service.
    AgentId
);

string_id!(
    /// Identifier of a knowledge item, chosen by its submitter.
    ItemId
);

string_id!(
    /// Identifier of an append-only ledger topic (e.g. `0.0.4821`).
    TopicId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_blank() {
        assert_eq!(AgentId::parse("   "), Err(TypeError::EmptyIdentifier));
        assert_eq!(ItemId::parse(""), Err(TypeError::EmptyIdentifier));
        assert_eq!(TopicId::parse("0.0.1").unwrap().as_str(), "0.0.1");
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = ItemId::new("kb-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"kb-42\"");
        let back: ItemId = serde_json::from_str("\"kb-42\"").unwrap();
        assert_eq!(back, id);
    }
}
