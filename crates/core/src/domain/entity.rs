use serde::{Deserialize, Serialize};

/// Category of business object an approval threshold or request applies to.
///
/// The set is open: unknown wire values are preserved in `Other` so that new
/// entity types added by the host platform round-trip without a core change.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Estimate,
    Proposal,
    Purchase,
    Other(String),
}

impl EntityType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "estimate" => Self::Estimate,
            "proposal" => Self::Proposal,
            "purchase" => Self::Purchase,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Estimate => "estimate",
            Self::Proposal => "proposal",
            Self::Purchase => "purchase",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for EntityType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<EntityType> for String {
    fn from(entity_type: EntityType) -> Self {
        entity_type.as_str().to_string()
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
