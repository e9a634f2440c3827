use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

/// SQL composition settings shared by every query built through the framework.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct QuerySettings {
    /// Primary key column used for default ordering and bare-value filters.
    /// Default: "id"
    pub primary_key: Option<String>,

    /// Placeholder style for bound parameters: "question" (?) or "numbered" ($1, $2, ...)
    /// Default: "question"
    pub placeholder: Option<PlaceholderStyle>,

    /// Quote used around ORDER BY identifiers: "backtick" or "double"
    /// Default: "backtick"
    pub identifier_quote: Option<IdentifierQuote>,

    /// LIMIT bound emitted when an offset is set without a limit.
    /// Default: 18446744073709551615
    pub unbounded_limit: Option<u64>,

    /// Reject unbalanced WHERE groups instead of closing them automatically.
    /// Default: false
    pub strict_groups: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `?` for every parameter (MySQL, SQLite)
    #[default]
    Question,
    /// `$1`, `$2`, ... in binding order (PostgreSQL)
    Numbered,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierQuote {
    #[default]
    Backtick,
    Double,
}

impl IdentifierQuote {
    pub fn as_char(self) -> char {
        match self {
            IdentifierQuote::Backtick => '`',
            IdentifierQuote::Double => '"',
        }
    }
}

pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// MySQL's documented idiom for "all remaining rows".
pub const DEFAULT_UNBOUNDED_LIMIT: u64 = u64::MAX;

impl QuerySettings {
    pub fn primary_key(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    pub fn placeholder(&self) -> PlaceholderStyle {
        self.placeholder.unwrap_or_default()
    }

    pub fn identifier_quote(&self) -> IdentifierQuote {
        self.identifier_quote.unwrap_or_default()
    }

    pub fn unbounded_limit(&self) -> u64 {
        self.unbounded_limit.unwrap_or(DEFAULT_UNBOUNDED_LIMIT)
    }

    pub fn strict_groups(&self) -> bool {
        self.strict_groups.unwrap_or(false)
    }
}
