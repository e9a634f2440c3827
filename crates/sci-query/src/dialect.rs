use sci_config::query::{IdentifierQuote, PlaceholderStyle, QuerySettings, DEFAULT_UNBOUNDED_LIMIT};

/// Compile-time settings for rendering a [`Query`](crate::Query).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialect {
    placeholder: PlaceholderStyle,
    quote: IdentifierQuote,
    unbounded_limit: u64,
    strict_groups: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::from(&QuerySettings::default())
    }
}

impl From<&QuerySettings> for Dialect {
    fn from(settings: &QuerySettings) -> Self {
        Self {
            placeholder: settings.placeholder(),
            quote: settings.identifier_quote(),
            unbounded_limit: settings.unbounded_limit(),
            strict_groups: settings.strict_groups(),
        }
    }
}

impl Dialect {
    /// `$n` placeholders and double-quoted identifiers.
    pub fn postgres() -> Self {
        Self {
            placeholder: PlaceholderStyle::Numbered,
            quote: IdentifierQuote::Double,
            unbounded_limit: i64::MAX as u64,
            strict_groups: false,
        }
    }

    /// SQLite reads LIMIT as a signed 64-bit integer.
    pub fn sqlite() -> Self {
        Self {
            unbounded_limit: i64::MAX as u64,
            ..Self::default()
        }
    }

    pub fn with_strict_groups(mut self, strict: bool) -> Self {
        self.strict_groups = strict;
        self
    }

    pub fn with_unbounded_limit(mut self, limit: u64) -> Self {
        self.unbounded_limit = limit;
        self
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.placeholder
    }

    pub fn strict_groups(&self) -> bool {
        self.strict_groups
    }

    pub fn unbounded_limit(&self) -> u64 {
        self.unbounded_limit
    }

    /// Placeholder for the `index`-th bound parameter (1-based).
    pub fn placeholder(&self, index: usize) -> String {
        match self.placeholder {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${index}"),
        }
    }

    /// Quotes an identifier, segment by segment for dotted names.
    pub fn quote_identifier(&self, name: &str) -> String {
        let quote = self.quote.as_char();
        name.split('.')
            .map(|segment| {
                if segment == "*" {
                    return segment.to_string();
                }
                let escaped = segment.replace(quote, &format!("{quote}{quote}"));
                format!("{quote}{escaped}{quote}")
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::default().placeholder(3), "?");
        assert_eq!(Dialect::postgres().placeholder(3), "$3");
    }

    #[test]
    fn test_quote_identifier() {
        let dialect = Dialect::default();
        assert_eq!(dialect.quote_identifier("name"), "`name`");
        assert_eq!(dialect.quote_identifier("users.name"), "`users`.`name`");
        assert_eq!(dialect.quote_identifier("users.*"), "`users`.*");
        assert_eq!(dialect.quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(Dialect::postgres().quote_identifier("name"), "\"name\"");
    }

    #[test]
    fn test_from_settings() {
        let settings = QuerySettings {
            placeholder: Some(PlaceholderStyle::Numbered),
            strict_groups: Some(true),
            unbounded_limit: Some(1000),
            ..Default::default()
        };
        let dialect = Dialect::from(&settings);

        assert_eq!(dialect.placeholder(1), "$1");
        assert!(dialect.strict_groups());
        assert_eq!(dialect.unbounded_limit(), 1000);
        assert_eq!(Dialect::default().unbounded_limit(), DEFAULT_UNBOUNDED_LIMIT);
    }
}
