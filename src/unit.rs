/// Domain used when an extraction site does not name one.
pub const DEFAULT_DOMAIN: &str = "default";

/// One extracted message occurrence.
///
/// Optional fields use the empty string for "absent", which is also how the
/// catalog format treats them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TranslationUnit {
    /// `path:line`, relative to the scan root
    pub position: String,
    pub singular: String,
    pub plural: String,
    pub context: String,
    pub domain: String,
}

impl TranslationUnit {
    pub fn new(position: impl Into<String>, singular: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            singular: singular.into(),
            ..Default::default()
        }
    }

    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Domain this unit is filed under.
    pub fn effective_domain(&self) -> &str {
        if self.domain.is_empty() {
            DEFAULT_DOMAIN
        } else {
            &self.domain
        }
    }
}

/// Format a provenance string the way catalog references expect it.
pub fn format_position(path: &str, line: usize) -> String {
    format!("{}:{}", path, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_domain_defaults() {
        let unit = TranslationUnit::new("a.go:1", "Hello");
        assert_eq!(unit.effective_domain(), "default");

        let unit = unit.with_domain("errors");
        assert_eq!(unit.effective_domain(), "errors");
    }

    #[test]
    fn test_builder_fields() {
        let unit = TranslationUnit::new(format_position("views/a.html", 3), "One file")
            .with_plural("%d files")
            .with_context("menu");
        assert_eq!(unit.position, "views/a.html:3");
        assert_eq!(unit.plural, "%d files");
        assert_eq!(unit.context, "menu");
        assert!(unit.domain.is_empty());
    }
}
