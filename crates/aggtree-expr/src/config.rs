//! Parser configuration.

/// Configuration for aggregate expression parsing.
///
/// # Example
///
/// ```rust
/// use aggtree_expr::ParserConfig;
///
/// let config = ParserConfig::builder().with_max_depth(4).build();
/// assert_eq!(config.max_depth, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum nesting of calculations, e.g. `ratio(add(..), ..)` is 2.
    pub max_depth: usize,
}

impl ParserConfig {
    /// Nesting limit used by [`ParserConfig::default`].
    pub const DEFAULT_MAX_DEPTH: usize = 32;

    /// Creates a new builder for ParserConfig.
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::default()
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Builder for ParserConfig.
#[derive(Debug, Clone, Default)]
pub struct ParserConfigBuilder {
    max_depth: Option<usize>,
}

impl ParserConfigBuilder {
    /// Sets the maximum calculation nesting.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Builds the ParserConfig.
    pub fn build(self) -> ParserConfig {
        ParserConfig {
            max_depth: self.max_depth.unwrap_or(ParserConfig::DEFAULT_MAX_DEPTH),
        }
    }
}
