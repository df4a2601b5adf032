use thiserror::Error;

/// Result type for identifier extraction
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that can occur while extracting identifiers
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No grammar is registered for the path
    #[error("No extractor for {0}")]
    NoExtractor(String),

    /// Tree-sitter returned no tree
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Tree-sitter rejected the grammar
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl ExtractError {
    pub fn no_extractor(path: impl Into<String>) -> Self {
        Self::NoExtractor(path.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}
