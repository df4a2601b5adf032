use crate::error::{ExtractError, Result};
use crate::language::{Language, NodeKinds};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Collect identifier text from a parsed tree.
///
/// Named nodes are walked depth-first. A node whose kind is a declaration or
/// an identifier leaf contributes every nested identifier leaf and is not
/// descended further. Candidates of a single character or containing
/// whitespace are dropped.
pub fn extract(tree: &Tree, source: &[u8], kinds: &NodeKinds) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        if node.is_named() && kinds.is_trigger(node.kind()) {
            collect_identifiers(node, source, kinds, &mut terms);
            continue;
        }
        push_named_children(node, &mut stack);
    }

    terms
}

fn collect_identifiers(
    node: Node<'_>,
    source: &[u8],
    kinds: &NodeKinds,
    terms: &mut BTreeSet<String>,
) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.is_named() && kinds.is_identifier(current.kind()) {
            if let Ok(text) = current.utf8_text(source) {
                if is_meaningful(text) {
                    terms.insert(text.to_string());
                }
            }
        }
        push_named_children(current, &mut stack);
    }
}

fn push_named_children<'tree>(node: Node<'tree>, stack: &mut Vec<Node<'tree>>) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    // reversed so the stack pops in source order
    stack.extend(children.into_iter().rev());
}

fn is_meaningful(text: &str) -> bool {
    text.chars().nth(1).is_some() && !text.chars().any(char::is_whitespace)
}

/// Parser bound to one grammar
pub struct IdentifierExtractor {
    parser: Parser,
    language: Language,
}

impl IdentifierExtractor {
    pub fn new(language: Language) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&language.tree_sitter_language())
            .map_err(|e| ExtractError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self { parser, language })
    }

    pub fn extract_source(&mut self, source: &[u8]) -> Result<BTreeSet<String>> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::parse(format!("{} parser returned no tree", self.language)))?;

        Ok(extract(&tree, source, self.language.node_kinds()))
    }
}

/// One extractor per grammar, created on first use
#[derive(Default)]
pub struct Extractors {
    by_language: HashMap<Language, IdentifierExtractor>,
}

impl Extractors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a grammar is registered for `path`
    pub fn supports(path: impl AsRef<Path>) -> bool {
        Language::for_path(path).is_some()
    }

    pub fn extract_file(&mut self, path: &Path, source: &[u8]) -> Result<BTreeSet<String>> {
        let language = Language::for_path(path)
            .ok_or_else(|| ExtractError::no_extractor(path.display().to_string()))?;

        let extractor = match self.by_language.entry(language) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                log::trace!("Creating {language} extractor");
                entry.insert(IdentifierExtractor::new(language)?)
            }
        };

        let terms = extractor.extract_source(source)?;
        log::trace!("Extracted {} identifiers from {}", terms.len(), path.display());
        Ok(terms)
    }
}
