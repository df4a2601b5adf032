use std::path::Path;

/// Grammars with an identifier extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Go,
    JavaScript,
    TypeScript,
    Tsx,
    Python,
}

/// Extension → language capability table
const EXTENSIONS: &[(&str, Language)] = &[
    ("go", Language::Go),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("cjs", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("mts", Language::TypeScript),
    ("cts", Language::TypeScript),
    ("tsx", Language::Tsx),
    ("py", Language::Python),
    ("pyw", Language::Python),
];

/// Files starting with this name are parsed with the default grammar
const DOCKERFILE_PREFIX: &str = "Dockerfile";

impl Language {
    /// Grammar used for files that only match by name
    pub const DEFAULT: Language = Language::Go;

    /// Detect language from a bare extension (no leading dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, language)| *language)
    }

    /// Detect language from a file path
    pub fn for_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name().and_then(|n| n.to_str())?;
        if name.starts_with(DOCKERFILE_PREFIX) {
            return Some(Self::DEFAULT);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Python => "python",
        }
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Node kinds driving extraction for this grammar
    pub fn node_kinds(self) -> &'static NodeKinds {
        match self {
            Language::Go => &GO,
            Language::JavaScript => &JAVASCRIPT,
            Language::TypeScript | Language::Tsx => &TYPESCRIPT,
            Language::Python => &PYTHON,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grammar node kinds the extractor reacts to.
///
/// `declaration_kinds` stop the walk and harvest every nested leaf whose kind
/// is listed in `identifier_kinds`. Identifier leaves reached outside of a
/// declaration are harvested the same way.
#[derive(Debug)]
pub struct NodeKinds {
    pub declaration_kinds: &'static [&'static str],
    pub identifier_kinds: &'static [&'static str],
}

impl NodeKinds {
    pub fn is_declaration(&self, kind: &str) -> bool {
        self.declaration_kinds.contains(&kind)
    }

    pub fn is_identifier(&self, kind: &str) -> bool {
        self.identifier_kinds.contains(&kind)
    }

    /// Kinds that end the descent
    pub fn is_trigger(&self, kind: &str) -> bool {
        self.is_declaration(kind) || self.is_identifier(kind)
    }
}

static GO: NodeKinds = NodeKinds {
    declaration_kinds: &[
        "function_declaration",
        "method_declaration",
        "type_declaration",
        "struct_type",
        "interface_type",
    ],
    identifier_kinds: &[
        "identifier",
        "field_identifier",
        "package_identifier",
        "type_identifier",
    ],
};

static JAVASCRIPT: NodeKinds = NodeKinds {
    declaration_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "class_declaration",
    ],
    identifier_kinds: &["identifier", "property_identifier"],
};

static TYPESCRIPT: NodeKinds = NodeKinds {
    declaration_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "class_declaration",
        "abstract_class_declaration",
        "interface_declaration",
        "type_alias_declaration",
        "enum_declaration",
    ],
    identifier_kinds: &["identifier", "property_identifier", "type_identifier"],
};

static PYTHON: NodeKinds = NodeKinds {
    declaration_kinds: &["function_definition", "class_definition"],
    identifier_kinds: &["identifier"],
};
