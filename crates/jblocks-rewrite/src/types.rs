use jblocks_syntax::NodeId;
use jblocks_syntax::NodeKind;
use jblocks_syntax::NumKind;
use jblocks_syntax::SyntaxTree;

/// A variable type as the rewriter reasons about it, parsed from the
/// textual spelling in a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo {
    Int,
    Long,
    Double,
    Float,
    Boolean,
    Char,
    Str,
    Enum {
        name: String,
        first_constant: Option<String>,
    },
    Array {
        element: Box<TypeInfo>,
        dimensions: usize,
    },
    List {
        element: Box<TypeInfo>,
    },
    Other(String),
}

impl TypeInfo {
    /// Parse a type spelling such as `int`, `String[]`, or
    /// `List<Integer>`. Enum types need the declaring tree to look up
    /// their first constant, so they come out as `Other` here; use
    /// [`TypeInfo::resolve_enum`] afterwards.
    #[must_use]
    pub fn parse(spelling: &str) -> Self {
        let spelling = spelling.trim();
        if let Some(base) = spelling.strip_suffix("[]") {
            let mut dimensions = 1;
            let mut base = base;
            while let Some(inner) = base.strip_suffix("[]") {
                dimensions += 1;
                base = inner;
            }
            return TypeInfo::Array {
                element: Box::new(TypeInfo::parse(base)),
                dimensions,
            };
        }
        if let Some(rest) = spelling
            .strip_prefix("List<")
            .or_else(|| spelling.strip_prefix("ArrayList<"))
        {
            if let Some(element) = rest.strip_suffix('>') {
                return TypeInfo::List {
                    element: Box::new(TypeInfo::parse_boxed(element)),
                };
            }
        }
        match spelling {
            "int" => TypeInfo::Int,
            "long" => TypeInfo::Long,
            "double" => TypeInfo::Double,
            "float" => TypeInfo::Float,
            "boolean" => TypeInfo::Boolean,
            "char" => TypeInfo::Char,
            "String" => TypeInfo::Str,
            other => TypeInfo::Other(other.to_string()),
        }
    }

    /// Boxed element spellings inside generics (`Integer`, `Double`)
    /// map back to their primitive element types.
    fn parse_boxed(spelling: &str) -> Self {
        match spelling.trim() {
            "Integer" => TypeInfo::Int,
            "Long" => TypeInfo::Long,
            "Double" => TypeInfo::Double,
            "Float" => TypeInfo::Float,
            "Boolean" => TypeInfo::Boolean,
            "Character" => TypeInfo::Char,
            other => TypeInfo::parse(other),
        }
    }

    /// Upgrade an `Other` type to an enum when the tree declares an
    /// enum of that name.
    #[must_use]
    pub fn resolve_enum(self, tree: &SyntaxTree) -> Self {
        let TypeInfo::Other(name) = &self else {
            return self;
        };
        for node in tree.preorder() {
            if let NodeKind::EnumDecl {
                name: decl_name,
                constants,
            } = tree.kind(node)
            {
                if decl_name == name {
                    return TypeInfo::Enum {
                        name: name.clone(),
                        first_constant: constants.first().cloned(),
                    };
                }
            }
        }
        self
    }

    /// Default value expression for this type: zero for numbers,
    /// `false`, empty string, `'a'`, the first enum constant, or
    /// `null` when nothing better exists.
    #[must_use]
    pub fn default_value(&self) -> String {
        match self {
            TypeInfo::Int | TypeInfo::Long => "0".to_string(),
            TypeInfo::Double => "0.0".to_string(),
            TypeInfo::Float => "0.0f".to_string(),
            TypeInfo::Boolean => "false".to_string(),
            TypeInfo::Char => "'a'".to_string(),
            TypeInfo::Str => "\"\"".to_string(),
            TypeInfo::Enum {
                name,
                first_constant: Some(constant),
            } => format!("{name}.{constant}"),
            TypeInfo::Enum { .. } | TypeInfo::Other(_) => "null".to_string(),
            TypeInfo::Array { .. } | TypeInfo::List { .. } => self.default_initializer(&[]),
        }
    }

    /// Spelling used in source for this type.
    #[must_use]
    pub fn spelling(&self) -> String {
        match self {
            TypeInfo::Int => "int".to_string(),
            TypeInfo::Long => "long".to_string(),
            TypeInfo::Double => "double".to_string(),
            TypeInfo::Float => "float".to_string(),
            TypeInfo::Boolean => "boolean".to_string(),
            TypeInfo::Char => "char".to_string(),
            TypeInfo::Str => "String".to_string(),
            TypeInfo::Enum { name, .. } | TypeInfo::Other(name) => name.clone(),
            TypeInfo::Array {
                element,
                dimensions,
            } => {
                let mut spelling = element.spelling();
                for _ in 0..*dimensions {
                    spelling.push_str("[]");
                }
                spelling
            }
            TypeInfo::List { element } => format!("List<{}>", element.boxed_spelling()),
        }
    }

    fn boxed_spelling(&self) -> String {
        match self {
            TypeInfo::Int => "Integer".to_string(),
            TypeInfo::Long => "Long".to_string(),
            TypeInfo::Double => "Double".to_string(),
            TypeInfo::Float => "Float".to_string(),
            TypeInfo::Boolean => "Boolean".to_string(),
            TypeInfo::Char => "Character".to_string(),
            other => other.spelling(),
        }
    }

    fn element(&self) -> Option<&TypeInfo> {
        match self {
            TypeInfo::Array { element, .. } | TypeInfo::List { element } => Some(element),
            _ => None,
        }
    }

    /// Initializer expression for this type, repopulated with the
    /// given preserved leaves where they are type-compatible.
    ///
    /// Leaves are consumed left-to-right, depth-first. When old and
    /// new element types differ the values are not converted; the new
    /// container gets fresh defaults.
    #[must_use]
    pub fn default_initializer(&self, preserved: &[PreservedLeaf]) -> String {
        let compatible: Vec<&PreservedLeaf> = match self.element() {
            Some(element) if preserved.iter().all(|leaf| leaf.fits(element)) => {
                preserved.iter().collect()
            }
            _ => Vec::new(),
        };

        match self {
            TypeInfo::Array {
                element,
                dimensions,
            } => {
                let inner = nested_array_initializer(element, *dimensions, &compatible);
                format!("new {}{} {inner}", element.spelling(), "[]".repeat(*dimensions))
            }
            TypeInfo::List { .. } => {
                let values = if compatible.is_empty() {
                    self.element()
                        .map(TypeInfo::default_value)
                        .unwrap_or_default()
                } else {
                    compatible
                        .iter()
                        .map(|leaf| leaf.text.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!("new ArrayList<>(Arrays.asList({values}))")
            }
            scalar => match preserved.first() {
                Some(leaf) if leaf.fits(scalar) => leaf.text.clone(),
                _ => scalar.default_value(),
            },
        }
    }
}

/// Brace initializer for an `n`-dimensional array. One nested group
/// per extra dimension; the innermost level carries the values.
fn nested_array_initializer(
    element: &TypeInfo,
    dimensions: usize,
    values: &[&PreservedLeaf],
) -> String {
    if dimensions <= 1 {
        let rendered = if values.is_empty() {
            element.default_value()
        } else {
            values
                .iter()
                .map(|leaf| leaf.text.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{{ {rendered} }}")
    } else {
        let inner = nested_array_initializer(element, dimensions - 1, values);
        format!("{{ {inner} }}")
    }
}

/// The shape of a literal collected for value preservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Int,
    Double,
    Float,
    Boolean,
    Char,
    Str,
}

/// One user-entered leaf literal, with its exact source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedLeaf {
    pub text: String,
    pub kind: LeafKind,
}

impl PreservedLeaf {
    fn fits(&self, ty: &TypeInfo) -> bool {
        matches!(
            (self.kind, ty),
            (LeafKind::Int, TypeInfo::Int | TypeInfo::Long)
                | (LeafKind::Double, TypeInfo::Double)
                | (LeafKind::Float, TypeInfo::Float)
                | (LeafKind::Boolean, TypeInfo::Boolean)
                | (LeafKind::Char, TypeInfo::Char)
                | (LeafKind::Str, TypeInfo::Str)
        )
    }
}

/// Flatten the leaf literals of a list/array-construction expression
/// in left-to-right order. Non-literal leaves are skipped.
#[must_use]
pub fn collect_leaves(tree: &SyntaxTree, expr: NodeId) -> Vec<PreservedLeaf> {
    let mut leaves = Vec::new();
    collect_into(tree, expr, &mut leaves);
    leaves
}

fn collect_into(tree: &SyntaxTree, node: NodeId, leaves: &mut Vec<PreservedLeaf>) {
    match tree.kind(node) {
        NodeKind::ArrayInit | NodeKind::ArrayNew { .. } | NodeKind::ListCtor { .. } => {
            for &child in tree.children(node) {
                collect_into(tree, child, leaves);
            }
        }
        NodeKind::NumLit { text, kind } => leaves.push(PreservedLeaf {
            text: text.clone(),
            kind: match kind {
                NumKind::Int => LeafKind::Int,
                NumKind::Float => LeafKind::Float,
                NumKind::Double => LeafKind::Double,
            },
        }),
        NodeKind::StrLit { .. } => leaves.push(PreservedLeaf {
            text: tree.text_of(node).to_string(),
            kind: LeafKind::Str,
        }),
        NodeKind::BoolLit { value } => leaves.push(PreservedLeaf {
            text: value.to_string(),
            kind: LeafKind::Boolean,
        }),
        NodeKind::CharLit { .. } => leaves.push(PreservedLeaf {
            text: tree.text_of(node).to_string(),
            kind: LeafKind::Char,
        }),
        _ => {}
    }
}
