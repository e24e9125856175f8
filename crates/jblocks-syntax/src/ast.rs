use jblocks_source::ByteOffset;
use jblocks_source::LineIndex;
use jblocks_source::Span;
use serde::Serialize;

use crate::error::ParseError;
use crate::error::SyntaxError;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::tokens::Comment;

/// Index of a node in the [`SyntaxTree`] arena.
///
/// Valid only for the tree that produced it; every re-parse mints a
/// fresh arena and invalidates all outstanding ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumKind {
    Int,
    Float,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Comparison and logic operators render as condition blocks;
    /// everything else is math.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::And | BinOp::Or
        )
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IncDecOp {
    Increment,
    Decrement,
}

/// How a list-valued expression was written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListFlavor {
    ArrayListNew,
    ArraysAsList,
    ListOf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NodeKind {
    // Declarations
    Class {
        name: String,
    },
    Method {
        name: String,
        return_type: String,
        is_main: bool,
    },
    Field {
        ty: String,
        name: String,
    },
    EnumDecl {
        name: String,
        constants: Vec<String>,
    },
    /// A brace-delimited statement list; the span covers both braces.
    Body,

    // Statements
    LocalVar {
        ty: String,
        name: String,
    },
    If,
    While,
    DoWhile,
    For {
        ty: String,
        var: String,
    },
    Switch,
    SwitchCase {
        is_default: bool,
    },
    Break,
    Continue,
    Return,
    Print,
    Assign {
        op: AssignOp,
    },
    IncDec {
        op: IncDecOp,
        prefix: bool,
    },
    CallStmt {
        scope: Option<String>,
        name: String,
    },
    /// The `try { Thread.sleep(n); } catch (InterruptedException e) ...` idiom.
    Wait,
    /// A region the parser could not recognize; rendered as an opaque block.
    Unknown,

    // Expressions
    StrLit {
        value: String,
    },
    NumLit {
        text: String,
        kind: NumKind,
    },
    BoolLit {
        value: bool,
    },
    CharLit {
        value: char,
    },
    NullLit,
    Ident {
        name: String,
    },
    EnumConst {
        ty: String,
        name: String,
    },
    FieldAccess {
        qualifier: String,
        name: String,
    },
    Binary {
        op: BinOp,
    },
    ArrayInit,
    ArrayNew {
        ty: String,
    },
    ListCtor {
        flavor: ListFlavor,
    },
    CallExpr {
        scope: Option<String>,
        name: String,
    },
    ScannerRead {
        method: String,
    },
}

impl NodeKind {
    /// Statement-shaped nodes take precedence when several nodes share
    /// a source line in the line-to-block map.
    #[must_use]
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::LocalVar { .. }
                | NodeKind::If
                | NodeKind::While
                | NodeKind::DoWhile
                | NodeKind::For { .. }
                | NodeKind::Switch
                | NodeKind::SwitchCase { .. }
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Return
                | NodeKind::Print
                | NodeKind::Assign { .. }
                | NodeKind::IncDec { .. }
                | NodeKind::CallStmt { .. }
                | NodeKind::Wait
                | NodeKind::EnumDecl { .. }
                | NodeKind::Unknown
        )
    }

    #[must_use]
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::StrLit { .. }
                | NodeKind::NumLit { .. }
                | NodeKind::BoolLit { .. }
                | NodeKind::CharLit { .. }
                | NodeKind::NullLit
                | NodeKind::Ident { .. }
                | NodeKind::EnumConst { .. }
                | NodeKind::FieldAccess { .. }
                | NodeKind::Binary { .. }
                | NodeKind::ArrayInit
                | NodeKind::ArrayNew { .. }
                | NodeKind::ListCtor { .. }
                | NodeKind::CallExpr { .. }
                | NodeKind::ScannerRead { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) span: Span,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// Arena builder used by the parser.
#[derive(Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub(crate) fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            span,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub(crate) fn set_span(&mut self, id: NodeId, span: Span) {
        self.nodes[id.index()].span = span;
    }

    pub(crate) fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
    }

    pub(crate) fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub(crate) fn span_of(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub(crate) fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }
}

/// An immutable parse of one document version.
///
/// Rebuilt from scratch on every committed edit; there is no
/// incremental reuse between versions.
#[derive(Debug, Clone, Serialize)]
pub struct SyntaxTree {
    text: String,
    #[serde(skip)]
    index: LineIndex,
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
    comments: Vec<Comment>,
    errors: Vec<SyntaxError>,
}

impl SyntaxTree {
    /// Parse source text. Tokenizable input always yields a tree;
    /// unrecognized regions become [`NodeKind::Unknown`] nodes.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (tokens, comments) = Lexer::new(text).tokenize();
        let (builder, root, errors) = Parser::new(text, tokens).parse();
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "parse recovered from syntax errors");
        }
        Self {
            text: text.to_string(),
            index: LineIndex::new(text),
            nodes: builder.nodes,
            root,
            comments,
            errors,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::parse(text))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    #[must_use]
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    #[must_use]
    pub fn text_of(&self, id: NodeId) -> &str {
        self.span(id).text(&self.text)
    }

    /// 1-based source line of the node's first byte.
    #[must_use]
    pub fn line_of(&self, id: NodeId) -> u32 {
        self.index.to_line(self.span(id).start_offset())
    }

    /// Child index of `id` within its parent.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Path of child indices from the root down to `id`.
    #[must_use]
    pub fn path_from_root(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if let Some(idx) = self.children(parent).iter().position(|&c| c == current) {
                path.push(idx);
            }
            current = parent;
        }
        path.reverse();
        path
    }

    /// Pre-order traversal from the root; orphaned arena entries are
    /// not visited.
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
            Some(id)
        })
    }

    /// The deepest node whose span contains the given offset.
    #[must_use]
    pub fn node_at_offset(&self, offset: ByteOffset) -> Option<NodeId> {
        let mut current = self.root?;
        if !self.span(current).contains_offset(offset.offset()) {
            return None;
        }
        'descend: loop {
            for &child in self.children(current) {
                if self.span(child).contains_offset(offset.offset()) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = "public class Demo {\n    public static void main(String[] args) {\n        int x = 10;\n        System.out.println(x);\n    }\n}\n";

    #[test]
    fn parse_keeps_the_source_text_byte_for_byte() {
        let tree = SyntaxTree::parse(DEMO);
        assert_eq!(tree.text(), DEMO);
    }

    #[test]
    fn child_spans_are_contained_in_parents() {
        let tree = SyntaxTree::parse(DEMO);
        for id in tree.preorder() {
            for &child in tree.children(id) {
                assert!(
                    tree.span(id).contains(tree.span(child)),
                    "child {child:?} escapes parent {id:?}"
                );
            }
        }
    }

    #[test]
    fn sibling_spans_do_not_overlap() {
        let tree = SyntaxTree::parse(DEMO);
        for id in tree.preorder() {
            let children = tree.children(id);
            for pair in children.windows(2) {
                assert!(tree.span(pair[0]).end() <= tree.span(pair[1]).start());
            }
        }
    }

    #[test]
    fn node_at_offset_finds_the_deepest_node() {
        let tree = SyntaxTree::parse(DEMO);
        let x_offset = u32::try_from(DEMO.find("x = 10").unwrap()).unwrap();
        let node = tree.node_at_offset(ByteOffset::new(x_offset)).unwrap();
        assert!(matches!(tree.kind(node), NodeKind::LocalVar { name, .. } if name == "x"));
    }

    #[test]
    fn demo_program_parses_to_the_expected_outline() {
        fn render(tree: &SyntaxTree, id: NodeId, depth: usize, out: &mut String) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("{:?} @{}", tree.kind(id), tree.line_of(id)));
            for &child in tree.children(id) {
                render(tree, child, depth + 1, out);
            }
        }

        let tree = SyntaxTree::parse(DEMO);
        let mut dump = String::new();
        render(&tree, tree.root().unwrap(), 0, &mut dump);
        insta::assert_snapshot!(dump, @r#"
        Class { name: "Demo" } @1
          Method { name: "main", return_type: "void", is_main: true } @2
            Body @2
              LocalVar { ty: "int", name: "x" } @3
                NumLit { text: "10", kind: Int } @3
              Print @4
                Ident { name: "x" } @4
        "#);
    }

    #[test]
    fn path_from_root_is_stable_for_reparses_of_identical_text() {
        let a = SyntaxTree::parse(DEMO);
        let b = SyntaxTree::parse(DEMO);
        let node_a = a.preorder().last().unwrap();
        let node_b = b.preorder().last().unwrap();
        assert_eq!(a.path_from_root(node_a), b.path_from_root(node_b));
    }
}
