use std::hash::Hash;
use std::hash::Hasher;

use jblocks_source::Span;
use jblocks_syntax::AssignOp;
use jblocks_syntax::BinOp;
use jblocks_syntax::IncDecOp;
use jblocks_syntax::ListFlavor;
use jblocks_syntax::NodeId;
use rustc_hash::FxHasher;
use serde::Serialize;

/// Stable identifier for a visual block.
///
/// Derived from the block's kind and its path of child indices from
/// the tree root, so re-parsing unchanged text mints the same
/// identity for every block, and edits only disturb identities inside
/// the edited subtree. `FxHasher` is deterministic across runs,
/// unlike the std hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(u64);

impl BlockId {
    #[must_use]
    pub(crate) fn mint(tag: &str, path: &[usize]) -> Self {
        let mut hasher = FxHasher::default();
        tag.hash(&mut hasher);
        path.hash(&mut hasher);
        Self(hasher.finish())
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Closed set of block shapes the editor can render.
///
/// Statement kinds, expression kinds, and the body container are one
/// tagged union; dispatch is a match, never a downcast chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BlockKind {
    // Top-level
    Start,
    Method { name: String, return_type: String },
    Enum { name: String, constants: Vec<String> },
    Body,

    // Statements
    DeclareVariable { ty: String, name: String },
    Assign { op: AssignOp },
    IncrementDecrement { op: IncDecOp, prefix: bool },
    Print,
    If,
    While,
    DoWhile,
    ForEach { ty: String, var: String },
    Switch,
    SwitchCase { is_default: bool },
    Break,
    Continue,
    Return,
    Wait,
    MethodCall { scope: Option<String>, name: String },
    Unknown,

    // Expressions
    StringLiteral { value: String },
    IntLiteral { text: String },
    FloatLiteral { text: String },
    DoubleLiteral { text: String },
    BooleanLiteral { value: bool },
    CharLiteral { value: char },
    NullLiteral,
    Identifier { name: String },
    EnumConstant { ty: String, name: String },
    FieldAccess { qualifier: String, name: String },
    Comparison { op: BinOp },
    BinaryOperation { op: BinOp },
    List { flavor: ListFlavor },
    Array { ty: String },
    ReadInput { method: String },

    // Decoration
    Comment { text: String },
}

impl BlockKind {
    /// Discriminant label used for identity hashing and for matching
    /// blocks of the same shape during reconciliation.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Start => "start",
            BlockKind::Method { .. } => "method",
            BlockKind::Enum { .. } => "enum",
            BlockKind::Body => "body",
            BlockKind::DeclareVariable { .. } => "declare-variable",
            BlockKind::Assign { .. } => "assign",
            BlockKind::IncrementDecrement { .. } => "increment-decrement",
            BlockKind::Print => "print",
            BlockKind::If => "if",
            BlockKind::While => "while",
            BlockKind::DoWhile => "do-while",
            BlockKind::ForEach { .. } => "for-each",
            BlockKind::Switch => "switch",
            BlockKind::SwitchCase { .. } => "switch-case",
            BlockKind::Break => "break",
            BlockKind::Continue => "continue",
            BlockKind::Return => "return",
            BlockKind::Wait => "wait",
            BlockKind::MethodCall { .. } => "method-call",
            BlockKind::Unknown => "unknown",
            BlockKind::StringLiteral { .. } => "string-literal",
            BlockKind::IntLiteral { .. } => "int-literal",
            BlockKind::FloatLiteral { .. } => "float-literal",
            BlockKind::DoubleLiteral { .. } => "double-literal",
            BlockKind::BooleanLiteral { .. } => "boolean-literal",
            BlockKind::CharLiteral { .. } => "char-literal",
            BlockKind::NullLiteral => "null-literal",
            BlockKind::Identifier { .. } => "identifier",
            BlockKind::EnumConstant { .. } => "enum-constant",
            BlockKind::FieldAccess { .. } => "field-access",
            BlockKind::Comparison { .. } => "comparison",
            BlockKind::BinaryOperation { .. } => "binary-operation",
            BlockKind::List { .. } => "list",
            BlockKind::Array { .. } => "array",
            BlockKind::ReadInput { .. } => "read-input",
            BlockKind::Comment { .. } => "comment",
        }
    }

    /// Statement blocks take precedence over container and expression
    /// blocks when several share a source line.
    #[must_use]
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            BlockKind::DeclareVariable { .. }
                | BlockKind::Assign { .. }
                | BlockKind::IncrementDecrement { .. }
                | BlockKind::Print
                | BlockKind::If
                | BlockKind::While
                | BlockKind::DoWhile
                | BlockKind::ForEach { .. }
                | BlockKind::Switch
                | BlockKind::SwitchCase { .. }
                | BlockKind::Break
                | BlockKind::Continue
                | BlockKind::Return
                | BlockKind::Wait
                | BlockKind::MethodCall { .. }
                | BlockKind::Enum { .. }
                | BlockKind::Unknown
        )
    }
}

/// One visual block.
///
/// `node` is a back-reference into the syntax tree snapshot the block
/// was built from; it is meaningless against any other tree. Synthetic
/// blocks (comment decorations, the implicit empty print argument)
/// carry no node.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub node: Option<NodeId>,
    pub span: Span,
    pub line: u32,
    pub children: Vec<Block>,
    pub error: Option<String>,
    pub has_breakpoint: bool,
}

impl Block {
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

/// The visual counterpart of one syntax tree snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockTree {
    roots: Vec<Block>,
}

impl BlockTree {
    pub(crate) fn new(roots: Vec<Block>) -> Self {
        Self { roots }
    }

    #[must_use]
    pub fn roots(&self) -> &[Block] {
        &self.roots
    }

    /// Depth-first, left-to-right traversal.
    pub fn preorder(&self) -> impl Iterator<Item = &Block> {
        let mut stack: Vec<&Block> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let block = stack.pop()?;
            stack.extend(block.children.iter().rev());
            Some(block)
        })
    }

    #[must_use]
    pub fn find(&self, id: BlockId) -> Option<&Block> {
        self.preorder().find(|block| block.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: BlockId) -> bool {
        self.find(id).is_some()
    }

    /// Flag every block whose identity appears in `ids`.
    pub fn mark_breakpoints(&mut self, ids: &rustc_hash::FxHashSet<BlockId>) {
        fn mark(block: &mut Block, ids: &rustc_hash::FxHashSet<BlockId>) {
            block.has_breakpoint = ids.contains(&block.id);
            for child in &mut block.children {
                mark(child, ids);
            }
        }
        for root in &mut self.roots {
            mark(root, ids);
        }
    }
}
