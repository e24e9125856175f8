use jblocks_source::Span;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    Ident(String),
    Number(String),
    Str(String),
    Char(char),
    Kw(Kw),
    Punct(Punct),
    /// Text the lexer could not form into a token; the parser turns
    /// the surrounding region into an `Unknown` node.
    Error(String),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Kw {
    Class,
    Enum,
    Public,
    Private,
    Protected,
    Static,
    Final,
    Void,
    Int,
    Double,
    Float,
    Long,
    Boolean,
    Char,
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    New,
    Try,
    Catch,
    True,
    False,
    Null,
}

impl Kw {
    #[must_use]
    pub fn from_ident(ident: &str) -> Option<Self> {
        let kw = match ident {
            "class" => Kw::Class,
            "enum" => Kw::Enum,
            "public" => Kw::Public,
            "private" => Kw::Private,
            "protected" => Kw::Protected,
            "static" => Kw::Static,
            "final" => Kw::Final,
            "void" => Kw::Void,
            "int" => Kw::Int,
            "double" => Kw::Double,
            "float" => Kw::Float,
            "long" => Kw::Long,
            "boolean" => Kw::Boolean,
            "char" => Kw::Char,
            "if" => Kw::If,
            "else" => Kw::Else,
            "while" => Kw::While,
            "do" => Kw::Do,
            "for" => Kw::For,
            "switch" => Kw::Switch,
            "case" => Kw::Case,
            "default" => Kw::Default,
            "break" => Kw::Break,
            "continue" => Kw::Continue,
            "return" => Kw::Return,
            "new" => Kw::New,
            "try" => Kw::Try,
            "catch" => Kw::Catch,
            "true" => Kw::True,
            "false" => Kw::False,
            "null" => Kw::Null,
            _ => return None,
        };
        Some(kw)
    }

    /// Keywords that can open a primitive type token.
    #[must_use]
    pub fn is_primitive_type(self) -> bool {
        matches!(
            self,
            Kw::Int | Kw::Double | Kw::Float | Kw::Long | Kw::Boolean | Kw::Char | Kw::Void
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Punct {
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Colon,
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    EqEq,
    BangEq,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
}

/// A source comment, collected by the lexer into a side list rather
/// than the token stream, mirroring how the AST keeps comments out of
/// the statement structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub span: Span,
    pub text: String,
    pub is_line: bool,
}
