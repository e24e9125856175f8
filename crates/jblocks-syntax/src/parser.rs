use jblocks_source::Span;

use crate::ast::AssignOp;
use crate::ast::BinOp;
use crate::ast::IncDecOp;
use crate::ast::ListFlavor;
use crate::ast::NodeId;
use crate::ast::NodeKind;
use crate::ast::NumKind;
use crate::ast::TreeBuilder;
use crate::error::SyntaxError;
use crate::tokens::Kw;
use crate::tokens::Punct;
use crate::tokens::Token;
use crate::tokens::TokenKind;

type Parse<T> = Result<T, SyntaxError>;

const SCANNER_READS: &[&str] = &[
    "nextLine",
    "nextInt",
    "nextDouble",
    "nextFloat",
    "nextBoolean",
    "next",
];

#[derive(Debug, Default, Clone, Copy)]
struct Modifiers {
    public: bool,
    is_static: bool,
}

/// Error-tolerant recursive descent parser.
///
/// A statement that fails to parse is replaced by an `Unknown` node
/// spanning the consumed region, and parsing resumes at the next
/// statement boundary. Only untokenizable input fails the whole parse,
/// and the lexer already degrades that to error tokens, so `parse`
/// itself is infallible.
pub(crate) struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    current: usize,
    builder: TreeBuilder,
    errors: Vec<SyntaxError>,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            current: 0,
            builder: TreeBuilder::default(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn parse(mut self) -> (TreeBuilder, Option<NodeId>, Vec<SyntaxError>) {
        let mut root = None;

        while !self.at_eof() {
            let start = self.peek().span.start_usize();
            match self.type_declaration() {
                Ok(id) if root.is_none() => root = Some(id),
                Ok(_) => {
                    self.errors.push(SyntaxError::new(
                        Span::from_bounds(start, self.prev_end()),
                        "only one top-level type is supported",
                    ));
                }
                Err(err) => {
                    self.errors.push(err);
                    self.recover();
                }
            }
        }

        (self.builder, root, self.errors)
    }

    // Declarations

    fn type_declaration(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.modifiers();

        if self.check_kw(Kw::Enum) {
            return self.enum_declaration(start);
        }

        self.expect_kw(Kw::Class, "expected a class declaration")?;
        let (name, _) = self.expect_ident("expected a class name")?;
        self.expect_punct(Punct::LBrace, "expected '{' after class name")?;

        let class = self
            .builder
            .push(NodeKind::Class { name }, Span::from_bounds(start, start));
        while !self.check_punct(Punct::RBrace) && !self.at_eof() {
            let member_start = self.peek().span.start_usize();
            match self.member() {
                Ok(member) => self.builder.add_child(class, member),
                Err(err) => {
                    self.errors.push(err);
                    self.recover();
                    let unknown = self.builder.push(
                        NodeKind::Unknown,
                        Span::from_bounds(member_start, self.prev_end().max(member_start)),
                    );
                    self.builder.add_child(class, unknown);
                }
            }
        }
        let end = self.expect_punct(Punct::RBrace, "expected '}' to close the class")?;

        self.builder
            .set_span(class, Span::from_bounds(start, end.end_usize()));
        Ok(class)
    }

    fn member(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        let mods = self.modifiers();

        if self.check_kw(Kw::Enum) {
            return self.enum_declaration(start);
        }

        let ty = self.type_name()?;
        let (name, _) = self.expect_ident("expected a member name")?;

        if self.check_punct(Punct::LParen) {
            return self.method(start, mods, ty, name);
        }

        // Field, with an optional initializer.
        let field = self
            .builder
            .push(NodeKind::Field { ty, name }, Span::from_bounds(start, start));
        if self.eat_punct(Punct::Eq).is_some() {
            let init = self.expression()?;
            self.builder.add_child(field, init);
        }
        let semi = self.expect_punct(Punct::Semi, "expected ';' after field declaration")?;
        self.builder
            .set_span(field, Span::from_bounds(start, semi.end_usize()));
        Ok(field)
    }

    fn method(&mut self, start: usize, mods: Modifiers, return_type: String, name: String) -> Parse<NodeId> {
        self.expect_punct(Punct::LParen, "expected '(' after method name")?;
        let mut param_count = 0;
        if !self.check_punct(Punct::RParen) {
            loop {
                self.type_name()?;
                self.expect_ident("expected a parameter name")?;
                param_count += 1;
                if self.eat_punct(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen, "expected ')' after parameters")?;

        let is_main = name == "main" && mods.public && mods.is_static && param_count == 1;
        let body = self.body()?;
        let end = self.builder.span_of(body).end_usize();

        let method = self.builder.push(
            NodeKind::Method {
                name,
                return_type,
                is_main,
            },
            Span::from_bounds(start, end),
        );
        self.builder.add_child(method, body);
        Ok(method)
    }

    fn enum_declaration(&mut self, start: usize) -> Parse<NodeId> {
        self.expect_kw(Kw::Enum, "expected 'enum'")?;
        let (name, _) = self.expect_ident("expected an enum name")?;
        self.expect_punct(Punct::LBrace, "expected '{' after enum name")?;

        let mut constants = Vec::new();
        while !self.check_punct(Punct::RBrace) && !self.at_eof() {
            let (constant, _) = self.expect_ident("expected an enum constant")?;
            constants.push(constant);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.eat_punct(Punct::Semi);
        let end = self.expect_punct(Punct::RBrace, "expected '}' to close the enum")?;

        Ok(self.builder.push(
            NodeKind::EnumDecl { name, constants },
            Span::from_bounds(start, end.end_usize()),
        ))
    }

    // Statements

    /// A brace-delimited statement list. The node's span covers both
    /// braces, which the rewriter relies on when splicing statements
    /// in and out.
    fn body(&mut self) -> Parse<NodeId> {
        let open = self.expect_punct(Punct::LBrace, "expected '{'")?;
        let body = self.builder.push(NodeKind::Body, open);

        while !self.check_punct(Punct::RBrace) && !self.at_eof() {
            let statement = self.statement();
            self.builder.add_child(body, statement);
        }

        let close = self.expect_punct(Punct::RBrace, "expected '}'")?;
        self.builder.set_span(
            body,
            Span::from_bounds(open.start_usize(), close.end_usize()),
        );
        Ok(body)
    }

    /// Parse one statement, degrading to `Unknown` on failure so a
    /// single bad statement never poisons the rest of the document.
    fn statement(&mut self) -> NodeId {
        let start = self.peek().span.start_usize();
        match self.try_statement() {
            Ok(id) => id,
            Err(err) => {
                self.errors.push(err);
                self.recover();
                self.builder.push(
                    NodeKind::Unknown,
                    Span::from_bounds(start, self.prev_end().max(start)),
                )
            }
        }
    }

    fn try_statement(&mut self) -> Parse<NodeId> {
        match &self.peek().kind {
            TokenKind::Punct(Punct::LBrace) => self.body(),
            TokenKind::Kw(Kw::Enum) => {
                let start = self.peek().span.start_usize();
                self.enum_declaration(start)
            }
            TokenKind::Kw(Kw::If) => self.if_statement(),
            TokenKind::Kw(Kw::While) => self.while_statement(),
            TokenKind::Kw(Kw::Do) => self.do_while_statement(),
            TokenKind::Kw(Kw::For) => self.for_statement(),
            TokenKind::Kw(Kw::Switch) => self.switch_statement(),
            TokenKind::Kw(Kw::Try) => self.wait_statement(),
            TokenKind::Kw(Kw::Break) => self.jump_statement(Kw::Break, NodeKind::Break),
            TokenKind::Kw(Kw::Continue) => self.jump_statement(Kw::Continue, NodeKind::Continue),
            TokenKind::Kw(Kw::Return) => self.return_statement(),
            TokenKind::Kw(kw) if kw.is_primitive_type() && *kw != Kw::Void => {
                self.local_variable()
            }
            TokenKind::Kw(Kw::Final) => self.local_variable(),
            TokenKind::Ident(_) if self.looks_like_declaration() => self.local_variable(),
            _ => self.expression_statement(),
        }
    }

    fn local_variable(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.eat_kw(Kw::Final);
        let ty = self.type_name()?;
        let (name, _) = self.expect_ident("expected a variable name")?;

        let node = self.builder.push(
            NodeKind::LocalVar { ty, name },
            Span::from_bounds(start, start),
        );
        if self.eat_punct(Punct::Eq).is_some() {
            let init = self.expression()?;
            self.builder.add_child(node, init);
        }
        let semi = self.expect_punct(Punct::Semi, "expected ';' after variable declaration")?;
        self.builder
            .set_span(node, Span::from_bounds(start, semi.end_usize()));
        Ok(node)
    }

    fn if_statement(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(Kw::If, "expected 'if'")?;
        self.expect_punct(Punct::LParen, "expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.expect_punct(Punct::RParen, "expected ')' after condition")?;

        if !self.check_punct(Punct::LBrace) {
            return Err(self.error_here("if body must be a block"));
        }
        let then_body = self.body()?;

        let node = self
            .builder
            .push(NodeKind::If, Span::from_bounds(start, start));
        self.builder.add_child(node, condition);
        self.builder.add_child(node, then_body);

        let mut end = self.builder.span_of(then_body).end_usize();
        if self.eat_kw(Kw::Else) {
            let alternative = if self.check_kw(Kw::If) {
                self.if_statement()?
            } else if self.check_punct(Punct::LBrace) {
                self.body()?
            } else {
                return Err(self.error_here("else body must be a block"));
            };
            self.builder.add_child(node, alternative);
            end = self.builder.span_of(alternative).end_usize();
        }

        self.builder.set_span(node, Span::from_bounds(start, end));
        Ok(node)
    }

    fn while_statement(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(Kw::While, "expected 'while'")?;
        self.expect_punct(Punct::LParen, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.expect_punct(Punct::RParen, "expected ')' after condition")?;
        let body = self.body()?;

        let end = self.builder.span_of(body).end_usize();
        let node = self
            .builder
            .push(NodeKind::While, Span::from_bounds(start, end));
        self.builder.add_child(node, condition);
        self.builder.add_child(node, body);
        Ok(node)
    }

    fn do_while_statement(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(Kw::Do, "expected 'do'")?;
        let body = self.body()?;
        self.expect_kw(Kw::While, "expected 'while' after do body")?;
        self.expect_punct(Punct::LParen, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.expect_punct(Punct::RParen, "expected ')' after condition")?;
        let semi = self.expect_punct(Punct::Semi, "expected ';' after do-while")?;

        let node = self.builder.push(
            NodeKind::DoWhile,
            Span::from_bounds(start, semi.end_usize()),
        );
        self.builder.add_child(node, body);
        self.builder.add_child(node, condition);
        Ok(node)
    }

    /// Only the enhanced `for (Type name : iterable)` form is
    /// recognized; a classic three-clause loop degrades to `Unknown`.
    fn for_statement(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(Kw::For, "expected 'for'")?;
        self.expect_punct(Punct::LParen, "expected '(' after 'for'")?;
        let ty = self.type_name()?;
        let (var, _) = self.expect_ident("expected a loop variable")?;
        self.expect_punct(Punct::Colon, "only for-each loops are supported")?;
        let iterable = self.expression()?;
        self.expect_punct(Punct::RParen, "expected ')' after loop header")?;
        let body = self.body()?;

        let end = self.builder.span_of(body).end_usize();
        let node = self
            .builder
            .push(NodeKind::For { ty, var }, Span::from_bounds(start, end));
        self.builder.add_child(node, iterable);
        self.builder.add_child(node, body);
        Ok(node)
    }

    fn switch_statement(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(Kw::Switch, "expected 'switch'")?;
        self.expect_punct(Punct::LParen, "expected '(' after 'switch'")?;
        let selector = self.expression()?;
        self.expect_punct(Punct::RParen, "expected ')' after selector")?;
        self.expect_punct(Punct::LBrace, "expected '{' to open the switch")?;

        let node = self
            .builder
            .push(NodeKind::Switch, Span::from_bounds(start, start));
        self.builder.add_child(node, selector);

        while !self.check_punct(Punct::RBrace) && !self.at_eof() {
            let case = self.switch_case()?;
            self.builder.add_child(node, case);
        }

        let close = self.expect_punct(Punct::RBrace, "expected '}' to close the switch")?;
        self.builder
            .set_span(node, Span::from_bounds(start, close.end_usize()));
        Ok(node)
    }

    fn switch_case(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        let (is_default, label) = if self.eat_kw(Kw::Case) {
            (false, Some(self.expression()?))
        } else if self.eat_kw(Kw::Default) {
            (true, None)
        } else {
            return Err(self.error_here("expected 'case' or 'default'"));
        };
        let colon = self.expect_punct(Punct::Colon, "expected ':' after case label")?;

        let case = self.builder.push(
            NodeKind::SwitchCase { is_default },
            Span::from_bounds(start, start),
        );
        if let Some(label) = label {
            self.builder.add_child(case, label);
        }

        // The case body is a synthetic block: no braces, spanning from
        // the colon to the last statement before the next label.
        let body = self.builder.push(NodeKind::Body, colon);
        self.builder.add_child(case, body);
        let body_start = colon.end_usize();
        while !self.check_punct(Punct::RBrace)
            && !self.check_kw(Kw::Case)
            && !self.check_kw(Kw::Default)
            && !self.at_eof()
        {
            let statement = self.statement();
            self.builder.add_child(body, statement);
        }
        let body_end = self.prev_end().max(body_start);
        self.builder
            .set_span(body, Span::from_bounds(body_start, body_end));
        self.builder
            .set_span(case, Span::from_bounds(start, body_end));
        Ok(case)
    }

    /// Recognizes `try { Thread.sleep(n); } catch ...` as a wait.
    /// Any other try statement is unsupported and degrades.
    fn wait_statement(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(Kw::Try, "expected 'try'")?;
        let body = self.body()?;

        while self.eat_kw(Kw::Catch) {
            self.expect_punct(Punct::LParen, "expected '(' after 'catch'")?;
            self.type_name()?;
            self.expect_ident("expected an exception variable")?;
            self.expect_punct(Punct::RParen, "expected ')' after catch parameter")?;
            self.body()?;
        }
        let end = self.prev_end();

        let unsupported =
            || SyntaxError::new(Span::from_bounds(start, end), "unsupported try statement");
        let children = self.builder.children(body).to_vec();
        let &[sleep_call] = children.as_slice() else {
            return Err(unsupported());
        };
        let is_sleep = matches!(
            self.builder.kind(sleep_call),
            NodeKind::CallStmt { scope: Some(scope), name } if scope == "Thread" && name == "sleep"
        );
        if !is_sleep {
            return Err(unsupported());
        }
        let Some(duration) = self.builder.children(sleep_call).first().copied() else {
            return Err(unsupported());
        };

        let node = self
            .builder
            .push(NodeKind::Wait, Span::from_bounds(start, end));
        self.builder.add_child(node, duration);
        Ok(node)
    }

    fn jump_statement(&mut self, kw: Kw, kind: NodeKind) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(kw, "expected a jump statement")?;
        let semi = self.expect_punct(Punct::Semi, "expected ';'")?;
        Ok(self
            .builder
            .push(kind, Span::from_bounds(start, semi.end_usize())))
    }

    fn return_statement(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(Kw::Return, "expected 'return'")?;
        let value = if self.check_punct(Punct::Semi) {
            None
        } else {
            Some(self.expression()?)
        };
        let semi = self.expect_punct(Punct::Semi, "expected ';' after return")?;

        let node = self.builder.push(
            NodeKind::Return,
            Span::from_bounds(start, semi.end_usize()),
        );
        if let Some(value) = value {
            self.builder.add_child(node, value);
        }
        Ok(node)
    }

    fn expression_statement(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();

        // Prefix increment and decrement.
        if let TokenKind::Punct(op @ (Punct::PlusPlus | Punct::MinusMinus)) = self.peek().kind {
            self.advance();
            let target = self.expression()?;
            let semi = self.expect_punct(Punct::Semi, "expected ';'")?;
            let node = self.builder.push(
                NodeKind::IncDec {
                    op: inc_dec_op(op),
                    prefix: true,
                },
                Span::from_bounds(start, semi.end_usize()),
            );
            self.builder.add_child(node, target);
            return Ok(node);
        }

        let expr = self.expression()?;

        if let TokenKind::Punct(op) = self.peek().kind {
            if let Some(op) = assign_op(op) {
                self.advance();
                let value = self.expression()?;
                let semi = self.expect_punct(Punct::Semi, "expected ';' after assignment")?;
                let node = self.builder.push(
                    NodeKind::Assign { op },
                    Span::from_bounds(start, semi.end_usize()),
                );
                self.builder.add_child(node, expr);
                self.builder.add_child(node, value);
                return Ok(node);
            }
            if matches!(op, Punct::PlusPlus | Punct::MinusMinus) {
                self.advance();
                let semi = self.expect_punct(Punct::Semi, "expected ';'")?;
                let node = self.builder.push(
                    NodeKind::IncDec {
                        op: inc_dec_op(op),
                        prefix: false,
                    },
                    Span::from_bounds(start, semi.end_usize()),
                );
                self.builder.add_child(node, expr);
                return Ok(node);
            }
        }

        let semi = self.expect_punct(Punct::Semi, "expected ';' after expression")?;
        let span = Span::from_bounds(start, semi.end_usize());

        // A bare call expression becomes a statement node in place;
        // `System.out.println` is special-cased as a print statement.
        match self.builder.kind(expr).clone() {
            NodeKind::CallExpr { scope, name } => {
                let kind = if scope.as_deref() == Some("System.out") && name == "println" {
                    NodeKind::Print
                } else {
                    NodeKind::CallStmt { scope, name }
                };
                self.builder.set_kind(expr, kind);
                self.builder.set_span(expr, span);
                Ok(expr)
            }
            _ => Err(SyntaxError::new(span, "expression is not a statement")),
        }
    }

    // Expressions, by precedence.

    fn expression(&mut self) -> Parse<NodeId> {
        self.or_expression()
    }

    fn or_expression(&mut self) -> Parse<NodeId> {
        self.binary_level(&[(Punct::OrOr, BinOp::Or)], Self::and_expression)
    }

    fn and_expression(&mut self) -> Parse<NodeId> {
        self.binary_level(&[(Punct::AndAnd, BinOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Parse<NodeId> {
        self.binary_level(
            &[(Punct::EqEq, BinOp::Eq), (Punct::BangEq, BinOp::Ne)],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Parse<NodeId> {
        self.binary_level(
            &[
                (Punct::Lt, BinOp::Lt),
                (Punct::Gt, BinOp::Gt),
                (Punct::Le, BinOp::Le),
                (Punct::Ge, BinOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Parse<NodeId> {
        self.binary_level(
            &[(Punct::Plus, BinOp::Add), (Punct::Minus, BinOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Parse<NodeId> {
        self.binary_level(
            &[
                (Punct::Star, BinOp::Mul),
                (Punct::Slash, BinOp::Div),
                (Punct::Percent, BinOp::Rem),
            ],
            Self::unary,
        )
    }

    fn binary_level(
        &mut self,
        ops: &[(Punct, BinOp)],
        next: fn(&mut Self) -> Parse<NodeId>,
    ) -> Parse<NodeId> {
        let mut left = next(self)?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Punct(p) => ops.iter().find(|(candidate, _)| *candidate == p),
                _ => None,
            };
            let Some(&(_, op)) = op else {
                return Ok(left);
            };
            self.advance();
            let right = next(self)?;
            let span = Span::from_bounds(
                self.builder.span_of(left).start_usize(),
                self.builder.span_of(right).end_usize(),
            );
            let node = self.builder.push(NodeKind::Binary { op }, span);
            self.builder.add_child(node, left);
            self.builder.add_child(node, right);
            left = node;
        }
    }

    fn unary(&mut self) -> Parse<NodeId> {
        // A leading minus folds into the number literal it precedes.
        if self.check_punct(Punct::Minus) {
            if let TokenKind::Number(_) = self.nth(1).kind {
                let minus = self.advance();
                let number = self.advance();
                let TokenKind::Number(text) = number.kind else {
                    return Err(self.error_here("expected a number"));
                };
                let kind = classify_number(&text);
                return Ok(self.builder.push(
                    NodeKind::NumLit {
                        text: format!("-{text}"),
                        kind,
                    },
                    Span::from_bounds(minus.span.start_usize(), number.span.end_usize()),
                ));
            }
        }
        self.primary()
    }

    fn primary(&mut self) -> Parse<NodeId> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Str(value) => {
                self.advance();
                Ok(self.builder.push(NodeKind::StrLit { value }, token.span))
            }
            TokenKind::Number(text) => {
                self.advance();
                let kind = classify_number(&text);
                Ok(self
                    .builder
                    .push(NodeKind::NumLit { text, kind }, token.span))
            }
            TokenKind::Char(value) => {
                self.advance();
                Ok(self.builder.push(NodeKind::CharLit { value }, token.span))
            }
            TokenKind::Kw(Kw::True) => {
                self.advance();
                Ok(self
                    .builder
                    .push(NodeKind::BoolLit { value: true }, token.span))
            }
            TokenKind::Kw(Kw::False) => {
                self.advance();
                Ok(self
                    .builder
                    .push(NodeKind::BoolLit { value: false }, token.span))
            }
            TokenKind::Kw(Kw::Null) => {
                self.advance();
                Ok(self.builder.push(NodeKind::NullLit, token.span))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect_punct(Punct::RParen, "expected ')'")?;
                Ok(inner)
            }
            TokenKind::Punct(Punct::LBrace) => self.array_initializer(),
            TokenKind::Kw(Kw::New) => self.new_expression(),
            TokenKind::Ident(_) => self.name_or_call(),
            TokenKind::Error(message) => Err(SyntaxError::new(token.span, message)),
            _ => Err(self.error_here("expected an expression")),
        }
    }

    fn array_initializer(&mut self) -> Parse<NodeId> {
        let open = self.expect_punct(Punct::LBrace, "expected '{'")?;
        let node = self.builder.push(NodeKind::ArrayInit, open);

        if !self.check_punct(Punct::RBrace) {
            loop {
                let element = self.expression()?;
                self.builder.add_child(node, element);
                if self.eat_punct(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect_punct(Punct::RBrace, "expected '}' to close the initializer")?;
        self.builder.set_span(
            node,
            Span::from_bounds(open.start_usize(), close.end_usize()),
        );
        Ok(node)
    }

    fn new_expression(&mut self) -> Parse<NodeId> {
        let start = self.peek().span.start_usize();
        self.expect_kw(Kw::New, "expected 'new'")?;

        let base_token = self.peek().clone();
        let base = match &base_token.kind {
            TokenKind::Kw(kw) if kw.is_primitive_type() => {
                self.advance();
                base_token.span.text(self.source).to_string()
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            _ => return Err(self.error_here("expected a type after 'new'")),
        };
        if self.check_punct(Punct::Lt) {
            self.skip_generics()?;
        }

        if self.check_punct(Punct::LBracket) {
            let mut ty = base;
            while self.eat_punct(Punct::LBracket).is_some() {
                if !self.check_punct(Punct::RBracket) {
                    // Explicit dimension sizes are parsed but not kept;
                    // the block model only carries initializer values.
                    self.expression()?;
                }
                self.expect_punct(Punct::RBracket, "expected ']'")?;
                ty.push_str("[]");
            }
            let node = self
                .builder
                .push(NodeKind::ArrayNew { ty }, Span::from_bounds(start, start));
            let mut end = self.prev_end();
            if self.check_punct(Punct::LBrace) {
                let init = self.array_initializer()?;
                end = self.builder.span_of(init).end_usize();
                self.builder.add_child(node, init);
            }
            self.builder.set_span(node, Span::from_bounds(start, end));
            return Ok(node);
        }

        let (args, end) = self.call_arguments()?;
        if base == "ArrayList" {
            let node = self.builder.push(
                NodeKind::ListCtor {
                    flavor: ListFlavor::ArrayListNew,
                },
                Span::from_bounds(start, end),
            );
            // `new ArrayList<>(Arrays.asList(...))` flattens to the
            // inner list's elements.
            match args[..] {
                [single] if matches!(self.builder.kind(single), NodeKind::ListCtor { .. }) => {
                    for item in self.builder.children(single).to_vec() {
                        self.builder.add_child(node, item);
                    }
                }
                _ => {
                    for arg in args {
                        self.builder.add_child(node, arg);
                    }
                }
            }
            return Ok(node);
        }

        let node = self.builder.push(
            NodeKind::CallExpr {
                scope: None,
                name: base,
            },
            Span::from_bounds(start, end),
        );
        for arg in args {
            self.builder.add_child(node, arg);
        }
        Ok(node)
    }

    fn name_or_call(&mut self) -> Parse<NodeId> {
        let (first, first_span) = self.expect_ident("expected a name")?;
        let start = first_span.start_usize();

        // Unqualified call: `doThing(...)`.
        if self.check_punct(Punct::LParen) {
            let (args, end) = self.call_arguments()?;
            return Ok(self.finish_call(None, first, args, Span::from_bounds(start, end)));
        }

        let mut parts = vec![first];
        loop {
            if !self.check_punct(Punct::Dot) {
                break;
            }
            let TokenKind::Ident(next) = &self.nth(1).kind else {
                break;
            };
            let next = next.clone();

            if matches!(self.nth(2).kind, TokenKind::Punct(Punct::LParen)) {
                self.advance();
                self.advance();
                let scope = parts.join(".");
                let (args, end) = self.call_arguments()?;
                return Ok(self.finish_call(
                    Some(scope),
                    next,
                    args,
                    Span::from_bounds(start, end),
                ));
            }

            self.advance();
            self.advance();
            parts.push(next);
        }

        let span = Span::from_bounds(start, self.prev_end());
        if parts.len() == 1 {
            let name = parts.remove(0);
            return Ok(self.builder.push(NodeKind::Ident { name }, span));
        }

        let name = parts.pop().unwrap_or_default();
        let qualifier = parts.join(".");
        let kind = if is_enum_constant_reference(&qualifier, &name, parts.len()) {
            NodeKind::EnumConst {
                ty: qualifier,
                name,
            }
        } else {
            NodeKind::FieldAccess { qualifier, name }
        };
        Ok(self.builder.push(kind, span))
    }

    fn finish_call(
        &mut self,
        scope: Option<String>,
        name: String,
        args: Vec<NodeId>,
        span: Span,
    ) -> NodeId {
        let kind = if scope.as_deref() == Some("Arrays") && name == "asList" {
            NodeKind::ListCtor {
                flavor: ListFlavor::ArraysAsList,
            }
        } else if scope.as_deref() == Some("List") && name == "of" {
            NodeKind::ListCtor {
                flavor: ListFlavor::ListOf,
            }
        } else if scope.is_some() && SCANNER_READS.contains(&name.as_str()) {
            NodeKind::ScannerRead { method: name }
        } else {
            NodeKind::CallExpr { scope, name }
        };
        let node = self.builder.push(kind, span);
        for arg in args {
            self.builder.add_child(node, arg);
        }
        node
    }

    fn call_arguments(&mut self) -> Parse<(Vec<NodeId>, usize)> {
        self.expect_punct(Punct::LParen, "expected '('")?;
        let mut args = Vec::new();
        if !self.check_punct(Punct::RParen) {
            loop {
                args.push(self.expression()?);
                if self.eat_punct(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect_punct(Punct::RParen, "expected ')' after arguments")?;
        Ok((args, close.end_usize()))
    }

    // Token helpers

    fn modifiers(&mut self) -> Modifiers {
        let mut mods = Modifiers::default();
        loop {
            match self.peek().kind {
                TokenKind::Kw(Kw::Public) => mods.public = true,
                TokenKind::Kw(Kw::Private | Kw::Protected | Kw::Final) => {}
                TokenKind::Kw(Kw::Static) => mods.is_static = true,
                _ => return mods,
            }
            self.advance();
        }
    }

    /// Consume a type and render it without interior whitespace, so
    /// `String []` and `List <Integer>` normalize to one spelling.
    fn type_name(&mut self) -> Parse<String> {
        let start = self.peek().span.start_usize();
        match &self.peek().kind {
            TokenKind::Kw(kw) if kw.is_primitive_type() => {
                self.advance();
            }
            TokenKind::Ident(_) => {
                self.advance();
                if self.check_punct(Punct::Lt) {
                    self.skip_generics()?;
                }
            }
            _ => return Err(self.error_here("expected a type")),
        }
        while self.check_punct(Punct::LBracket)
            && matches!(self.nth(1).kind, TokenKind::Punct(Punct::RBracket))
        {
            self.advance();
            self.advance();
        }
        Ok(self.source[start..self.prev_end()]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect())
    }

    fn skip_generics(&mut self) -> Parse<()> {
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenKind::Punct(Punct::Lt) => depth += 1,
                TokenKind::Punct(Punct::Gt) => depth -= 1,
                TokenKind::Punct(Punct::Comma | Punct::Dot) | TokenKind::Ident(_) => {}
                _ => return Err(self.error_here("malformed type arguments")),
            }
            self.advance();
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Lookahead for `Type name ...` without consuming anything, to
    /// tell a declaration apart from an expression statement.
    fn looks_like_declaration(&self) -> bool {
        let mut i = 1;

        // Optional generics on the base type.
        if matches!(self.nth(i).kind, TokenKind::Punct(Punct::Lt)) {
            let mut depth = 0usize;
            loop {
                match self.nth(i).kind {
                    TokenKind::Punct(Punct::Lt) => depth += 1,
                    TokenKind::Punct(Punct::Gt) => depth -= 1,
                    TokenKind::Punct(Punct::Comma | Punct::Dot) | TokenKind::Ident(_) => {}
                    _ => return false,
                }
                i += 1;
                if depth == 0 {
                    break;
                }
            }
        }

        while matches!(self.nth(i).kind, TokenKind::Punct(Punct::LBracket))
            && matches!(self.nth(i + 1).kind, TokenKind::Punct(Punct::RBracket))
        {
            i += 2;
        }

        matches!(self.nth(i).kind, TokenKind::Ident(_))
    }

    /// Skip to the next statement boundary after a parse failure.
    fn recover(&mut self) {
        while !self.at_eof() {
            if self.check_punct(Punct::RBrace) {
                return;
            }
            let token = self.advance();
            match token.kind {
                TokenKind::Punct(Punct::Semi) => return,
                TokenKind::Punct(Punct::LBrace) => {
                    let mut depth = 1usize;
                    while depth > 0 && !self.at_eof() {
                        match self.advance().kind {
                            TokenKind::Punct(Punct::LBrace) => depth += 1,
                            TokenKind::Punct(Punct::RBrace) => depth -= 1,
                            _ => {}
                        }
                    }
                    return;
                }
                _ => {}
            }
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn nth(&self, n: usize) -> &Token {
        &self.tokens[(self.current + n).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.current += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn prev_end(&self) -> usize {
        if self.current == 0 {
            0
        } else {
            self.tokens[self.current - 1].span.end_usize()
        }
    }

    fn check_punct(&self, punct: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(punct)
    }

    fn check_kw(&self, kw: Kw) -> bool {
        self.peek().kind == TokenKind::Kw(kw)
    }

    fn eat_punct(&mut self, punct: Punct) -> Option<Span> {
        if self.check_punct(punct) {
            Some(self.advance().span)
        } else {
            None
        }
    }

    fn eat_kw(&mut self, kw: Kw) -> bool {
        if self.check_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: Punct, message: &str) -> Parse<Span> {
        self.eat_punct(punct)
            .ok_or_else(|| self.error_here(message))
    }

    fn expect_kw(&mut self, kw: Kw, message: &str) -> Parse<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Parse<(String, Span)> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                Ok((name, self.advance().span))
            }
            _ => Err(self.error_here(message)),
        }
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        SyntaxError::new(self.peek().span, message.to_string())
    }
}

fn classify_number(text: &str) -> NumKind {
    if text.ends_with(['f', 'F']) {
        NumKind::Float
    } else if text.ends_with(['d', 'D']) || text.contains('.') {
        NumKind::Double
    } else {
        NumKind::Int
    }
}

fn assign_op(punct: Punct) -> Option<AssignOp> {
    let op = match punct {
        Punct::Eq => AssignOp::Assign,
        Punct::PlusEq => AssignOp::AddAssign,
        Punct::MinusEq => AssignOp::SubAssign,
        Punct::StarEq => AssignOp::MulAssign,
        Punct::SlashEq => AssignOp::DivAssign,
        _ => return None,
    };
    Some(op)
}

fn inc_dec_op(punct: Punct) -> IncDecOp {
    if punct == Punct::PlusPlus {
        IncDecOp::Increment
    } else {
        IncDecOp::Decrement
    }
}

/// `Direction.NORTH` is an enum constant reference when the qualifier
/// is a simple capitalized name and the constant is all uppercase.
fn is_enum_constant_reference(qualifier: &str, name: &str, qualifier_parts: usize) -> bool {
    qualifier_parts == 1
        && qualifier.chars().next().is_some_and(char::is_uppercase)
        && name.chars().any(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use crate::ast::BinOp;
    use crate::ast::ListFlavor;
    use crate::ast::NodeId;
    use crate::ast::NodeKind;
    use crate::ast::NumKind;
    use crate::ast::SyntaxTree;

    fn main_body(tree: &SyntaxTree) -> NodeId {
        let class = tree.root().expect("tree has a root");
        let method = tree.children(class)[0];
        assert!(matches!(
            tree.kind(method),
            NodeKind::Method { is_main: true, .. }
        ));
        tree.children(method)[0]
    }

    fn wrap(statements: &str) -> String {
        format!(
            "public class Demo {{\n    public static void main(String[] args) {{\n{statements}\n    }}\n}}\n"
        )
    }

    #[test]
    fn parses_the_demo_program_shape() {
        let source = wrap("        int x = 10;\n        System.out.println(x);");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let statements = tree.children(body);
        assert_eq!(statements.len(), 2);
        assert!(matches!(
            tree.kind(statements[0]),
            NodeKind::LocalVar { ty, name } if ty == "int" && name == "x"
        ));
        assert!(matches!(tree.kind(statements[1]), NodeKind::Print));
        assert!(tree.errors().is_empty());
    }

    #[test]
    fn statement_spans_include_the_semicolon() {
        let source = wrap("        int x = 10;");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let decl = tree.children(body)[0];
        assert_eq!(tree.text_of(decl), "int x = 10;");
    }

    #[test]
    fn if_with_empty_body_has_condition_and_block() {
        let source = wrap("        if (true) { }");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let if_node = tree.children(body)[0];
        assert!(matches!(tree.kind(if_node), NodeKind::If));
        let children = tree.children(if_node);
        assert_eq!(children.len(), 2);
        assert!(matches!(
            tree.kind(children[0]),
            NodeKind::BoolLit { value: true }
        ));
        assert!(matches!(tree.kind(children[1]), NodeKind::Body));
        assert!(tree.children(children[1]).is_empty());
    }

    #[test]
    fn else_if_chains_nest_as_if_children() {
        let source = wrap("        if (x > 1) { } else if (x > 0) { } else { }");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let outer = tree.children(body)[0];
        let outer_children = tree.children(outer);
        assert_eq!(outer_children.len(), 3);
        let inner = outer_children[2];
        assert!(matches!(tree.kind(inner), NodeKind::If));
        assert_eq!(tree.children(inner).len(), 3);
    }

    #[test]
    fn bad_statement_degrades_to_unknown_and_parsing_continues() {
        let source = wrap("        int = ;\n        int y = 2;");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let statements = tree.children(body);
        assert_eq!(statements.len(), 2);
        assert!(matches!(tree.kind(statements[0]), NodeKind::Unknown));
        assert!(matches!(
            tree.kind(statements[1]),
            NodeKind::LocalVar { name, .. } if name == "y"
        ));
        assert!(!tree.errors().is_empty());
    }

    #[test]
    fn thread_sleep_in_try_becomes_a_wait() {
        let source = wrap(
            "        try {\n            Thread.sleep(1000);\n        } catch (InterruptedException e) {\n        }",
        );
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let wait = tree.children(body)[0];
        assert!(matches!(tree.kind(wait), NodeKind::Wait));
        let duration = tree.children(wait)[0];
        assert!(matches!(
            tree.kind(duration),
            NodeKind::NumLit { text, kind: NumKind::Int } if text == "1000"
        ));
    }

    #[test]
    fn other_try_statements_are_unknown() {
        let source = wrap("        try {\n            int x = 1;\n        } catch (Exception e) {\n        }");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        assert!(matches!(tree.kind(tree.children(body)[0]), NodeKind::Unknown));
    }

    #[test]
    fn switch_builds_cases_with_synthetic_bodies() {
        let source = wrap(
            "        switch (direction) {\n            case NORTH:\n                System.out.println(\"up\");\n                break;\n            default:\n                break;\n        }",
        );
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let switch = tree.children(body)[0];
        assert!(matches!(tree.kind(switch), NodeKind::Switch));
        let children = tree.children(switch);
        assert_eq!(children.len(), 3);
        assert!(matches!(tree.kind(children[0]), NodeKind::Ident { .. }));
        assert!(matches!(
            tree.kind(children[1]),
            NodeKind::SwitchCase { is_default: false }
        ));
        assert!(matches!(
            tree.kind(children[2]),
            NodeKind::SwitchCase { is_default: true }
        ));
        // First case: label + body holding print and break.
        let case_children = tree.children(children[1]);
        assert_eq!(case_children.len(), 2);
        let case_body = case_children[1];
        assert_eq!(tree.children(case_body).len(), 2);
    }

    #[test]
    fn enhanced_for_captures_type_and_variable() {
        let source = wrap("        for (int n : numbers) {\n            System.out.println(n);\n        }");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let for_node = tree.children(body)[0];
        assert!(matches!(
            tree.kind(for_node),
            NodeKind::For { ty, var } if ty == "int" && var == "n"
        ));
        let children = tree.children(for_node);
        assert!(matches!(tree.kind(children[0]), NodeKind::Ident { name } if name == "numbers"));
        assert!(matches!(tree.kind(children[1]), NodeKind::Body));
    }

    #[test]
    fn classic_for_loops_degrade_to_unknown() {
        let source = wrap("        for (int i = 0; i < 10; i++) { }");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        assert!(matches!(tree.kind(tree.children(body)[0]), NodeKind::Unknown));
    }

    #[test]
    fn list_of_becomes_a_list_constructor() {
        let source = wrap("        List<Integer> xs = List.of(1, 2, 3);");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let decl = tree.children(body)[0];
        assert!(matches!(
            tree.kind(decl),
            NodeKind::LocalVar { ty, .. } if ty == "List<Integer>"
        ));
        let init = tree.children(decl)[0];
        assert!(matches!(
            tree.kind(init),
            NodeKind::ListCtor { flavor: ListFlavor::ListOf }
        ));
        assert_eq!(tree.children(init).len(), 3);
    }

    #[test]
    fn array_list_wrapping_as_list_flattens_to_elements() {
        let source = wrap("        List<Integer> xs = new ArrayList<>(Arrays.asList(1, 2));");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let init = tree.children(tree.children(body)[0])[0];
        assert!(matches!(
            tree.kind(init),
            NodeKind::ListCtor { flavor: ListFlavor::ArrayListNew }
        ));
        assert_eq!(tree.children(init).len(), 2);
    }

    #[test]
    fn array_initializer_nests() {
        let source = wrap("        int[][] grid = new int[][] { { 1, 2 }, { 3 } };");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let decl = tree.children(body)[0];
        let array_new = tree.children(decl)[0];
        assert!(matches!(
            tree.kind(array_new),
            NodeKind::ArrayNew { ty } if ty == "int[][]"
        ));
        let outer = tree.children(array_new)[0];
        assert!(matches!(tree.kind(outer), NodeKind::ArrayInit));
        assert_eq!(tree.children(outer).len(), 2);
        assert_eq!(tree.children(tree.children(outer)[0]).len(), 2);
    }

    #[test]
    fn qualified_uppercase_name_is_an_enum_constant() {
        let source = wrap("        Direction d = Direction.NORTH;");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let init = tree.children(tree.children(body)[0])[0];
        assert!(matches!(
            tree.kind(init),
            NodeKind::EnumConst { ty, name } if ty == "Direction" && name == "NORTH"
        ));
    }

    #[test]
    fn scanner_reads_are_recognized() {
        let source = wrap("        String line = scanner.nextLine();");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let init = tree.children(tree.children(body)[0])[0];
        assert!(matches!(
            tree.kind(init),
            NodeKind::ScannerRead { method } if method == "nextLine"
        ));
    }

    #[test]
    fn comparison_and_math_operators_are_distinguished() {
        let source = wrap("        boolean b = x + 1 > 2;");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let init = tree.children(tree.children(body)[0])[0];
        let NodeKind::Binary { op } = tree.kind(init) else {
            panic!("expected a binary expression");
        };
        assert_eq!(*op, BinOp::Gt);
        assert!(op.is_comparison());
        let left = tree.children(init)[0];
        assert!(matches!(
            tree.kind(left),
            NodeKind::Binary { op: BinOp::Add }
        ));
    }

    #[test]
    fn local_enum_declaration_is_a_statement() {
        let source = wrap("        enum Direction { NORTH, SOUTH }");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let decl = tree.children(body)[0];
        assert!(matches!(
            tree.kind(decl),
            NodeKind::EnumDecl { name, constants }
                if name == "Direction" && constants == &["NORTH".to_string(), "SOUTH".to_string()]
        ));
    }

    #[test]
    fn assignment_and_increment_statements() {
        let source = wrap("        x = x + 1;\n        x++;\n        --y;");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let statements = tree.children(body);
        assert!(matches!(tree.kind(statements[0]), NodeKind::Assign { .. }));
        assert!(matches!(
            tree.kind(statements[1]),
            NodeKind::IncDec { prefix: false, .. }
        ));
        assert!(matches!(
            tree.kind(statements[2]),
            NodeKind::IncDec { prefix: true, .. }
        ));
    }

    #[test]
    fn println_without_arguments_parses_with_no_children() {
        let source = wrap("        System.out.println();");
        let tree = SyntaxTree::parse(&source);
        let body = main_body(&tree);
        let print = tree.children(body)[0];
        assert!(matches!(tree.kind(print), NodeKind::Print));
        assert!(tree.children(print).is_empty());
    }
}
