use jblocks_source::ByteOffset;
use jblocks_source::Span;
use jblocks_syntax::Lexer;
use jblocks_syntax::NodeId;
use jblocks_syntax::NodeKind;
use jblocks_syntax::SyntaxTree;
use jblocks_syntax::TokenKind;
use jblocks_tree::BlockId;
use jblocks_tree::NodeBlockMap;

use crate::edits::apply_edits;
use crate::edits::TextEdit;
use crate::error::RewriteError;
use crate::templates::ExpressionTemplate;
use crate::templates::StatementTemplate;
use crate::types::collect_leaves;
use crate::types::TypeInfo;

type Rewrite<T> = Result<T, RewriteError>;

/// Structural edits over one tree snapshot.
///
/// Every operation resolves its target through the map built from the
/// same snapshot, computes the minimal set of text splices, and
/// returns new source text. Bytes outside the touched spans are
/// identical to the input; nothing here mutates the document — the
/// caller commits the returned text.
pub struct AstRewriter<'a> {
    tree: &'a SyntaxTree,
    map: &'a NodeBlockMap,
}

impl<'a> AstRewriter<'a> {
    #[must_use]
    pub fn new(tree: &'a SyntaxTree, map: &'a NodeBlockMap) -> Self {
        Self { tree, map }
    }

    /// Insert a fresh statement into a body at the given index.
    /// An index past the end appends.
    pub fn insert_statement(
        &self,
        body: BlockId,
        index: usize,
        template: &StatementTemplate,
    ) -> Rewrite<String> {
        let body = self.resolve_body(body)?;
        let indent = self.statement_indent(body);
        let rendered = template.render(&indent);
        let edit = self.insertion_edit(body, index, &rendered, &indent, None);
        Ok(self.apply(vec![edit], "insert-statement"))
    }

    /// Remove a statement, taking its whole line when it occupies the
    /// line alone. Deleting an else-if branch promotes that branch's
    /// own else, matching how the editor unlinks chained conditions.
    pub fn delete_statement(&self, target: BlockId) -> Rewrite<String> {
        let node = self.resolve(target)?;
        if !self.tree.kind(node).is_statement() {
            return Err(RewriteError::NotApplicable(
                "target is not a statement".to_string(),
            ));
        }

        if let Some(edit) = self.else_branch_removal(node) {
            return Ok(self.apply(vec![edit], "delete-statement"));
        }

        let edit = TextEdit::delete(self.statement_line_span(self.tree.span(node)));
        Ok(self.apply(vec![edit], "delete-statement"))
    }

    /// Move a statement into a body at the given index, as one
    /// delete-plus-insert splice pair over the original text.
    pub fn move_statement(
        &self,
        target: BlockId,
        destination: BlockId,
        index: usize,
    ) -> Rewrite<String> {
        let node = self.resolve(target)?;
        if !self.tree.kind(node).is_statement() {
            return Err(RewriteError::NotApplicable(
                "target is not a statement".to_string(),
            ));
        }
        let body = self.resolve_body(destination)?;

        let mut cursor = Some(body);
        while let Some(ancestor) = cursor {
            if ancestor == node {
                return Err(RewriteError::NotApplicable(
                    "cannot move a statement into its own body".to_string(),
                ));
            }
            cursor = self.tree.parent(ancestor);
        }

        let snippet = self.tree.text_of(node).to_string();
        let indent = self.statement_indent(body);
        let delete = TextEdit::delete(self.statement_line_span(self.tree.span(node)));
        let insert = self.insertion_edit(body, index, &snippet, &indent, Some(node));
        Ok(self.apply(vec![delete, insert], "move-statement"))
    }

    /// Change a declaration's type, rebuilding the initializer and
    /// carrying compatible leaf values over. Values of a different
    /// leaf type are not converted; the new container gets defaults.
    pub fn change_variable_type(&self, target: BlockId, new_type: &str) -> Rewrite<String> {
        let node = self.resolve(target)?;
        let name = match self.tree.kind(node) {
            NodeKind::LocalVar { name, .. } | NodeKind::Field { name, .. } => name.clone(),
            _ => {
                return Err(RewriteError::NotApplicable(
                    "target is not a variable declaration".to_string(),
                ));
            }
        };

        let preserved = self
            .tree
            .children(node)
            .first()
            .map(|&init| collect_leaves(self.tree, init))
            .unwrap_or_default();
        let ty = TypeInfo::parse(new_type).resolve_enum(self.tree);
        let replacement = format!(
            "{} {name} = {};",
            ty.spelling(),
            ty.default_initializer(&preserved)
        );
        let edit = TextEdit::replace(self.tree.span(node), replacement);
        Ok(self.apply(vec![edit], "change-variable-type"))
    }

    /// Replace a literal with a new value of the same general shape.
    pub fn set_literal_value(
        &self,
        target: BlockId,
        template: &ExpressionTemplate,
    ) -> Rewrite<String> {
        let node = self.resolve(target)?;
        if !matches!(
            self.tree.kind(node),
            NodeKind::StrLit { .. }
                | NodeKind::NumLit { .. }
                | NodeKind::BoolLit { .. }
                | NodeKind::CharLit { .. }
                | NodeKind::NullLit
        ) {
            return Err(RewriteError::NotApplicable(
                "target is not a literal".to_string(),
            ));
        }
        let edit = TextEdit::replace(self.tree.span(node), template.render());
        Ok(self.apply(vec![edit], "set-literal-value"))
    }

    /// Swap an expression for a template of a different kind.
    pub fn change_expression_kind(
        &self,
        target: BlockId,
        template: &ExpressionTemplate,
    ) -> Rewrite<String> {
        let node = self.resolve(target)?;
        if !self.tree.kind(node).is_expression() {
            return Err(RewriteError::NotApplicable(
                "target is not an expression".to_string(),
            ));
        }
        let edit = TextEdit::replace(self.tree.span(node), template.render());
        Ok(self.apply(vec![edit], "change-expression-kind"))
    }

    /// Rename an identifier use, a declared variable, a loop
    /// variable, or a method.
    pub fn rename_identifier(&self, target: BlockId, new_name: &str) -> Rewrite<String> {
        if !is_valid_identifier(new_name) {
            return Err(RewriteError::NotApplicable(format!(
                "'{new_name}' is not a valid identifier"
            )));
        }
        let node = self.resolve(target)?;
        let span = match self.tree.kind(node) {
            NodeKind::Ident { .. } => self.tree.span(node),
            NodeKind::LocalVar { name, .. }
            | NodeKind::Field { name, .. }
            | NodeKind::Method { name, .. }
            | NodeKind::For { var: name, .. } => self
                .find_ident_in_node(node, name)
                .ok_or_else(|| RewriteError::NotApplicable("name not found".to_string()))?,
            _ => {
                return Err(RewriteError::NotApplicable(
                    "target has no name to rename".to_string(),
                ));
            }
        };
        let edit = TextEdit::replace(span, new_name);
        Ok(self.apply(vec![edit], "rename-identifier"))
    }

    /// Append an empty method before the class's closing brace.
    pub fn add_method(&self, name: &str) -> Rewrite<String> {
        if !is_valid_identifier(name) {
            return Err(RewriteError::NotApplicable(format!(
                "'{name}' is not a valid identifier"
            )));
        }
        let class = self.class_node()?;
        let offset = self.tree.span(class).end_usize().saturating_sub(1);
        let edit = TextEdit::insert(offset, format!("\n    public void {name}() {{\n    }}\n"));
        Ok(self.apply(vec![edit], "add-method"))
    }

    /// Append an enum declaration before the class's closing brace.
    pub fn add_enum(&self, name: &str, constants: &[String]) -> Rewrite<String> {
        if !is_valid_identifier(name) {
            return Err(RewriteError::NotApplicable(format!(
                "'{name}' is not a valid identifier"
            )));
        }
        let class = self.class_node()?;
        let offset = self.tree.span(class).end_usize().saturating_sub(1);
        let body = if constants.is_empty() {
            String::new()
        } else {
            format!("\n        {}", constants.join(", "))
        };
        let edit = TextEdit::insert(offset, format!("\n    enum {name} {{{body}\n    }}\n"));
        Ok(self.apply(vec![edit], "add-enum"))
    }

    /// Remove a method, field, or enum member from the class.
    pub fn delete_member(&self, target: BlockId) -> Rewrite<String> {
        let node = self.resolve(target)?;
        if !matches!(
            self.tree.kind(node),
            NodeKind::Method { .. } | NodeKind::Field { .. } | NodeKind::EnumDecl { .. }
        ) {
            return Err(RewriteError::NotApplicable(
                "target is not a class member".to_string(),
            ));
        }
        let edit = TextEdit::delete(self.statement_line_span(self.tree.span(node)));
        Ok(self.apply(vec![edit], "delete-member"))
    }

    /// Give an if statement an empty else branch.
    pub fn add_else(&self, target: BlockId) -> Rewrite<String> {
        let node = self.resolve(target)?;
        if !matches!(self.tree.kind(node), NodeKind::If) {
            return Err(RewriteError::NotApplicable(
                "target is not an if statement".to_string(),
            ));
        }
        if self.tree.children(node).len() == 3 {
            return Err(RewriteError::NotApplicable(
                "if statement already has an else branch".to_string(),
            ));
        }
        let then_body = self.tree.children(node)[1];
        let indent = self.line_indent(self.tree.span(node).start());
        let edit = TextEdit::insert(
            self.tree.span(then_body).end_usize(),
            format!(" else {{\n{indent}}}"),
        );
        Ok(self.apply(vec![edit], "add-else"))
    }

    /// Remove an if statement's entire else branch.
    pub fn delete_else(&self, target: BlockId) -> Rewrite<String> {
        let node = self.resolve(target)?;
        if !matches!(self.tree.kind(node), NodeKind::If) {
            return Err(RewriteError::NotApplicable(
                "target is not an if statement".to_string(),
            ));
        }
        let children = self.tree.children(node);
        if children.len() < 3 {
            return Err(RewriteError::NotApplicable(
                "if statement has no else branch".to_string(),
            ));
        }
        let edit = TextEdit::delete(Span::from_bounds(
            self.tree.span(children[1]).end_usize(),
            self.tree.span(children[2]).end_usize(),
        ));
        Ok(self.apply(vec![edit], "delete-else"))
    }

    // Internals

    fn apply(&self, edits: Vec<TextEdit>, op: &str) -> String {
        tracing::debug!(op, edits = edits.len(), "rewriting source");
        apply_edits(self.tree.text(), edits)
    }

    fn resolve(&self, target: BlockId) -> Rewrite<NodeId> {
        self.map
            .node_for_block(target)
            .ok_or(RewriteError::TargetNotFound(target))
    }

    fn resolve_body(&self, target: BlockId) -> Rewrite<NodeId> {
        let node = self.resolve(target)?;
        if matches!(self.tree.kind(node), NodeKind::Body) {
            Ok(node)
        } else {
            Err(RewriteError::NotApplicable(
                "target is not a body".to_string(),
            ))
        }
    }

    fn class_node(&self) -> Rewrite<NodeId> {
        let root = self
            .tree
            .root()
            .ok_or_else(|| RewriteError::NotApplicable("document has no class".to_string()))?;
        if matches!(self.tree.kind(root), NodeKind::Class { .. }) {
            Ok(root)
        } else {
            Err(RewriteError::NotApplicable(
                "document has no class".to_string(),
            ))
        }
    }

    /// Unwrap logic for deleting an if that is another if's else
    /// branch: the deleted branch's own else is promoted, or the
    /// whole ` else ...` tail is removed.
    fn else_branch_removal(&self, node: NodeId) -> Option<TextEdit> {
        let parent = self.tree.parent(node)?;
        if !matches!(self.tree.kind(parent), NodeKind::If) {
            return None;
        }
        if self.tree.index_in_parent(node) != Some(2) {
            return None;
        }
        if matches!(self.tree.kind(node), NodeKind::If) {
            if let Some(&own_else) = self.tree.children(node).get(2) {
                let promoted = self.tree.text_of(own_else).to_string();
                return Some(TextEdit::replace(self.tree.span(node), promoted));
            }
        }
        let then_end = self.tree.span(self.tree.children(parent)[1]).end_usize();
        Some(TextEdit::delete(Span::from_bounds(
            then_end,
            self.tree.span(node).end_usize(),
        )))
    }

    fn insertion_edit(
        &self,
        body: NodeId,
        index: usize,
        rendered: &str,
        indent: &str,
        exclude: Option<NodeId>,
    ) -> TextEdit {
        let statements: Vec<NodeId> = self
            .tree
            .children(body)
            .iter()
            .copied()
            .filter(|&child| Some(child) != exclude)
            .collect();

        if let Some(&anchor) = statements.get(index) {
            let offset = self.tree.span(anchor).start_usize();
            return TextEdit::insert(offset, format!("{rendered}\n{indent}"));
        }
        if let Some(&last) = statements.last() {
            let offset = self.tree.span(last).end_usize();
            return TextEdit::insert(offset, format!("\n{indent}{rendered}"));
        }

        // Empty body: braced bodies insert after `{`; the synthetic
        // bodies of switch cases have no braces and insert at their
        // span start.
        let span = self.tree.span(body);
        let opens_with_brace =
            self.tree.text().as_bytes().get(span.start_usize()) == Some(&b'{');
        let offset = if opens_with_brace {
            span.start_usize() + 1
        } else {
            span.start_usize()
        };
        TextEdit::insert(offset, format!("\n{indent}{rendered}"))
    }

    /// Indent for statements of a body: copied from the first
    /// existing statement, or one level deeper than the body's line.
    fn statement_indent(&self, body: NodeId) -> String {
        if let Some(&first) = self.tree.children(body).first() {
            let start = self.tree.span(first).start_usize();
            let line_start = self.line_start_of(self.tree.span(first).start());
            let prefix = &self.tree.text()[line_start..start];
            if !prefix.is_empty() && prefix.chars().all(|c| c == ' ' || c == '\t') {
                return prefix.to_string();
            }
        }
        let mut indent = self.line_indent(self.tree.span(body).start());
        indent.push_str("    ");
        indent
    }

    fn line_start_of(&self, offset: u32) -> usize {
        let index = self.tree.line_index();
        let line = index.to_line(ByteOffset::new(offset));
        index.line_start(line).unwrap_or(0) as usize
    }

    fn line_indent(&self, offset: u32) -> String {
        let line_start = self.line_start_of(offset);
        self.tree.text()[line_start..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }

    /// Widen a statement span to its full lines when the statement
    /// owns them: leading indent and the trailing newline come along,
    /// so deletion leaves no blank line behind.
    fn statement_line_span(&self, span: Span) -> Span {
        let text = self.tree.text();
        let bytes = text.as_bytes();

        let line_start = self.line_start_of(span.start());
        let prefix_is_ws = text[line_start..span.start_usize()]
            .chars()
            .all(|c| c == ' ' || c == '\t');

        let mut end = span.end_usize();
        while bytes.get(end) == Some(&b' ') || bytes.get(end) == Some(&b'\t') {
            end += 1;
        }
        let suffix_is_newline = bytes.get(end) == Some(&b'\n');

        if prefix_is_ws && suffix_is_newline {
            Span::from_bounds(line_start, end + 1)
        } else {
            span
        }
    }

    /// Span of the declared name inside a node's own text, found by
    /// re-lexing the slice so punctuation and keywords are skipped.
    fn find_ident_in_node(&self, node: NodeId, name: &str) -> Option<Span> {
        let span = self.tree.span(node);
        let slice = self.tree.text_of(node);
        let (tokens, _) = Lexer::new(slice).tokenize();
        let mut previous_was_dot = false;
        for token in tokens {
            let is_dot = matches!(token.kind, TokenKind::Punct(jblocks_syntax::Punct::Dot));
            if let TokenKind::Ident(ident) = &token.kind {
                if ident == name && !previous_was_dot {
                    return Some(Span::from_bounds(
                        span.start_usize() + token.span.start_usize(),
                        span.start_usize() + token.span.end_usize(),
                    ));
                }
            }
            previous_was_dot = is_dot;
        }
        None
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && jblocks_syntax::Kw::from_ident(name).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jblocks_tree::build_blocks;
    use jblocks_tree::BlockKind;
    use jblocks_tree::BlockTree;

    fn wrap(statements: &str) -> String {
        format!(
            "public class Demo {{\n    public static void main(String[] args) {{\n{statements}\n    }}\n}}\n"
        )
    }

    fn parse(source: &str) -> (SyntaxTree, BlockTree, NodeBlockMap) {
        let tree = SyntaxTree::parse(source);
        let (blocks, map) = build_blocks(&tree);
        (tree, blocks, map)
    }

    fn find_id(blocks: &BlockTree, tag: &str) -> BlockId {
        blocks
            .preorder()
            .find(|b| b.kind.tag() == tag)
            .map(|b| b.id)
            .expect("block present")
    }

    fn then_body_id(blocks: &BlockTree) -> BlockId {
        let if_block = blocks
            .preorder()
            .find(|b| b.kind == BlockKind::If)
            .expect("if block");
        if_block.children[1].id
    }

    #[test]
    fn inserting_print_into_empty_if_body_adds_exactly_one_println() {
        let source = wrap("        if (true) {\n        }");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let new_text = rewriter
            .insert_statement(then_body_id(&blocks), 0, &StatementTemplate::Print)
            .expect("insert succeeds");

        assert_eq!(new_text.matches("System.out.println(\"\");").count(), 1);
        let reparsed = SyntaxTree::parse(&new_text);
        assert!(reparsed.errors().is_empty());
    }

    #[test]
    fn insert_changes_only_the_touched_region() {
        let source = wrap("        int x = 10;\n        if (true) {\n        }\n        int y = 2;");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let new_text = rewriter
            .insert_statement(then_body_id(&blocks), 0, &StatementTemplate::Print)
            .expect("insert succeeds");

        let diff = similar::TextDiff::from_lines(&source, &new_text);
        let inserted = diff
            .iter_all_changes()
            .filter(|change| change.tag() == similar::ChangeTag::Insert)
            .count();
        let deleted = diff
            .iter_all_changes()
            .filter(|change| change.tag() == similar::ChangeTag::Delete)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(deleted, 0);
    }

    #[test]
    fn delete_statement_takes_the_whole_line() {
        let source = wrap("        int x = 10;\n        int y = 2;");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let decl = blocks
            .preorder()
            .find(|b| matches!(&b.kind, BlockKind::DeclareVariable { name, .. } if name == "x"))
            .expect("declaration");
        let new_text = rewriter.delete_statement(decl.id).expect("delete succeeds");

        assert!(!new_text.contains("int x"));
        assert!(new_text.contains("        int y = 2;\n"));
        assert!(!new_text.contains("\n\n    }"));
    }

    #[test]
    fn move_statement_reorders_without_other_changes() {
        let source = wrap("        int x = 10;\n        System.out.println(x);");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let print = find_id(&blocks, "print");
        let start = blocks
            .preorder()
            .find(|b| b.kind == BlockKind::Start)
            .expect("start block");
        let body = start.children[0].id;

        let new_text = rewriter
            .move_statement(print, body, 0)
            .expect("move succeeds");

        let println_pos = new_text.find("System.out.println").expect("print kept");
        let decl_pos = new_text.find("int x = 10;").expect("decl kept");
        assert!(println_pos < decl_pos);
        assert!(SyntaxTree::parse(&new_text).errors().is_empty());
    }

    #[test]
    fn moving_a_statement_into_its_own_body_is_rejected() {
        let source = wrap("        while (true) {\n            int x = 1;\n        }");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let while_id = find_id(&blocks, "while");
        let while_block = blocks.find(while_id).expect("while block");
        let inner_body = while_block.children[1].id;

        let result = rewriter.move_statement(while_id, inner_body, 0);
        assert!(matches!(result, Err(RewriteError::NotApplicable(_))));
    }

    #[test]
    fn stale_identities_fail_without_touching_the_text() {
        let source = wrap("        int x = 10;");
        let other = wrap("        int y = 20;\n        System.out.println(y);");
        let (tree, _, map) = parse(&source);
        let (_, other_blocks, _) = parse(&other);
        let rewriter = AstRewriter::new(&tree, &map);

        let foreign = find_id(&other_blocks, "print");
        let result = rewriter.delete_statement(foreign);
        assert!(matches!(result, Err(RewriteError::TargetNotFound(_))));
    }

    #[test]
    fn dimension_change_preserves_leaf_values() {
        let source = wrap("        int[] a = new int[] { 1, 2, 3 };");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let decl = find_id(&blocks, "declare-variable");
        let new_text = rewriter
            .change_variable_type(decl, "int[][]")
            .expect("type change succeeds");

        assert!(new_text.contains("int[][] a = new int[][] { { 1, 2, 3 } };"));
    }

    #[test]
    fn type_change_across_leaf_types_falls_back_to_defaults() {
        let source = wrap("        int[] a = new int[] { 1, 2, 3 };");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let decl = find_id(&blocks, "declare-variable");
        let new_text = rewriter
            .change_variable_type(decl, "String[]")
            .expect("type change succeeds");

        assert!(new_text.contains("String[] a = new String[] { \"\" };"));
        assert!(!new_text.contains('1'));
    }

    #[test]
    fn enum_type_change_uses_the_first_constant() {
        let source = wrap("        enum Direction { NORTH, SOUTH }\n        int d = 0;");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let decl = blocks
            .preorder()
            .find(|b| matches!(&b.kind, BlockKind::DeclareVariable { name, .. } if name == "d"))
            .expect("declaration");
        let new_text = rewriter
            .change_variable_type(decl.id, "Direction")
            .expect("type change succeeds");
        assert!(new_text.contains("Direction d = Direction.NORTH;"));
    }

    #[test]
    fn rename_declaration_changes_only_the_name_token() {
        let source = wrap("        int count = 10;");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let decl = find_id(&blocks, "declare-variable");
        let new_text = rewriter
            .rename_identifier(decl, "total")
            .expect("rename succeeds");
        assert!(new_text.contains("int total = 10;"));
    }

    #[test]
    fn rename_rejects_invalid_identifiers() {
        let source = wrap("        int count = 10;");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let decl = find_id(&blocks, "declare-variable");
        assert!(rewriter.rename_identifier(decl, "1bad").is_err());
        assert!(rewriter.rename_identifier(decl, "class").is_err());
        assert!(rewriter.rename_identifier(decl, "").is_err());
    }

    #[test]
    fn add_method_appends_before_the_class_brace() {
        let source = wrap("        int x = 1;");
        let (tree, _, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let new_text = rewriter.add_method("helper").expect("add succeeds");
        let reparsed = SyntaxTree::parse(&new_text);
        assert!(reparsed.errors().is_empty());
        let (blocks, _) = build_blocks(&reparsed);
        assert!(blocks
            .preorder()
            .any(|b| matches!(&b.kind, BlockKind::Method { name, .. } if name == "helper")));
    }

    #[test]
    fn add_enum_renders_constants() {
        let source = wrap("        int x = 1;");
        let (tree, _, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let new_text = rewriter
            .add_enum("Direction", &["NORTH".to_string(), "SOUTH".to_string()])
            .expect("add succeeds");
        assert!(new_text.contains("enum Direction {\n        NORTH, SOUTH\n    }"));
        assert!(SyntaxTree::parse(&new_text).errors().is_empty());
    }

    #[test]
    fn add_then_delete_else_round_trips() {
        let source = wrap("        if (true) {\n        }");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let if_id = find_id(&blocks, "if");
        let with_else = rewriter.add_else(if_id).expect("add else succeeds");
        assert!(with_else.contains("} else {"));

        let (tree2, blocks2, map2) = parse(&with_else);
        let rewriter2 = AstRewriter::new(&tree2, &map2);
        let if_id2 = find_id(&blocks2, "if");
        let without = rewriter2.delete_else(if_id2).expect("delete else succeeds");
        assert_eq!(without, source);
    }

    #[test]
    fn deleting_an_else_if_promotes_its_own_else() {
        let source =
            wrap("        if (x > 1) {\n        } else if (x > 0) {\n        } else {\n        }");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let outer = blocks
            .preorder()
            .find(|b| b.kind == BlockKind::If)
            .expect("outer if");
        let else_if = outer
            .children
            .iter()
            .find(|b| b.kind == BlockKind::If)
            .expect("else-if branch");

        let new_text = rewriter
            .delete_statement(else_if.id)
            .expect("delete succeeds");
        assert!(!new_text.contains("x > 0"));
        assert!(new_text.contains("else {"));
        assert!(SyntaxTree::parse(&new_text).errors().is_empty());
    }

    #[test]
    fn set_literal_value_replaces_in_place() {
        let source = wrap("        System.out.println(\"hi\");");
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let literal = find_id(&blocks, "string-literal");
        let new_text = rewriter
            .set_literal_value(
                literal,
                &ExpressionTemplate::StringLiteral("bye \"quoted\"".to_string()),
            )
            .expect("set succeeds");
        assert!(new_text.contains("System.out.println(\"bye \\\"quoted\\\"\");"));
    }

    #[test]
    fn insert_into_switch_case_body() {
        let source = wrap(
            "        switch (x) {\n            default:\n                break;\n        }",
        );
        let (tree, blocks, map) = parse(&source);
        let rewriter = AstRewriter::new(&tree, &map);

        let case = blocks
            .preorder()
            .find(|b| matches!(b.kind, BlockKind::SwitchCase { .. }))
            .expect("case block");
        let case_body = case
            .children
            .iter()
            .find(|b| b.kind == BlockKind::Body)
            .expect("case body");

        let new_text = rewriter
            .insert_statement(case_body.id, 0, &StatementTemplate::Print)
            .expect("insert succeeds");
        assert!(SyntaxTree::parse(&new_text).errors().is_empty());
        assert_eq!(new_text.matches("System.out.println(\"\");").count(), 1);
    }
}
