use crate::types::TypeInfo;

/// Source templates for freshly inserted statements.
///
/// `render` takes the indent of the insertion site so closing braces
/// of multi-line templates line up with the statement's first line.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementTemplate {
    Print,
    DeclareVariable(TypeInfo),
    Assign { name: String },
    If,
    While,
    DoWhile,
    ForEach,
    Switch,
    Break,
    Continue,
    Return,
    Wait,
}

impl StatementTemplate {
    #[must_use]
    pub fn render(&self, indent: &str) -> String {
        match self {
            StatementTemplate::Print => "System.out.println(\"\");".to_string(),
            StatementTemplate::DeclareVariable(ty) => {
                format!(
                    "{} {} = {};",
                    ty.spelling(),
                    default_name(ty),
                    ty.default_initializer(&[])
                )
            }
            StatementTemplate::Assign { name } => format!("{name} = 0;"),
            StatementTemplate::If => format!("if (true) {{\n{indent}}}"),
            StatementTemplate::While => format!("while (true) {{\n{indent}}}"),
            StatementTemplate::DoWhile => format!("do {{\n{indent}}} while (true);"),
            StatementTemplate::ForEach => format!("for (int item : items) {{\n{indent}}}"),
            StatementTemplate::Switch => format!(
                "switch (variable) {{\n{indent}    default:\n{indent}        break;\n{indent}}}"
            ),
            StatementTemplate::Break => "break;".to_string(),
            StatementTemplate::Continue => "continue;".to_string(),
            StatementTemplate::Return => "return;".to_string(),
            StatementTemplate::Wait => format!(
                "try {{\n{indent}    Thread.sleep(1000);\n{indent}}} catch (InterruptedException e) {{\n{indent}    e.printStackTrace();\n{indent}}}"
            ),
        }
    }
}

/// Default variable names for fresh declarations, one per type family.
fn default_name(ty: &TypeInfo) -> &'static str {
    match ty {
        TypeInfo::Int | TypeInfo::Long | TypeInfo::Double | TypeInfo::Float => "number",
        TypeInfo::Boolean => "flag",
        TypeInfo::Char => "letter",
        TypeInfo::Str => "text",
        TypeInfo::Array { .. } => "values",
        TypeInfo::List { .. } => "items",
        TypeInfo::Enum { .. } | TypeInfo::Other(_) => "value",
    }
}

/// Source templates for replacement expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionTemplate {
    StringLiteral(String),
    IntLiteral(String),
    DoubleLiteral(String),
    FloatLiteral(String),
    BooleanLiteral(bool),
    CharLiteral(char),
    Identifier(String),
    EnumConstant { ty: String, name: String },
    ReadInput { method: String },
    Default(TypeInfo),
}

impl ExpressionTemplate {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            ExpressionTemplate::StringLiteral(value) => quote_string(value),
            ExpressionTemplate::IntLiteral(text)
            | ExpressionTemplate::DoubleLiteral(text)
            | ExpressionTemplate::FloatLiteral(text) => text.clone(),
            ExpressionTemplate::BooleanLiteral(value) => value.to_string(),
            ExpressionTemplate::CharLiteral(value) => quote_char(*value),
            ExpressionTemplate::Identifier(name) => name.clone(),
            ExpressionTemplate::EnumConstant { ty, name } => format!("{ty}.{name}"),
            ExpressionTemplate::ReadInput { method } => format!("scanner.{method}()"),
            ExpressionTemplate::Default(ty) => ty.default_value(),
        }
    }
}

fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn quote_char(value: char) -> String {
    match value {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\t' => "'\\t'".to_string(),
        other => format!("'{other}'"),
    }
}
