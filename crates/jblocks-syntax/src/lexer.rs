use jblocks_source::Span;

use crate::tokens::Comment;
use crate::tokens::Kw;
use crate::tokens::Punct;
use crate::tokens::Token;
use crate::tokens::TokenKind;

pub struct Lexer<'src> {
    source: &'src str,
    start: usize,
    current: usize,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            start: 0,
            current: 0,
        }
    }

    /// Tokenize the whole input, collecting comments into a side list.
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<Comment>) {
        let mut tokens = Vec::new();
        let mut comments = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            self.start = self.current;

            match self.peek() {
                '/' if self.peek_next() == '/' => comments.push(self.lex_line_comment()),
                '/' if self.peek_next() == '*' => comments.push(self.lex_block_comment()),
                '"' => tokens.push(self.lex_string()),
                '\'' => tokens.push(self.lex_char()),
                c if c.is_ascii_digit() => tokens.push(self.lex_number()),
                c if c.is_alphabetic() || c == '_' || c == '$' => tokens.push(self.lex_ident()),
                _ => tokens.push(self.lex_punct()),
            }
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            Span::from_bounds(self.source.len(), self.source.len()),
        ));

        (tokens, comments)
    }

    fn lex_line_comment(&mut self) -> Comment {
        self.consume_n(2);
        let text_start = self.current;
        while !self.is_at_end() && self.peek() != '\n' {
            self.consume();
        }
        Comment {
            span: Span::from_bounds(self.start, self.current),
            text: self.source[text_start..self.current].trim().to_string(),
            is_line: true,
        }
    }

    fn lex_block_comment(&mut self) -> Comment {
        self.consume_n(2);
        let text_start = self.current;
        let mut text_end = self.current;
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                text_end = self.current;
                self.consume_n(2);
                break;
            }
            self.consume();
            text_end = self.current;
        }
        Comment {
            span: Span::from_bounds(self.start, self.current),
            text: self.source[text_start..text_end].trim().to_string(),
            is_line: false,
        }
    }

    fn lex_string(&mut self) -> Token {
        self.consume(); // opening quote
        let mut value = String::new();
        while !self.is_at_end() {
            match self.peek() {
                '"' => {
                    self.consume();
                    return self.token(TokenKind::Str(value));
                }
                '\n' => break,
                '\\' => {
                    self.consume();
                    let escaped = match self.peek() {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    };
                    value.push(escaped);
                    self.consume();
                }
                c => {
                    value.push(c);
                    self.consume();
                }
            }
        }
        // Unterminated string: surface as an error token and let the
        // parser degrade the region rather than aborting the parse.
        self.token(TokenKind::Error(format!("unterminated string: \"{value}")))
    }

    fn lex_char(&mut self) -> Token {
        self.consume(); // opening quote
        let mut value = '\0';
        if !self.is_at_end() {
            value = self.peek();
            if value == '\\' {
                self.consume();
                value = match self.peek() {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                };
            }
            self.consume();
        }
        if !self.is_at_end() && self.peek() == '\'' {
            self.consume();
            self.token(TokenKind::Char(value))
        } else {
            self.synchronize();
            self.token(TokenKind::Error("unterminated character literal".to_string()))
        }
    }

    fn lex_number(&mut self) -> Token {
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.consume();
        }
        if !self.is_at_end() && self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.consume();
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                self.consume();
            }
        }
        if !self.is_at_end() && matches!(self.peek(), 'f' | 'F' | 'd' | 'D' | 'l' | 'L') {
            self.consume();
        }
        let text = self.source[self.start..self.current].to_string();
        self.token(TokenKind::Number(text))
    }

    fn lex_ident(&mut self) -> Token {
        while !self.is_at_end()
            && (self.peek().is_alphanumeric() || self.peek() == '_' || self.peek() == '$')
        {
            self.consume();
        }
        let text = &self.source[self.start..self.current];
        match Kw::from_ident(text) {
            Some(kw) => self.token(TokenKind::Kw(kw)),
            None => self.token(TokenKind::Ident(text.to_string())),
        }
    }

    fn lex_punct(&mut self) -> Token {
        let c = self.peek();
        self.consume();
        let two = |this: &mut Self, next: char, double: Punct, single: Punct| {
            if !this.is_at_end() && this.peek() == next {
                this.consume();
                double
            } else {
                single
            }
        };

        let punct = match c {
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            ';' => Punct::Semi,
            ',' => Punct::Comma,
            '.' => Punct::Dot,
            ':' => Punct::Colon,
            '%' => Punct::Percent,
            '=' => two(self, '=', Punct::EqEq, Punct::Eq),
            '!' => two(self, '=', Punct::BangEq, Punct::Bang),
            '<' => two(self, '=', Punct::Le, Punct::Lt),
            '>' => two(self, '=', Punct::Ge, Punct::Gt),
            '&' => {
                if !self.is_at_end() && self.peek() == '&' {
                    self.consume();
                    Punct::AndAnd
                } else {
                    return self.token(TokenKind::Error("unexpected '&'".to_string()));
                }
            }
            '|' => {
                if !self.is_at_end() && self.peek() == '|' {
                    self.consume();
                    Punct::OrOr
                } else {
                    return self.token(TokenKind::Error("unexpected '|'".to_string()));
                }
            }
            '+' => {
                if !self.is_at_end() && self.peek() == '+' {
                    self.consume();
                    Punct::PlusPlus
                } else {
                    two(self, '=', Punct::PlusEq, Punct::Plus)
                }
            }
            '-' => {
                if !self.is_at_end() && self.peek() == '-' {
                    self.consume();
                    Punct::MinusMinus
                } else {
                    two(self, '=', Punct::MinusEq, Punct::Minus)
                }
            }
            '*' => two(self, '=', Punct::StarEq, Punct::Star),
            '/' => two(self, '=', Punct::SlashEq, Punct::Slash),
            other => {
                return self.token(TokenKind::Error(format!("unexpected character '{other}'")));
            }
        };
        self.token(TokenKind::Punct(punct))
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::from_bounds(self.start, self.current))
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.consume();
        }
    }

    #[inline]
    fn peek(&self) -> char {
        self.source[self.current..].chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    fn consume(&mut self) {
        if let Some(ch) = self.source[self.current..].chars().next() {
            self.current += ch.len_utf8();
        }
    }

    fn consume_n(&mut self, count: usize) {
        for _ in 0..count {
            self.consume();
        }
    }

    fn synchronize(&mut self) {
        const SYNC_POINTS: &[u8] = b";\n\r}";

        while !self.is_at_end() {
            if SYNC_POINTS.contains(&self.source.as_bytes()[self.current]) {
                return;
            }
            self.consume();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = Lexer::new(source).tokenize();
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_declaration() {
        assert_eq!(
            kinds("int x = 10;"),
            vec![
                TokenKind::Kw(Kw::Int),
                TokenKind::Ident("x".to_string()),
                TokenKind::Punct(Punct::Eq),
                TokenKind::Number("10".to_string()),
                TokenKind::Punct(Punct::Semi),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_string_escapes() {
        assert_eq!(
            kinds(r#""a\nb""#),
            vec![TokenKind::Str("a\nb".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn comments_go_to_side_list() {
        let (tokens, comments) = Lexer::new("x; // trailing\n/* block */ y;").tokenize();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "trailing");
        assert!(comments[0].is_line);
        assert_eq!(comments[1].text, "block");
        assert!(!comments[1].is_line);
        // Comments never appear in the token stream.
        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn number_suffixes_stay_in_the_token() {
        assert_eq!(
            kinds("1.5f 2.0 3"),
            vec![
                TokenKind::Number("1.5f".to_string()),
                TokenKind::Number("2.0".to_string()),
                TokenKind::Number("3".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_degrades_to_error_token() {
        let (tokens, _) = Lexer::new("\"oops\nint x;").tokenize();
        assert!(matches!(tokens[0].kind, TokenKind::Error(_)));
        assert_eq!(tokens[1].kind, TokenKind::Kw(Kw::Int));
    }

    #[test]
    fn token_stream_spans_and_kinds() {
        let source = "int x = 10;\nSystem.out.println(x);";
        let (tokens, _) = Lexer::new(source).tokenize();
        let dump = tokens
            .iter()
            .map(|t| format!("{}..{} {:?}", t.span.start(), t.span.end(), t.kind))
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(dump, @r#"
        0..3 Kw(Int)
        4..5 Ident("x")
        6..7 Punct(Eq)
        8..10 Number("10")
        10..11 Punct(Semi)
        12..18 Ident("System")
        18..19 Punct(Dot)
        19..22 Ident("out")
        22..23 Punct(Dot)
        23..30 Ident("println")
        30..31 Punct(LParen)
        31..32 Ident("x")
        32..33 Punct(RParen)
        33..34 Punct(Semi)
        34..34 Eof
        "#);
    }

    #[test]
    fn spans_cover_exact_bytes() {
        let source = "if (true)";
        let (tokens, _) = Lexer::new(source).tokenize();
        assert_eq!(tokens[0].span.text(source), "if");
        assert_eq!(tokens[2].span.text(source), "true");
    }
}
