
use std::{cell::Cell, fmt};

use logos::{Lexer, Logos, Span};

use crate::{error::ParseErrorKind, lines::LineResolver};

/// The raw lexemes of a protobuf source file, before comments are attributed to tokens.
#[derive(Debug, Clone, Logos, PartialEq, Eq)]
#[logos(extras = LexExtras)]
#[logos(skip r"[\t\v\f\r ]+")]
enum Lexeme<'a> {
    #[regex(r#"[^\t\n\v\f\r (){}<>\[\]=+\-,;"'/\\]+"#)]
    Word,
    #[regex(r"[(){}<>\[\]=+\-,;]")]
    Symbol,
    #[regex(r#"['"]"#, string)]
    Str(String),
    #[regex(r"//[^\n]*", line_comment)]
    LineComment(&'a str),
    #[token("/*", block_comment)]
    BlockComment(&'a str),
    #[token("\n")]
    Newline,
}

#[derive(Debug, Default)]
struct LexExtras {
    errors: Vec<ParseErrorKind>,
}

/// The kind of a [`Token`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A run of characters that are not whitespace, punctuation, quotes or comment openers.
    ///
    /// Keywords, identifiers, dotted type names and numbers are all words.
    Word,
    /// One of the single-character tokens `(){}<>[]=+-,;`.
    Symbol,
    /// A quoted string literal. The token text is the literal's content, without quotes.
    Str,
}

/// A single token of a protobuf source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: String,
    line: usize,
    column: usize,
    span: Span,
    comment: Option<String>,
}

impl Token {
    /// The kind of this token.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The text of this token. For string literals, escapes have been taken literally and the quotes removed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The 1-based line on which this token starts.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1-based column at which this token starts.
    pub fn column(&self) -> usize {
        self.column
    }

    /// The byte range of this token in the source.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// The comment attributed to this token, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns true if this token is the keyword or punctuation `text`.
    ///
    /// String literals never match, so `"message"` is not mistaken for a keyword.
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Str && self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Str => write!(f, "\"{}\"", self.text.escape_default()),
            TokenKind::Word | TokenKind::Symbol => f.write_str(&self.text),
        }
    }
}

/// A fully materialized, random-access list of tokens with a cursor.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cursor: usize,
    last: Cell<Option<usize>>,
}

impl TokenStream {
    /// Returns the next token without advancing the cursor.
    pub fn peek(&self) -> Option<&Token> {
        let token = self.tokens.get(self.cursor)?;
        self.last.set(Some(self.cursor));
        Some(token)
    }

    /// Returns the token `n` places after the next one, without advancing the cursor.
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + n)
    }

    /// Returns the next token and advances the cursor.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&Token> {
        let index = self.cursor;
        let token = self.tokens.get(index)?;
        self.cursor += 1;
        self.last.set(Some(index));
        Some(token)
    }

    /// Returns true if there are tokens remaining after the cursor.
    pub fn has_next(&self) -> bool {
        self.cursor < self.tokens.len()
    }

    /// The comment of the token most recently returned by [`next`](TokenStream::next) or [`peek`](TokenStream::peek).
    pub fn comment(&self) -> Option<&str> {
        self.last_token().and_then(Token::comment)
    }

    /// The line number of the token most recently returned by [`next`](TokenStream::next) or [`peek`](TokenStream::peek).
    pub fn line_number(&self) -> Option<usize> {
        self.last_token().map(Token::line)
    }

    /// Gets the token at `index`, regardless of the cursor position.
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// All tokens in source order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the source contained no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn last_token(&self) -> Option<&Token> {
        self.tokens.get(self.last.get()?)
    }
}

/// Splits `source` into tokens and attributes comments to them.
///
/// A comment is attached to every token on the same line, and to the tokens of the next line
/// containing tokens as long as no blank line separates them from the comment.
pub(crate) fn tokenize(source: &str) -> Result<TokenStream, ParseErrorKind> {
    let lines = LineResolver::new(source);
    let mut lexer = Lexeme::lexer(source);
    let mut comments = CommentAttribution::new();
    let mut tokens = Vec::new();

    while let Some(lexeme) = lexer.next() {
        if !lexer.extras.errors.is_empty() {
            return Err(lexer.extras.errors.remove(0));
        }

        let span = lexer.span();
        let (kind, text) = match lexeme {
            Ok(Lexeme::Word) => (TokenKind::Word, lexer.slice().to_owned()),
            Ok(Lexeme::Symbol) => (TokenKind::Symbol, lexer.slice().to_owned()),
            Ok(Lexeme::Str(value)) => (TokenKind::Str, value),
            Ok(Lexeme::LineComment(text)) => {
                comments.line_comment(text);
                continue;
            }
            Ok(Lexeme::BlockComment(text)) => {
                comments.block_comment(text);
                continue;
            }
            Ok(Lexeme::Newline) => {
                comments.newline(&mut tokens);
                continue;
            }
            Err(()) => return Err(invalid_lexeme(lexer.slice(), span)),
        };

        let (line, column) = lines.resolve(span.start);
        comments.token(tokens.len());
        tokens.push(Token {
            kind,
            text,
            line: line + 1,
            column: column + 1,
            span,
            comment: None,
        });
    }

    comments.finish(&mut tokens);
    Ok(TokenStream {
        tokens,
        cursor: 0,
        last: Cell::new(None),
    })
}

fn invalid_lexeme(slice: &str, span: Span) -> ParseErrorKind {
    if slice.starts_with('\\') {
        ParseErrorKind::IllegalBackslash { span }
    } else {
        debug_assert!(slice.starts_with('/'));
        ParseErrorKind::MalformedCommentOpener { span }
    }
}

/// Accumulates comment text and attaches it to the tokens of the line being read.
#[derive(Debug)]
struct CommentAttribution {
    buffer: String,
    pending: Vec<usize>,
    line_is_blank: bool,
}

impl CommentAttribution {
    fn new() -> Self {
        CommentAttribution {
            buffer: String::new(),
            pending: Vec::new(),
            line_is_blank: true,
        }
    }

    fn token(&mut self, index: usize) {
        self.pending.push(index);
        self.line_is_blank = false;
    }

    fn line_comment(&mut self, text: &str) {
        self.buffer.push_str(text.trim());
        self.buffer.push('\n');
        self.line_is_blank = false;
    }

    fn block_comment(&mut self, text: &str) {
        for line in text.trim_end_matches('*').lines() {
            let line = line.trim();
            let line = match line.strip_prefix('*') {
                Some(rest) => rest.trim_start(),
                None => line,
            };
            self.buffer.push_str(line);
            self.buffer.push('\n');
        }
        self.line_is_blank = false;
    }

    fn newline(&mut self, tokens: &mut [Token]) {
        if !self.pending.is_empty() {
            self.flush(tokens);
        } else if self.line_is_blank {
            // A blank line detaches any comment read so far from the tokens that follow.
            self.buffer.clear();
        }
        self.line_is_blank = true;
    }

    fn finish(mut self, tokens: &mut [Token]) {
        if !self.pending.is_empty() {
            self.flush(tokens);
        }
    }

    fn flush(&mut self, tokens: &mut [Token]) {
        let comment = self.buffer.trim();
        if !comment.is_empty() {
            for &index in &self.pending {
                tokens[index].comment = Some(comment.to_owned());
            }
        }
        self.buffer.clear();
        self.pending.clear();
    }
}

fn string<'a>(lex: &mut Lexer<'a, Lexeme<'a>>) -> String {
    let terminator = lex.slice().chars().next().expect("string has no opening quote");
    let remainder = lex.remainder();

    let mut value = String::new();
    let mut chars = remainder.char_indices();
    let len = loop {
        match chars.next() {
            Some((index, ch)) if ch == terminator => break index + ch.len_utf8(),
            Some((_, '\\')) => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => {
                    lex.extras
                        .errors
                        .push(ParseErrorKind::UnterminatedString { span: lex.span() });
                    break remainder.len();
                }
            },
            Some((_, ch)) => value.push(ch),
            None => {
                lex.extras
                    .errors
                    .push(ParseErrorKind::UnterminatedString { span: lex.span() });
                break remainder.len();
            }
        }
    };

    lex.bump(len);
    value
}

fn line_comment<'a>(lex: &mut Lexer<'a, Lexeme<'a>>) -> &'a str {
    let slice: &'a str = lex.slice();
    slice.strip_prefix("//").expect("invalid line comment")
}

fn block_comment<'a>(lex: &mut Lexer<'a, Lexeme<'a>>) -> &'a str {
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            &remainder[..end]
        }
        None => {
            lex.extras
                .errors
                .push(ParseErrorKind::UnterminatedComment { span: lex.span() });
            lex.bump(remainder.len());
            remainder
        }
    }
}
