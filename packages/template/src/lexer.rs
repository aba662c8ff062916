//! Template lexer using logos
//!
//! Only `{{ ... }}` is syntax. Everything else, including a lone `{`, is text.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'src> {
    /// `{{ expr }}`, payload is the trimmed expression
    #[regex(r"\{\{[^{}]*\}\}", |lex| {
        let s = lex.slice();
        s[2..s.len() - 2].trim()
    })]
    Tag(&'src str),

    #[regex(r"[^{]+", |lex| lex.slice())]
    Text(&'src str),

    #[token("{", |lex| lex.slice())]
    Brace(&'src str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: TokenSpan,
}

/// Lex template source. The grammar has no error states, so any slice the
/// lexer cannot classify is still returned as text.
pub fn lex(source: &str) -> impl Iterator<Item = SpannedToken<'_>> + '_ {
    Token::lexer(source).spanned().map(move |(result, span)| {
        let token = result.unwrap_or(Token::Text(&source[span.clone()]));
        SpannedToken {
            token,
            span: TokenSpan {
                start: span.start,
                end: span.end,
            },
        }
    })
}
