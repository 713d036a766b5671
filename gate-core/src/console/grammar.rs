#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the gate console.
//!
//! The lexer uses `regal` to produce a bounded token stream and the parser
//! composes `winnow` combinators over those tokens. Nothing here allocates,
//! so the same pipeline can run on the MCU behind a UART.

use core::fmt;
use core::ops::Range;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;
#[allow(deprecated)]
use winnow::error::ErrorKind;
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::stream::Stream;

use super::commands::{self, CommandTag};

/// Maximum number of tokens produced per console line.
pub const MAX_TOKENS: usize = 24;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Largest cycle count accepted by `scan count=<n>`.
pub const MAX_SCAN_COUNT: usize = 64;

/// Lexical token kinds recognized by the console grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Unsigned decimal literal.
    #[regex(r"[0-9]+")]
    Integer,
    /// Identifier or keyword (case-insensitive match performed later).
    #[regex(r"[A-Za-z][A-Za-z0-9_-]*")]
    Ident,
    /// Equals sign for key/value assignments.
    #[token("=")]
    Equals,
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    /// End-of-line token (`\r`, `\n`, or `\r\n`).
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Pseudo variant used when the lexer encounters unsupported input.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

/// Lexer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// Input produced more tokens than the static buffer allows.
    TooManyTokens { processed: usize },
    /// Underlying lexer reported an unrecoverable error.
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => write!(f, "lexer engine error"),
        }
    }
}

/// Grammar errors emitted by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: Option<TokenKind>,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    InvalidInteger {
        span: Range<usize>,
    },
    /// Well-formed literal outside the range accepted by its key.
    OutOfRange {
        key: &'static str,
        span: Range<usize>,
    },
    UnknownKey {
        span: Range<usize>,
        lexeme: &'a str,
    },
    InvalidToken {
        span: Range<usize>,
        lexeme: &'a str,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found {found:?} at {span:?}"),
            GrammarErrorKind::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarErrorKind::InvalidInteger { span } => {
                write!(f, "invalid integer literal at {span:?}")
            }
            GrammarErrorKind::OutOfRange { key, span } => {
                write!(f, "value for `{key}` out of range at {span:?}")
            }
            GrammarErrorKind::UnknownKey { span, lexeme } => {
                write!(f, "unknown key `{lexeme}` at {span:?}")
            }
            GrammarErrorKind::InvalidToken { span, lexeme } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

/// Wrapper type enabling a consistent error surface for consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        GrammarError {
            kind: match token {
                Some(tok) => GrammarErrorKind::UnexpectedToken {
                    expected,
                    found: Some(tok.kind),
                    span: tok.span.clone(),
                },
                None => GrammarErrorKind::UnexpectedEnd { expected },
            },
        }
    }

    fn invalid_integer(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidInteger {
                span: token.span.clone(),
            },
        }
    }

    fn out_of_range(key: &'static str, token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::OutOfRange {
                key,
                span: token.span.clone(),
            },
        }
    }

    fn unknown_key(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::UnknownKey {
                span: token.span.clone(),
                lexeme: token.lexeme,
            },
        }
    }

    fn invalid_token(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidToken {
                span: token.span.clone(),
                lexeme: token.lexeme,
            },
        }
    }
}

type Input<'src, 'slice> = &'slice [Token<'src>];

#[allow(deprecated)]
impl<'src, 'slice> ParserError<Input<'src, 'slice>> for GrammarError<'src>
where
    'src: 'slice,
{
    fn from_error_kind(input: &Input<'src, 'slice>, _kind: ErrorKind) -> Self {
        GrammarError::unexpected("token", input.first())
    }

    fn append(
        self,
        _input: &Input<'src, 'slice>,
        _token_start: &<Input<'src, 'slice> as Stream>::Checkpoint,
        _kind: ErrorKind,
    ) -> Self {
        self
    }

    fn or(self, other: Self) -> Self {
        other
    }
}

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Scan(ScanCommand),
    Poll,
    Status,
    Zones,
    Help(HelpCommand<'a>),
}

/// Simulated sensor inputs applied to `count` consecutive scans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanCommand {
    pub buttons: [bool; 2],
    /// Slider position, or `None` when the slider is not touched.
    pub position: Option<u16>,
    pub count: u8,
}

impl Default for ScanCommand {
    fn default() -> Self {
        Self {
            buttons: [false; 2],
            position: None,
            count: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpCommand<'a> {
    pub topic: Option<&'a str>,
}

pub(crate) fn parse_tokens_partial<'src, 'slice>(
    tokens: &'slice [Token<'src>],
) -> Result<(Command<'src>, &'slice [Token<'src>]), GrammarError<'src>>
where
    'src: 'slice,
{
    let mut input = tokens;
    match command().parse_next(&mut input) {
        Ok(cmd) => Ok((cmd, input)),
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => Err(err),
        Err(ErrMode::Incomplete(_)) => Err(GrammarError::unexpected("token", input.first())),
    }
}

/// Tokenize the provided line.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if record.skipped {
            continue;
        }

        let span = record.start..record.end;
        let lexeme = &line[span.clone()];
        if buffer
            .push(Token {
                kind: record.token,
                lexeme,
                span,
            })
            .is_err()
        {
            return Err(LexError::TooManyTokens {
                processed: buffer.len() + 1,
            });
        }
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let start = partial.start;
        let span = start..start + partial.fragment.len();
        if buffer
            .push(Token {
                kind: TokenKind::Error,
                lexeme: partial.fragment,
                span,
            })
            .is_err()
        {
            return Err(LexError::TooManyTokens {
                processed: buffer.len() + 1,
            });
        }
    }

    Ok(buffer)
}

fn map_incremental_error(error: IncrementalError) -> LexError {
    match error {
        IncrementalError::TokenOverflow => LexError::TooManyTokens {
            processed: MAX_TOKENS,
        },
        _ => LexError::Engine,
    }
}

/// Parse a console command from the provided line.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::invalid_token(token)));
    }

    let (command, rest) = parse_tokens_partial(tokens.as_slice()).map_err(ParseError::Grammar)?;

    if let Some(token) = rest.iter().find(|token| token.kind != TokenKind::Eol) {
        return Err(ParseError::Grammar(GrammarError::unexpected(
            "end of command",
            Some(token),
        )));
    }

    Ok(command)
}

fn command<'src, 'slice>() -> impl Parser<Input<'src, 'slice>, Command<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| {
        let snapshot = *input;
        let command_token = expect_kind(TokenKind::Ident, "command keyword").parse_next(input)?;

        let Some(spec) = commands::find(command_token.lexeme) else {
            *input = snapshot;
            return Err(ErrMode::Backtrack(GrammarError::unexpected(
                "command keyword",
                Some(&command_token),
            )));
        };

        match spec.tag {
            CommandTag::Scan => scan_arguments(input).map(Command::Scan),
            CommandTag::Poll => Ok(Command::Poll),
            CommandTag::Status => Ok(Command::Status),
            CommandTag::Zones => Ok(Command::Zones),
            CommandTag::Help => Ok(Command::Help(HelpCommand {
                topic: help_topic(input)?,
            })),
        }
    }
}

fn scan_arguments<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
) -> Result<ScanCommand, ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    let mut scan = ScanCommand::default();

    while let Some((token, _)) = input.split_first() {
        if token.kind == TokenKind::Eol {
            break;
        }

        let key = expect_kind(TokenKind::Ident, "scan argument").parse_next(input)?;
        let _ = expect_kind(TokenKind::Equals, "=").parse_next(input)?;
        let value = expect_kind(TokenKind::Integer, "integer").parse_next(input)?;
        let number = parse_integer(&value).map_err(ErrMode::Cut)?;

        if key.lexeme.eq_ignore_ascii_case("b0") {
            scan.buttons[0] = parse_level("b0", &value, number)?;
        } else if key.lexeme.eq_ignore_ascii_case("b1") {
            scan.buttons[1] = parse_level("b1", &value, number)?;
        } else if key.lexeme.eq_ignore_ascii_case("pos") {
            let position = u16::try_from(number)
                .map_err(|_| ErrMode::Cut(GrammarError::out_of_range("pos", &value)))?;
            scan.position = Some(position);
        } else if key.lexeme.eq_ignore_ascii_case("count") {
            scan.count = u8::try_from(number)
                .ok()
                .filter(|count| (1..=MAX_SCAN_COUNT).contains(&usize::from(*count)))
                .ok_or_else(|| ErrMode::Cut(GrammarError::out_of_range("count", &value)))?;
        } else {
            return Err(ErrMode::Cut(GrammarError::unknown_key(&key)));
        }
    }

    Ok(scan)
}

fn parse_level<'a>(
    key: &'static str,
    token: &Token<'a>,
    value: u32,
) -> Result<bool, ErrMode<GrammarError<'a>>> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(ErrMode::Cut(GrammarError::out_of_range(key, token))),
    }
}

fn help_topic<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
) -> Result<Option<&'src str>, ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Ident => {
            *input = rest;
            Ok(Some(token.lexeme))
        }
        Some((token, _)) if token.kind == TokenKind::Eol => Ok(None),
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            "identifier",
            Some(token),
        ))),
        None => Ok(None),
    }
}

fn expect_kind<'src, 'slice>(
    kind: TokenKind,
    label: &'static str,
) -> impl Parser<Input<'src, 'slice>, Token<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(token),
        ))),
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(label, None))),
    }
}

fn parse_integer<'a>(token: &Token<'a>) -> Result<u32, GrammarError<'a>> {
    token
        .lexeme
        .parse::<u32>()
        .map_err(|_| GrammarError::invalid_integer(token))
}
