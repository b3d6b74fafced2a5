use cmini_lex::LexError;
use cmini_util::Span;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("tokenization failed: {0}")]
    Lex(#[from] LexError),
    #[error("unexpected token, expected {expected}")]
    UnexpectedToken { span: Span, expected: String },
    #[error("unknown type name")]
    UnknownType { span: Span },
    #[error("duplicate variable declaration")]
    DuplicateDeclaration { span: Span },
    #[error("undefined variable")]
    UndefinedVariable { span: Span },
    #[error("left side of assignment is not an l-value")]
    NotAnLvalue { span: Span },
    #[error("invalid pointer arithmetic")]
    InvalidPointerArithmetic { span: Span },
    #[error("invalid dereference of non-pointer type")]
    InvalidDeref { span: Span },
    #[error("function has more than six parameters/arguments")]
    TooManyParameters { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex(e) => e.span(),
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnknownType { span }
            | ParseError::DuplicateDeclaration { span }
            | ParseError::UndefinedVariable { span }
            | ParseError::NotAnLvalue { span }
            | ParseError::InvalidPointerArithmetic { span }
            | ParseError::InvalidDeref { span }
            | ParseError::TooManyParameters { span } => *span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
