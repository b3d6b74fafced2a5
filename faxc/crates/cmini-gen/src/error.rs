use cmini_par::ParseError;
use cmini_sem::SemError;
use cmini_util::Span;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("left side of assignment is not an l-value")]
    BadLvalue { span: Span },
    #[error("unsupported load/store width")]
    UnsupportedWidth { span: Span },
    #[error("function has more than six parameters/arguments")]
    TooManyArguments { span: Span },
    /// `type_of` is re-run during codegen (pointer scaling, load/store
    /// width selection); any type error it reports at this stage carries
    /// the same span/message contract as a parse-time one.
    #[error(transparent)]
    Type(#[from] ParseError),
    /// Writing the finished assembly text to the caller's sink failed (e.g.
    /// a broken stdout pipe). Unlike every other variant this has no source
    /// position to underline.
    #[error("failed to write emitted assembly: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SemError> for CodegenError {
    fn from(e: SemError) -> Self {
        match e {
            SemError::UnsupportedWidth { span } => CodegenError::UnsupportedWidth { span },
        }
    }
}

impl CodegenError {
    /// `None` only for `Io`, which has no source position to underline.
    pub fn span(&self) -> Option<Span> {
        match self {
            CodegenError::BadLvalue { span }
            | CodegenError::UnsupportedWidth { span }
            | CodegenError::TooManyArguments { span } => Some(*span),
            CodegenError::Type(e) => Some(e.span()),
            CodegenError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodegenError>;
