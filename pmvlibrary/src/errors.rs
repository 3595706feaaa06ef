use pmvbind::ConversionError;
use pmvconnect::ConnectionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LibraryError>;

#[derive(Debug, Error)]
pub enum LibraryError {
    /// A stored attribute could not be coerced to its declared type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A child node carries a kind tag we do not recognize. Surfaced, not
    /// skipped: skipping would corrupt row arithmetic in the view model.
    #[error("unknown entity kind '{0}'")]
    UnknownEntityKind(String),

    /// The item carries no usable key attribute.
    #[error("item '{0}' has no key")]
    MissingKey(String),

    /// A lookup returned no item.
    #[error("no item at '{0}'")]
    NotFound(String),

    /// The remote call behind the triggering operation failed; propagated
    /// unchanged, never turned into a partial result.
    #[error(transparent)]
    Remote(#[from] ConnectionError),
}
