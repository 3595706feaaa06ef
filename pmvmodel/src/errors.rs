use pmvcovers::CoverError;
use pmvlibrary::LibraryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Cover(#[from] CoverError),
}
