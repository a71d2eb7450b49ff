use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Insert was called with a key the tree already holds. The tree is unchanged.
    #[error("key is already present")]
    DuplicateKey,

    #[error("key not found")]
    NotFound,
}
