/// Errors reported by map construction and by the structural self-check.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("a fixed default value and a default generator are mutually exclusive")]
    ConflictingDefaults,
    #[error("keys are not in strictly ascending order")]
    Unordered,
    #[error("stored height {stored} does not match computed height {computed}")]
    HeightMismatch { stored: usize, computed: usize },
    #[error("balance factor {balance} is out of range")]
    Unbalanced { balance: isize },
    #[error("cached length {cached} does not match {counted} reachable nodes")]
    LengthMismatch { cached: usize, counted: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
