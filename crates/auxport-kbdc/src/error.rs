use thiserror::Error;

pub type Result<T> = std::result::Result<T, KbdcError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KbdcError {
    #[error("controller is held by another session")]
    Busy,

    #[error("controller did not acknowledge within {polls} status polls")]
    Timeout { polls: u32 },
}
