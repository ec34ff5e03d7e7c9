/// Failure taxonomy for the chat façade.
///
/// `NotFound` deliberately covers both "no such message" and "not yours" so
/// deletion attempts cannot probe for other users' messages.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),

    #[error("user not found")]
    Unauthorized,

    #[error("message not found or unauthorized")]
    NotFound,

    #[error("persistence failure: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl ChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
