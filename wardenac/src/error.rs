use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] wardencore::error::BackendError),
    #[error(transparent)]
    Rbac(#[from] wardenrbac::error::Error),
    #[error("unknown user: {0}")]
    UnknownUser(i64),
    #[error("unknown user: {0:?}")]
    UnknownUserName(String),
    #[error("unknown {class_name}: {id}")]
    UnknownRecord {
        class_name: &'static str,
        id: i64,
    },
    #[error("missing required argument {0}")]
    MissingArgument(&'static str),
}

