//! Centralized error type for the ostinato umbrella crate.
//!
//! Wraps kernel errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ostinato_core::Error),

    #[error("Scheduler is owned by the audio device; offline rendering is unavailable")]
    SchedulerDetached,
}

impl From<ostinato_core::GraphError> for Error {
    fn from(error: ostinato_core::GraphError) -> Self {
        Self::Core(error.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
