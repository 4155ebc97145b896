//! Optimistic editing of a single profile view.

mod reconciler;
pub mod validation;

pub use reconciler::{LoadTicket, ProfileReconciler, SaveTicket};

use shared::models::profile::FieldNotApplicable;
use thiserror::Error;

use crate::error::ApiError;

/// Message shown when there is no profile to load.
pub const USER_NOT_FOUND: &str = "User not found";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    FieldNotApplicable(#[from] FieldNotApplicable),

    #[error("You can only edit your own profile")]
    NotOwner,

    #[error("{0}")]
    Validation(&'static str),

    #[error("A save is already in progress")]
    SaveInFlight,

    #[error("No profile loaded")]
    NotLoaded,

    #[error("User not found")]
    MissingSubject,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What happened to a response handed back to the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The view moved on (another load started) before the response arrived.
    Discarded,
}
