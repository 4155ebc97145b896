#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! Client-side core of AlumNet.
//!
//! The pieces stack as follows: [`TokenStore`] keeps the bearer credential,
//! [`ApiClient`] talks to the REST backend with it, [`Session`] tracks who is
//! signed in, and [`ProfileReconciler`] drives optimistic profile edits for a
//! single profile view.
//!
//! None of this is a security boundary. The backend authorizes every
//! request; role checks here only decide what to offer the user.

pub mod api;
pub mod error;
pub mod profile;
pub mod session;
pub mod token_store;

pub use api::{ApiClient, AuthApi, ProfileApi, ResumeUpload};
pub use error::ApiError;
pub use profile::{LoadTicket, Outcome, ProfileError, ProfileReconciler, SaveTicket};
pub use session::{Session, SessionError, SessionState};
pub use token_store::{
    Credential, FileTokenBackend, MemoryTokenBackend, TokenBackend, TokenStore, TokenStoreError,
};
