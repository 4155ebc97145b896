//! # Configuration
//!
//! Client-side settings: where the backend lives, where the bearer token is
//! kept between runs, and how chatty logging should be.

pub mod client;
