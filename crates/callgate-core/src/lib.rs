#![allow(clippy::must_use_candidate)]

mod envelope;
mod error;
mod mask;

pub use envelope::{Code, Envelope};
pub use error::{HttpError, error_envelope};
pub use mask::{mask_secret, mask_url};
