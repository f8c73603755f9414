// SPDX-License-Identifier: Apache-2.0 OR MIT
use thiserror::Error;

/// Failures raised while linking registries into a [`crate::Handler`].
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A registry with the same uid was already added to the handler.
    #[error("registry {uid:?} is already registered")]
    DuplicateRegistry { uid: String },
    /// A registry refused to register its functions, aliases or notices.
    #[error("registry {uid:?} failed to register: {message}")]
    Registration { uid: String, message: String },
}

impl HandlerError {
    pub fn registration(uid: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::Registration {
            uid: uid.into(),
            message: message.into(),
        }
    }
}
