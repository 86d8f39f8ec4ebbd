//! Application state.

use std::fs::File;

use verificat_verify::Verifier;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Verifier over the file-backed almanac.
    pub(crate) verifier: Verifier<File>,
}
