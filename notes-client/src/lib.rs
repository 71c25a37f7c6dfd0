//! Client-side behaviors of the notes pages.
//!
//! Every behavior is written against the [`Document`], [`Transport`],
//! [`Browser`] and [`Timer`] seams, so the same code drives the real page
//! (see the `web` module, `wasm32` only) and the in-memory [`headless`]
//! document used by tests.

pub mod browser;
pub mod dom;
pub mod error;
pub mod flash;
pub mod headless;
pub mod modal;
pub mod submit;
pub mod timer;
pub mod transport;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use browser::Browser;
pub use dom::{Document, DocumentExt, FormFields};
pub use error::{ClientError, TransportError};
pub use flash::FlashDismissal;
pub use modal::{EditDraft, show_edit_modal};
pub use submit::{EditFormSubmitter, SubmitEvent, SubmitOutcome, SubmitState};
pub use timer::Timer;
pub use transport::Transport;

#[cfg(not(target_arch = "wasm32"))]
pub use timer::TokioTimer;
#[cfg(not(target_arch = "wasm32"))]
pub use transport::HttpTransport;
