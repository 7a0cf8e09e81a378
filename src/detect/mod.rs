//! Object detector adapters.
//!
//! A backend turns one decoded image into an ordered list of raw boxes. The
//! order is the backend's own output order and is preserved downstream.

mod backend;
pub mod backends;
pub mod letterbox;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::{ScriptedBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::{load_backend, BackendKind, BackendSettings};
pub use result::{non_max_suppression, RawDetection};
