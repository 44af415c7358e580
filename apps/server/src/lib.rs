//! HTTP surface for recap: `POST /process` takes a multipart `video` field and
//! answers with `{transcription, summary}`; `GET /` is a liveness probe.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod router;
pub mod state;

pub use config::ServerArgs;
pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
