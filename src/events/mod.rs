//! Identity event synchronizer: one function per identity-provider
//! lifecycle event, each mapping the payload onto a single store write.

pub mod handlers;
pub mod payload;
pub mod registry;
pub mod routes;
pub mod signature;

pub use handlers::{SyncOptions, SyncOutcome};
pub use registry::{dispatch, Event, SyncFunction, SyncKind, APP_ID, FUNCTIONS};
pub use routes::{router, EVENTS_PATH};
pub use signature::{SignatureError, SigningKey};
