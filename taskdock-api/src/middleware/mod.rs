/// Middleware modules for the API server
///
/// Bearer-token authentication lives in `taskdock_shared::auth::middleware`
/// so the services and the extractor share one definition of the caller.

pub mod security;
