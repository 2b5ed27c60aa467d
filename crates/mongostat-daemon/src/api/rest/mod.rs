//! REST endpoints: `/metrics` and `/health`

pub mod handlers;
pub mod router;
pub mod state;
