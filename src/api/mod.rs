pub mod handlers;
pub mod response;
mod routes;

pub use routes::{create_accessibility_router, create_notes_router};
