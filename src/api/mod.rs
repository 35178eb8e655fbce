pub mod contact;
pub mod health;
pub mod records;
pub mod routes;

pub use routes::{apply_pipeline, create_router, AppState};
