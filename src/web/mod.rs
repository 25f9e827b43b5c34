pub mod extract;
pub mod server;

pub use server::{router, AppState, WebServer};
