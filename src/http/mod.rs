//! HTTP surface of the meal API.

mod decode;
mod routes;
mod server;

pub use decode::decode_component;
pub use routes::AppState;
pub use server::{router, HttpServer};
