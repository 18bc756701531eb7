mod extract;
mod server;

pub use extract::{BearerToken, CurrentUser, ValidForm, ValidJson};
pub use server::{AppState, HttpServer, HttpServerConfig};
