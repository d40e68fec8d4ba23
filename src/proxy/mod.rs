/// Session proxy service and its HTTP surface - Gateway
mod health;
mod server;
mod service;

pub use health::is_proxy_running;
pub use server::{build_router, serve, AppState, HealthResponse};
pub use service::{PredictOutcome, PredictResponse, SessionProxy};
