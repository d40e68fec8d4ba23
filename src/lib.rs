pub mod app;
pub mod cli;
pub mod constants;
pub mod pipeline;
pub mod proxy;
pub mod session;
pub mod utils;

pub use app::{load_config, Config};
pub use pipeline::{BindingTable, ComponentTemplate, ExtractorChain, Pipeline, RemotePipeline};
pub use proxy::{build_router, serve, AppState, SessionProxy};
pub use session::{decode_request, PredictInput, SessionPolicy};
pub use utils::ProxyError;
