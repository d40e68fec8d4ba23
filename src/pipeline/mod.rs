// Gateway module for the remote pipeline - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod bindings;
mod client;
mod extract;
mod payload;
mod template;

// Public re-exports - the ONLY way to access pipeline functionality
pub use bindings::{BindSource, Binding, BindingRole, BindingTable};
pub use client::{run_url, Pipeline, RemotePipeline};
pub use extract::{ExtractorChain, PointerExtractor, ReplyExtractor, StringScanExtractor};
pub use payload::{build_payload, RunPayload};
pub use template::ComponentTemplate;

#[cfg(test)]
pub(crate) use client::MockPipeline;
