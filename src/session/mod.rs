/// Inbound request decoding and session identity - Gateway

mod request;

pub use request::{decode_request, new_session_id, PredictInput, SessionPolicy};
