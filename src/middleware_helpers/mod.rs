pub mod request_id;
pub mod retry;

pub use request_id::request_id_middleware;
pub use retry::{poll_until, PollConfig, PollError, PollStatus};
