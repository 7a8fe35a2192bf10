// Engine orchestration: engine boundary, session lifecycle and server-call routing.

pub mod bridge;
pub mod manager;
pub mod session;
pub mod stats;
pub mod traits;
