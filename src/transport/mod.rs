// Transport abstraction: how engine server calls reach the network.

pub mod http_transport;
pub mod traits;
