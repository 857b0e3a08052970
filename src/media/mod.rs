pub mod connector;
pub mod node;
pub mod router;

pub use connector::{ConnectorError, HttpConnector, RouterConnector};
pub use node::{MediaNode, MediaNodeConfig};
pub use router::Router;
