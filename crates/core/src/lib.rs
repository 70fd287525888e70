pub mod config;
pub mod protocol;

pub use config::{load_dotenv, RenderConfig};
pub use protocol::{Protocol, UnknownProtocol};
