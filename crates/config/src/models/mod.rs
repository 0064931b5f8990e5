pub mod app_config;
pub mod broker;
pub mod logging;
pub mod omdb;
pub mod server;

pub use app_config::*;
pub use broker::*;
pub use logging::*;
pub use omdb::*;
pub use server::*;
