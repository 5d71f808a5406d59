pub mod config;
pub mod error;
pub mod job;

pub use config::{load_dotenv, BackendConfig, Config, PostgresConfig, RedisConfig, ServerConfig};
pub use error::AurisError;
pub use job::*;
