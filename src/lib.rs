pub mod attributes;
pub mod config;
pub mod env;
pub mod error;
pub mod formatter;
pub mod handler;
pub mod hostname;
pub mod layer;
pub mod level;
pub mod record;
pub mod transport;
pub mod value;

#[cfg(feature = "http")]
pub mod http;

pub mod init;

pub use attributes::Attributes;
pub use config::HandlerConfig;
pub use error::{ConfigError, DeliveryError, HandlerError};
pub use formatter::{DatadogFormatter, Formatter};
pub use handler::{DatadogHandler, Handler};
pub use level::Level;
pub use record::LogRecord;
pub use value::{Exception, Fields, Value};
