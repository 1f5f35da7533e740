pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use core::{
    etl::EtlEngine, pipeline::MappingPipeline, session::Session, transport::HttpTransport,
};
pub use utils::error::{MapperError, Result};
