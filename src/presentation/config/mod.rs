mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    AsrProviderSetting, AsrSettings, DatabaseSettings, LoggingSettings, PipelineSettings,
    ServerSettings, Settings, StorageSettings,
};
