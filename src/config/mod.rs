// src/config/mod.rs
pub mod sentinel;

pub use sentinel::{
    AlertsSection, ClassifierSection, EngineSection, RulesSection, SentinelConfig, StoreKind,
    StoreSection, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH,
};
