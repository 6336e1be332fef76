pub mod compose;
pub mod config_store;
pub mod driver;
pub mod health;
pub mod prerequisites;
pub mod prompt;
pub mod remediation;
pub mod sequencer;
pub mod settings_loader;
