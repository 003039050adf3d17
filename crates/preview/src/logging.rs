use crate::config::PreviewConfig;

pub fn setup_logging(config: &PreviewConfig) {
    common::setup_logging(config.log_level.clone(), config.environment.clone());
}
