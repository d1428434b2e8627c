use env_logger::Env;

use llm_evaluator::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) {
    env_logger::Builder::from_env(Env::default().default_filter_or(config.level.as_str()))
        .format_timestamp_millis()
        .init();
}
