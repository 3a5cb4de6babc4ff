//! Test configuration helpers for creating pipelines

use pixfetch::{Config, Pipeline, SupersedePolicy};
use std::time::Duration;

/// Configuration with short timeouts suited to a local mock server
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.fetch.default_timeout = Duration::from_secs(5);
    config.fetch.connect_timeout = Duration::from_secs(2);
    config
}

/// Pipeline over the real HTTP fetcher using [`test_config`]
pub fn create_test_pipeline() -> Pipeline {
    Pipeline::new(test_config()).expect("test configuration is valid")
}

/// Pipeline using `policy` for superseded runs
pub fn create_pipeline_with_policy(policy: SupersedePolicy) -> Pipeline {
    let mut config = test_config();
    config.display.supersede = policy;
    Pipeline::new(config).expect("test configuration is valid")
}
