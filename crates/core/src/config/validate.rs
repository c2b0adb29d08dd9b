use super::{types::Config, ConfigError};

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(msg.to_string()))
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Poll budget is non-zero
/// - Image gate capacity is non-zero
/// - Plan is non-empty and renders at least one clip
/// - Assembly geometry is non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return invalid("server.port cannot be 0");
    }

    if config.video_provider.poll_interval_secs == 0 {
        return invalid("video_provider.poll_interval_secs must be greater than 0");
    }
    if config.video_provider.max_poll_attempts == 0 {
        return invalid("video_provider.max_poll_attempts must be greater than 0");
    }

    if config.image_provider.max_concurrent == 0 {
        return invalid("image_provider.max_concurrent must be greater than 0");
    }

    if config.plan.stages.is_empty() {
        return invalid("plan.stages cannot be empty");
    }
    if config.plan.video_stage_count() == 0 {
        return invalid("plan.stages must contain at least one video stage");
    }

    let assembler = &config.assembler;
    if assembler.width == 0 || assembler.height == 0 {
        return invalid("assembler.width and assembler.height must be greater than 0");
    }
    if assembler.fps == 0 {
        return invalid("assembler.fps must be greater than 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StageSpec;

    fn assert_invalid(config: &Config) {
        let err = validate_config(config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_zero_poll_budget_fails() {
        let mut config = Config::default();
        config.video_provider.max_poll_attempts = 0;
        assert_invalid(&config);

        let mut config = Config::default();
        config.video_provider.poll_interval_secs = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_zero_gate_capacity_fails() {
        let mut config = Config::default();
        config.image_provider.max_concurrent = 0;
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_plan_without_video_fails() {
        let mut config = Config::default();
        config.plan.stages = vec![StageSpec::image("only", "A still frame.")];
        assert_invalid(&config);

        config.plan.stages.clear();
        assert_invalid(&config);
    }

    #[test]
    fn test_validate_zero_fps_fails() {
        let mut config = Config::default();
        config.assembler.fps = 0;
        assert_invalid(&config);
    }
}
