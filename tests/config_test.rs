use mailroom::config::{Config, PipelineConfig};
use mailroom::queue::{Order, Wait};
use mailroom::{Error, State};

#[test]
fn config_from_env_reads_optional_fields() {
    // Environment is process-wide, so every env case lives in this one test.
    unsafe {
        std::env::remove_var("OTEL_ENDPOINT");
        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("MAILROOM_CONFIG");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.otel_endpoint, None);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.pipeline().unwrap(), PipelineConfig::default());

    unsafe {
        std::env::set_var("OTEL_ENDPOINT", "http://localhost:4317");
        std::env::set_var("LOG_LEVEL", "mailroom=debug");
        std::env::set_var("MAILROOM_CONFIG", "  ");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.log_level, "mailroom=debug");
    assert_eq!(config.pipeline_file, None, "blank values count as unset");

    unsafe {
        std::env::set_var("MAILROOM_CONFIG", "/nonexistent/mailroom.toml");
    }
    let config = Config::from_env().unwrap();
    assert!(matches!(config.pipeline(), Err(Error::Config(_))));

    // Clean up
    unsafe {
        std::env::remove_var("OTEL_ENDPOINT");
        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("MAILROOM_CONFIG");
    }
}

#[test]
fn pipeline_toml_overrides_only_given_keys() {
    let config = PipelineConfig::from_toml_str(
        r#"
        [pipeline]
        action_capacity = 16
        time_scale = 0.5
        order = "lifo"
        wait = "spin"

        [pipeline.latency]
        addressing = 0.8
        "#,
    )
    .unwrap();

    assert_eq!(config.action_capacity, 16);
    assert_eq!(config.time_scale, 0.5);
    assert_eq!(config.order, Order::Lifo);
    assert_eq!(config.wait, Wait::Spin);
    assert_eq!(config.latency.seconds(State::Sealed), Some(0.8));

    let defaults = PipelineConfig::default();
    assert_eq!(config.journal_capacity, defaults.journal_capacity);
    assert_eq!(config.jitter, defaults.jitter);
    assert_eq!(config.latency.folding, defaults.latency.folding);
}

#[test]
fn empty_pipeline_table_gives_defaults() {
    let config = PipelineConfig::from_toml_str("[pipeline]\n").unwrap();
    assert_eq!(config, PipelineConfig::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let result = PipelineConfig::from_toml_str("[pipeline]\nworkers = 4\n");
    assert!(matches!(result, Err(Error::Config(_))));

    let result = PipelineConfig::from_toml_str("[pipeline.latency]\nlicking = 0.1\n");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn invalid_values_fail_validation() {
    for toml in [
        "[pipeline]\naction_capacity = 0\n",
        "[pipeline]\njournal_capacity = 0\n",
        "[pipeline]\njitter = -0.1\n",
        "[pipeline]\ntime_scale = -1.0\n",
        "[pipeline.latency]\nmailing = -0.7\n",
    ] {
        let result = PipelineConfig::from_toml_str(toml);
        assert!(matches!(result, Err(Error::Config(_))), "{toml}");
    }

    let config = PipelineConfig {
        time_scale: f64::NAN,
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn pipeline_config_loads_from_file() {
    let path = std::env::temp_dir().join(format!("mailroom-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "[pipeline]\njournal_capacity = 7\ndisplay_interval_ms = 20\n").unwrap();

    let config = PipelineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.journal_capacity, 7);
    assert_eq!(config.display_interval().as_millis(), 20);
    assert!(matches!(PipelineConfig::load(&path), Err(Error::Config(_))));
}

#[test]
fn instant_config_never_sleeps() {
    let config = PipelineConfig::instant();
    assert_eq!(config.time_scale, 0.0);
    assert!(config.validate().is_ok());
}
