/*!
 * Tests for application configuration functionality
 */

use guacamayo::app_config::{Config, LogLevel, SettingsUpdate, TtsProvider};

use crate::common::{create_temp_dir, temp_path};

#[test]
fn test_default_config_should_have_reading_defaults() {
    let config = Config::default();

    assert_eq!(config.tts.provider, TtsProvider::Deepgram);
    assert_eq!(config.speed, 1.0);
    assert_eq!(config.reading.max_chunk_length, 1000);
    assert_eq!(config.reading.min_text_length, 50);
    assert_eq!(config.reading.container_threshold, 100);
    assert_eq!(config.reading.hierarchy_threshold, 50);
    assert_eq!(config.reading.prefetch_count, 2);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_should_reject_inconsistent_values() {
    let mut config = Config::default();
    config.speed = 5.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.reading.max_chunk_length = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.reading.hierarchy_threshold = 500;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_save_then_load_should_preserve_values() {
    let dir = create_temp_dir().unwrap();
    let path = temp_path(&dir, "conf.json");

    let mut config = Config::default();
    config.tts.provider = TtsProvider::Kokoro;
    config.tts.voice = "af_heart".to_string();
    config.speed = 1.5;
    config.reading.max_chunk_length = 300;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_or_create_should_write_defaults_when_missing() {
    let dir = create_temp_dir().unwrap();
    let path = temp_path(&dir, "fresh.json");

    let config = Config::load_or_create(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config, Config::default());
    assert_eq!(Config::load(&path).unwrap(), config);
}

#[test]
fn test_partial_config_file_should_fill_defaults() {
    let dir = create_temp_dir().unwrap();
    let path = temp_path(&dir, "partial.json");
    std::fs::write(&path, r#"{ "tts": { "api_key": "abc" }, "speed": 1.25 }"#).unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.tts.api_key, "abc");
    assert_eq!(config.speed, 1.25);
    assert_eq!(config.reading.prefetch_count, 2);
}

#[test]
fn test_invalid_config_file_should_fail_with_context() {
    let dir = create_temp_dir().unwrap();
    let path = temp_path(&dir, "broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_settings_update_should_merge_and_normalize() {
    let mut config = Config::default();

    config.apply(SettingsUpdate {
        api_key: Some("  secret  ".to_string()),
        tts_base_url: Some("http://localhost:8880/".to_string()),
        speed: Some(0.1),
        ..SettingsUpdate::default()
    });

    assert_eq!(config.tts.api_key, "secret");
    assert_eq!(config.tts.base_url, "http://localhost:8880");
    assert_eq!(config.speed, 0.25);
    assert_eq!(config.tts.voice, Config::default().tts.voice);
}

#[test]
fn test_voice_config_should_fall_back_to_provider_defaults() {
    let mut config = Config::default();
    config.tts.provider = TtsProvider::Kokoro;

    let voice = config.voice_config();

    assert_eq!(voice.provider, TtsProvider::Kokoro);
    assert_eq!(voice.base_url, TtsProvider::Kokoro.default_base_url());
    assert_eq!(voice.model, TtsProvider::Kokoro.default_model());
}

#[test]
fn test_provider_should_parse_from_name() {
    assert_eq!("deepgram".parse::<TtsProvider>().unwrap(), TtsProvider::Deepgram);
    assert_eq!("OpenAI".parse::<TtsProvider>().unwrap(), TtsProvider::OpenAiCompatible);
    assert!("unknown".parse::<TtsProvider>().is_err());
}
