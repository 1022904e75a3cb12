use super::*;

#[test]
fn env_parse_missing_returns_default() {
    let val: u64 = env_parse("__WALLSYNC_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__WALLSYNC_TEST_VALID__", "99") };
    let val: u64 = env_parse("__WALLSYNC_TEST_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__WALLSYNC_TEST_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__WALLSYNC_TEST_INVALID__", "soon") };
    let val: u64 = env_parse("__WALLSYNC_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__WALLSYNC_TEST_INVALID__") };
}

#[test]
fn from_env_defaults_then_overrides_then_rejects_bad_port() {
    unsafe {
        std::env::remove_var("PORT");
        std::env::remove_var("WALL_STATE_DIR");
        std::env::remove_var("SNAPSHOT_FLUSH_MS");
        std::env::remove_var("MAX_BODY_BYTES");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    assert_eq!(config.snapshot_dir, None);
    assert_eq!(config.snapshot_flush_ms, DEFAULT_SNAPSHOT_FLUSH_MS);

    unsafe {
        std::env::set_var("PORT", "8081");
        std::env::set_var("WALL_STATE_DIR", "/var/lib/wallsync");
        std::env::set_var("SNAPSHOT_FLUSH_MS", "0");
        std::env::set_var("MAX_BODY_BYTES", "1048576");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.port, 8081);
    assert_eq!(config.snapshot_dir, Some(PathBuf::from("/var/lib/wallsync")));
    assert_eq!(config.snapshot_flush_ms, 1);
    assert_eq!(config.max_body_bytes, 1_048_576);

    unsafe { std::env::set_var("PORT", "eighty") };
    assert!(matches!(Config::from_env(), Err(ConfigError::InvalidPort(raw)) if raw == "eighty"));

    unsafe {
        std::env::remove_var("PORT");
        std::env::remove_var("WALL_STATE_DIR");
        std::env::remove_var("SNAPSHOT_FLUSH_MS");
        std::env::remove_var("MAX_BODY_BYTES");
    }
}
