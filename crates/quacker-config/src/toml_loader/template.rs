//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Quacker Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[realtime]
url = "ws://localhost:8080/ws"
# heartbeat_interval_secs = 30    # 1-3600
# reconnect_base_delay_ms = 1000  # 10-60000, doubled per attempt
# max_reconnect_attempts = 5      # 0-20
# connect_timeout_secs = 15       # 1-120

[logging]
# level = "INFO"                  # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
