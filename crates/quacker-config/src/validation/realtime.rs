//! Validation for the `[realtime]` section.

use crate::schema::QuackerConfig;

use super::helpers::validate_range;

pub(crate) fn validate_realtime(errors: &mut Vec<String>, config: &QuackerConfig) {
    let rt = &config.realtime;

    if !(rt.url.starts_with("ws://") || rt.url.starts_with("wss://")) {
        errors.push(format!(
            "realtime.url = {:?} must start with ws:// or wss://",
            rt.url
        ));
    }

    validate_range(
        errors,
        "realtime.heartbeat_interval_secs",
        rt.heartbeat_interval_secs,
        1,
        3600,
    );
    validate_range(
        errors,
        "realtime.reconnect_base_delay_ms",
        rt.reconnect_base_delay_ms,
        10,
        60_000,
    );
    validate_range(
        errors,
        "realtime.max_reconnect_attempts",
        rt.max_reconnect_attempts,
        0,
        20,
    );
    validate_range(
        errors,
        "realtime.connect_timeout_secs",
        rt.connect_timeout_secs,
        1,
        120,
    );
}
