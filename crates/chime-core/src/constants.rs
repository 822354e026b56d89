/// Identifier the plugin registers with the chat host.
pub const PLUGIN_ID: &str = "chime";

/// Real-time event emitted to every recipient when an event fires.
pub const EVENT_OCCUR_BROADCAST: &str = "event_occur";

/// Fully qualified name the host delivers to websocket clients.
pub const EVENT_OCCUR_WIRE_NAME: &str =
    const_str::concat!("custom_", PLUGIN_ID, "_", EVENT_OCCUR_BROADCAST);

/// Attachment color used when an event has none.
pub const DEFAULT_COLOR: &str = "#D0D0D0";

/// Ticker period of the background scheduler, in seconds.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 15;
