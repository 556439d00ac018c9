//! Inbound frame handling: parse, log notable kinds, dispatch.

use tracing::{debug, info, warn};

use crate::message::{Message, MessageKind};
use crate::registry::SubscriberRegistry;

/// Handle one inbound text frame.
///
/// Malformed frames are logged and dropped; they never reach subscribers
/// and never affect the connection.
pub(crate) fn handle_inbound_text(text: &str, registry: &SubscriberRegistry) {
    let message = match Message::parse(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, len = text.len(), "Failed to parse duck network message");
            return;
        }
    };

    log_notable(&message);

    let delivered = registry.dispatch(&message);
    debug!(kind = %message.kind(), delivered, "Message dispatched");
}

fn log_notable(message: &Message) {
    match message.kind() {
        MessageKind::Emergency => {
            warn!(data = %message.data(), "EMERGENCY message received");
        }
        MessageKind::MoleAlert => {
            info!(data = %message.data(), "Mole detected");
        }
        MessageKind::Entanglement => {
            info!(data = %message.data(), "Quantum entanglement event");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Topic;
    use std::sync::{Arc, Mutex};

    fn recording_registry() -> (SubscriberRegistry, Arc<Mutex<Vec<Message>>>) {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.add(Topic::All, move |msg| sink.lock().unwrap().push(msg.clone()));
        (registry, seen)
    }

    #[test]
    fn well_formed_frame_is_dispatched() {
        let (registry, seen) = recording_registry();
        handle_inbound_text(
            r#"{"type":"entanglement","data":{"pair":[1,2]},"timestamp":5}"#,
            &registry,
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind(), &MessageKind::Entanglement);
        assert_eq!(seen[0].timestamp(), 5);
    }

    #[test]
    fn malformed_frame_is_dropped() {
        let (registry, seen) = recording_registry();
        handle_inbound_text("QUACK!", &registry);
        handle_inbound_text(r#"{"data":{"x":1}}"#, &registry);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(registry.len(), 1);
    }
}
