

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::base::Event;


pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;


/// Delivers events to observers inline, on the emitting task.
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<String, Vec<EventHandler>>>>,
}

impl EventBus {
    
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    
    pub fn register(&self, event_type: &str, handler: EventHandler) {
        let mut handlers = self.handlers.write();
        handlers
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
        debug!("Registered handler for event type: {}", event_type);
    }

    
    pub fn emit(&self, event: Event) {
        // Clone out so handlers may register further observers.
        let event_handlers = self.handlers.read().get(&event.event_type).cloned();

        match event_handlers {
            Some(event_handlers) => {
                for handler in event_handlers {
                    handler(&event);
                }
            }
            None => debug!("No handlers for event type: {}", event.event_type),
        }
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
