//! A synchronous, typed publish/subscribe bus.
//!
//! Every handler receives its own clone of the emitted [`Event`], so no
//! handler can observe or change what another handler (or the emitter) sees.
//! Handlers run in subscription order, on the emitting thread, before
//! [`EventBus::emit`] returns.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use serde::Serialize;

use crate::{
    cache::loader::WindowData,
    metadata::{DatasetMetadata, GenesTable},
};

/// The channels of the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    MetadataLoaded,
    GenesLoaded,
    DisplayChanged,
    LoadingAnimation,
    LoadingAnimationPca,
}

impl Channel {
    /// The wire name of this channel.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::MetadataLoaded => "metadata:loaded",
            Channel::GenesLoaded => "data:genes:loaded",
            Channel::DisplayChanged => "data:display:changed",
            Channel::LoadingAnimation => "loading:animation",
            Channel::LoadingAnimationPca => "loading:animation:pca",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What `data:display:changed` carries: the current window with its caches,
/// or the message of a failed load.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DisplayState {
    Window(Box<WindowData>),
    Error { error: String },
}

impl DisplayState {
    pub fn window(&self) -> Option<&WindowData> {
        match self {
            DisplayState::Window(data) => Some(data),
            DisplayState::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DisplayState::Error { .. })
    }
}

/// An event, with its payload.
#[derive(Clone, Debug)]
pub enum Event {
    MetadataLoaded(DatasetMetadata),
    GenesLoaded(GenesTable),
    DisplayChanged(DisplayState),
    LoadingAnimation { status: bool },
    LoadingAnimationPca { status: bool },
}

impl Event {
    pub fn channel(&self) -> Channel {
        match self {
            Event::MetadataLoaded(_) => Channel::MetadataLoaded,
            Event::GenesLoaded(_) => Channel::GenesLoaded,
            Event::DisplayChanged(_) => Channel::DisplayChanged,
            Event::LoadingAnimation { .. } => Channel::LoadingAnimation,
            Event::LoadingAnimationPca { .. } => Channel::LoadingAnimationPca,
        }
    }
}

type Handler = Rc<dyn Fn(Event)>;

#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<Channel, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `channel`.
    pub fn on<F>(&self, channel: Channel, handler: F)
    where
        F: Fn(Event) + 'static,
    {
        self.handlers
            .borrow_mut()
            .entry(channel)
            .or_default()
            .push(Rc::new(handler));
    }

    /// Deliver a clone of `event` to every subscriber of its channel.
    ///
    /// Handlers may subscribe or emit from within a handler; a handler
    /// subscribed during an emit only sees later events.
    pub fn emit(&self, event: Event) {
        let channel = event.channel();
        let handlers: Vec<Handler> = self
            .handlers
            .borrow()
            .get(&channel)
            .cloned()
            .unwrap_or_default();
        log::trace!("emit {} to {} subscriber(s)", channel, handlers.len());
        for handler in handlers {
            handler(event.clone());
        }
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.handlers
            .borrow()
            .get(&channel)
            .map_or(0, |handlers| handlers.len())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        let mut channels: Vec<_> = handlers
            .iter()
            .map(|(channel, handlers)| (channel.name(), handlers.len()))
            .collect();
        channels.sort();
        f.debug_struct("EventBus")
            .field("subscribers", &channels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::DatasetMetadata, prelude::*};
    use std::cell::Cell;

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::DisplayChanged.name(), "data:display:changed");
        assert_eq!(Channel::LoadingAnimationPca.to_string(), "loading:animation:pca");
    }

    #[test]
    fn test_emit_reaches_only_channel_subscribers() {
        let bus = EventBus::new();
        let loading = Rc::new(Cell::new(0));
        let display = Rc::new(Cell::new(0));

        let counter = Rc::clone(&loading);
        bus.on(Channel::LoadingAnimation, move |_| counter.set(counter.get() + 1));
        let counter = Rc::clone(&display);
        bus.on(Channel::DisplayChanged, move |_| counter.set(counter.get() + 1));

        bus.emit(Event::LoadingAnimation { status: true });
        bus.emit(Event::LoadingAnimation { status: false });
        bus.emit(Event::LoadingAnimationPca { status: true });

        assert_eq!(loading.get(), 2);
        assert_eq!(display.get(), 0);
        assert_eq!(bus.subscriber_count(Channel::LoadingAnimation), 1);
        assert_eq!(bus.subscriber_count(Channel::GenesLoaded), 0);
    }

    #[test]
    fn test_handlers_get_independent_copies() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        // the first handler mutates its copy
        bus.on(Channel::MetadataLoaded, |event| {
            if let Event::MetadataLoaded(mut metadata) = event {
                metadata.samples.clear();
                metadata.ploidy = 9;
            }
        });
        let sink = Rc::clone(&seen);
        bus.on(Channel::MetadataLoaded, move |event| {
            if let Event::MetadataLoaded(metadata) = event {
                sink.borrow_mut().push(metadata);
            }
        });

        let metadata = DatasetMetadata::new(2, chroms!(1 => (1, 100)), sample_ids!["A", "B"]);
        bus.emit(Event::MetadataLoaded(metadata.clone()));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], metadata);
    }

    #[test]
    fn test_handler_can_emit() {
        let bus = Rc::new(EventBus::new());
        let cleared = Rc::new(Cell::new(false));

        let inner = Rc::clone(&bus);
        bus.on(Channel::DisplayChanged, move |_| {
            inner.emit(Event::LoadingAnimation { status: false })
        });
        let flag = Rc::clone(&cleared);
        bus.on(Channel::LoadingAnimation, move |event| {
            if let Event::LoadingAnimation { status } = event {
                flag.set(!status);
            }
        });

        bus.emit(Event::DisplayChanged(DisplayState::Error {
            error: "no data".to_string(),
        }));
        assert!(cleared.get());
    }

    #[test]
    fn test_error_display_serialization() {
        let state = DisplayState::Error {
            error: "boom".to_string(),
        };
        assert!(state.is_error());
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({"error": "boom"})
        );
    }
}
