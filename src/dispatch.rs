//! The engine that routes events to handlers.
//!
//! [`EventDispatcher`] owns two registries:
//!
//! * the **handler registry**: one live instance per loaded handler name;
//! * the **subscription registry**: for each event name, the handlers to
//!   invoke, in registration order.
//!
//! Both are only mutated by [`load_dispatcher`](EventDispatcher::load_dispatcher),
//! [`unload_dispatcher`](EventDispatcher::unload_dispatcher) and
//! [`reload_dispatcher_config`](EventDispatcher::reload_dispatcher_config),
//! and only read by [`dispatch`](EventDispatcher::dispatch).  Everything runs
//! on one thread; handlers are `Rc<RefCell<_>>`, so the type system keeps it
//! that way.

use crate::config::Config;
use crate::event::Event;
use crate::handlers::{HandlerContext, HandlerFactory};
use crate::ipc::reader::{EventReader, StreamError};
use crate::traits::{CommandGateway, HandlerError, SharedHandler};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::io::Read;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Errors from handler lifecycle operations and dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The configuration has no section for this handler.
    #[error("config for handler '{0}' not found, skipping")]
    ConfigurationMissing(String),
    /// No handler implementation is registered under this name.
    #[error("no handler named '{0}'")]
    UnknownHandler(String),
    /// The operation needs a loaded handler.
    #[error("handler '{0}' is not loaded")]
    NotLoaded(String),
    /// A handler failed while loading its configuration or handling an event.
    #[error("handler '{name}': {source}")]
    Handler {
        name: String,
        #[source]
        source: HandlerError,
    },
}

/// One entry in a subscription list.
struct Subscriber {
    name: String,
    handler: SharedHandler,
}

/// Routes events from the stream to subscribed handlers.
///
/// # Typical usage
///
/// ```ignore
/// let gateway: Rc<dyn CommandGateway> = Rc::new(Hyprctl::new());
/// let mut dispatcher = EventDispatcher::new(config, HandlerFactory::builtin(), gateway);
/// dispatcher.load_all_dispatchers();
/// dispatcher.run(socket::connect_events()?)?;
/// ```
pub struct EventDispatcher {
    config: Config,
    factory: HandlerFactory,
    context: HandlerContext,
    handlers: HashMap<String, SharedHandler>,
    subscriptions: HashMap<String, Vec<Subscriber>>,
    running: Arc<AtomicBool>,
}

impl EventDispatcher {
    /// Create a dispatcher with no handlers loaded.
    pub fn new(config: Config, factory: HandlerFactory, gateway: Rc<dyn CommandGateway>) -> Self {
        Self {
            config,
            factory,
            context: HandlerContext::new(gateway),
            handlers: HashMap::new(),
            subscriptions: HashMap::new(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag checked between dispatch cycles; clearing it stops [`run`](Self::run).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Whether a handler named `name` is loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Names of the handlers subscribed to `event_name`, in invocation order.
    pub fn subscribers(&self, event_name: &str) -> Vec<String> {
        self.subscriptions
            .get(event_name)
            .map(|subs| subs.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Load every handler listed in `general.loaded`.
    ///
    /// Failures are logged and skipped.  Returns how many handlers loaded.
    pub fn load_all_dispatchers(&mut self) -> usize {
        let names = self.config.general.loaded.clone();
        let mut loaded = 0;
        for name in &names {
            match self.load_dispatcher(name) {
                Ok(()) => loaded += 1,
                Err(e) => error!("{}", e),
            }
        }
        info!("loaded {} of {} handler(s)", loaded, names.len());
        loaded
    }

    /// Load (or reload) handler `name` and subscribe it to its events.
    ///
    /// An already-loaded instance is reused.  Subscriptions are appended
    /// without a duplicate check: loading a handler twice without unloading
    /// it in between makes it receive each event twice.
    pub fn load_dispatcher(&mut self, name: &str) -> Result<(), DispatchError> {
        let section = self
            .config
            .handler_section(name)
            .cloned()
            .ok_or_else(|| DispatchError::ConfigurationMissing(name.to_string()))?;

        let handler = match self.handlers.get(name) {
            Some(existing) => {
                debug!("reusing loaded instance of {}", name);
                Rc::clone(existing)
            }
            None => self
                .factory
                .build(name, &self.context, None)
                .ok_or_else(|| DispatchError::UnknownHandler(name.to_string()))?
                .map_err(|source| DispatchError::Handler {
                    name: name.to_string(),
                    source,
                })?,
        };

        handler
            .borrow_mut()
            .load_config(&section)
            .map_err(|source| DispatchError::Handler {
                name: name.to_string(),
                source,
            })?;
        self.handlers.insert(name.to_string(), Rc::clone(&handler));

        let events = handler.borrow().subscriptions().to_vec();
        for event in events {
            debug!("{}: subscribing to events of type {}", name, event);
            self.subscriptions.entry(event).or_default().push(Subscriber {
                name: name.to_string(),
                handler: Rc::clone(&handler),
            });
        }

        info!("loaded handler {}", name);
        Ok(())
    }

    /// Unsubscribe handler `name` from its configured events and drop it.
    ///
    /// One registration is removed per subscribed event.
    pub fn unload_dispatcher(&mut self, name: &str) -> Result<(), DispatchError> {
        let handler = self
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::NotLoaded(name.to_string()))?;

        let events = handler.borrow().subscriptions().to_vec();
        for event in &events {
            let emptied = match self.subscriptions.get_mut(event) {
                Some(subs) => {
                    if let Some(pos) = subs.iter().position(|s| Rc::ptr_eq(&s.handler, &handler)) {
                        subs.remove(pos);
                    }
                    subs.is_empty()
                }
                None => false,
            };
            if emptied {
                self.subscriptions.remove(event);
            }
        }

        self.handlers.remove(name);
        info!("unloaded handler {}", name);
        Ok(())
    }

    /// Re-run `load_config` on a loaded handler.  Subscriptions are left
    /// as they are.
    pub fn reload_dispatcher_config(&mut self, name: &str) -> Result<(), DispatchError> {
        let handler = self
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::NotLoaded(name.to_string()))?;
        let section = self
            .config
            .handler_section(name)
            .ok_or_else(|| DispatchError::ConfigurationMissing(name.to_string()))?;

        handler
            .borrow_mut()
            .load_config(section)
            .map_err(|source| DispatchError::Handler {
                name: name.to_string(),
                source,
            })?;
        info!("reloaded config of handler {}", name);
        Ok(())
    }

    /// Invoke every handler subscribed to `event`, in registration order.
    ///
    /// A busy handler is skipped.  Any other failure stops the remaining
    /// handlers for this event and is returned.
    pub fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        let Some(subscribers) = self.subscriptions.get(event.name()) else {
            return Ok(());
        };

        for sub in subscribers {
            match sub.handler.borrow_mut().handle_event(event) {
                Ok(()) => {}
                Err(e) if e.is_busy() => {
                    debug!("{} busy, skipped {}: {}", sub.name, event, e);
                }
                Err(source) => {
                    return Err(DispatchError::Handler {
                        name: sub.name.clone(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }

    /// Read and dispatch events until the stream ends or the running flag
    /// is cleared.
    ///
    /// Dispatch errors are logged and the loop moves on to the next event.
    /// The channel is closed when this returns.
    ///
    /// The flag is checked once per cycle, before the next read.  A signal
    /// that lands during a read or a dispatch stops the loop right away; one
    /// that lands between the check and the start of the read only takes
    /// effect once the next event (or the end of the stream) arrives.
    pub fn run<R: Read>(&mut self, mut events: EventReader<R>) -> Result<(), StreamError> {
        info!("hyprevents running");
        let result = loop {
            if !self.running.load(Ordering::SeqCst) {
                info!("interrupted, shutting down");
                break Ok(());
            }

            match events.read_event() {
                Ok(event) => {
                    debug!("{:?}", event);
                    if let Err(e) = self.dispatch(&event) {
                        error!("{}", e);
                    }
                }
                Err(StreamError::Malformed(line)) => debug!("skipping malformed frame {:?}", line),
                Err(StreamError::Interrupted) => continue,
                Err(StreamError::Closed) => {
                    warn!("event stream closed by the window manager");
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        drop(events);
        debug!("event socket released");
        result
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWm;
    use crate::traits::Handler;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::io::{self, Cursor, ErrorKind};

    type Log = Rc<RefCell<Vec<String>>>;

    /// A handler whose behaviour is chosen by its config's `"mode"`.
    struct Scripted {
        label: &'static str,
        subscribes: Vec<String>,
        mode: String,
        log: Log,
    }

    impl Handler for Scripted {
        fn load_config(&mut self, config: &Value) -> Result<(), HandlerError> {
            self.subscribes = serde_json::from_value(config["subscribes"].clone())
                .map_err(|e| HandlerError::Config(e.to_string()))?;
            self.mode = config["mode"].as_str().unwrap_or("ok").to_string();
            self.log.borrow_mut().push(format!("{}:load", self.label));
            Ok(())
        }

        fn subscriptions(&self) -> &[String] {
            &self.subscribes
        }

        fn handle_event(&mut self, event: &Event) -> Result<(), HandlerError> {
            self.log
                .borrow_mut()
                .push(format!("{}:{}", self.label, event.data()));
            match self.mode.as_str() {
                "fault" => Err(HandlerError::Fault("scripted fault".into())),
                "busy" => Err(HandlerError::Busy("scripted busy".into())),
                _ => Ok(()),
            }
        }
    }

    fn factory(log: &Log) -> HandlerFactory {
        let mut factory = HandlerFactory::builtin();
        for label in ["h1", "h2"] {
            let log = Rc::clone(log);
            factory.register(label, move |_, _| {
                Ok(Rc::new(RefCell::new(Scripted {
                    label,
                    subscribes: Vec::new(),
                    mode: String::new(),
                    log: Rc::clone(&log),
                })) as SharedHandler)
            });
        }
        factory
    }

    fn make_dispatcher(config: Value) -> (EventDispatcher, Log, Rc<FakeWm>) {
        let log: Log = Rc::default();
        let wm = Rc::new(FakeWm::new(&[("DP-1", 0, 1), ("HDMI-A-1", 1, 3)], "DP-1"));
        let config: Config = serde_json::from_value(config).unwrap();
        let dispatcher = EventDispatcher::new(config, factory(&log), wm.clone());
        (dispatcher, log, wm)
    }

    fn two_handlers(h1_mode: &str) -> (EventDispatcher, Log) {
        let (mut d, log, _wm) = make_dispatcher(json!({
            "general": { "loaded": ["h1", "h2"] },
            "h1": { "subscribes": ["X", "Y"], "mode": h1_mode },
            "h2": { "subscribes": ["X"] },
        }));
        assert_eq!(d.load_all_dispatchers(), 2);
        log.borrow_mut().clear();
        (d, log)
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let (d, log) = two_handlers("ok");
        assert_eq!(d.subscribers("X"), vec!["h1", "h2"]);
        d.dispatch(&Event::new("X", "1")).unwrap();
        assert_eq!(entries(&log), vec!["h1:1", "h2:1"]);
    }

    #[test]
    fn fault_stops_remaining_handlers() {
        let (d, log) = two_handlers("fault");
        let err = d.dispatch(&Event::new("X", "1")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Handler { ref name, source: HandlerError::Fault(_) } if name == "h1"
        ));
        assert_eq!(entries(&log), vec!["h1:1"]);
    }

    #[test]
    fn busy_handler_is_skipped() {
        let (d, log) = two_handlers("busy");
        d.dispatch(&Event::new("X", "1")).unwrap();
        assert_eq!(entries(&log), vec!["h1:1", "h2:1"]);
    }

    #[test]
    fn unsubscribed_event_is_a_no_op() {
        let (d, log) = two_handlers("ok");
        d.dispatch(&Event::new("Z", "1")).unwrap();
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn unload_removes_every_subscription() {
        let (mut d, log) = two_handlers("ok");
        d.unload_dispatcher("h1").unwrap();
        assert!(!d.is_loaded("h1"));
        assert_eq!(d.subscribers("X"), vec!["h2"]);
        assert!(d.subscribers("Y").is_empty());

        d.dispatch(&Event::new("X", "1")).unwrap();
        d.dispatch(&Event::new("Y", "2")).unwrap();
        assert_eq!(entries(&log), vec!["h2:1"]);

        assert!(matches!(
            d.unload_dispatcher("h1"),
            Err(DispatchError::NotLoaded(_))
        ));
    }

    #[test]
    fn reload_keeps_subscriptions() {
        let (mut d, log) = two_handlers("ok");
        d.reload_dispatcher_config("h1").unwrap();
        assert_eq!(entries(&log), vec!["h1:load"]);
        assert_eq!(d.subscribers("X"), vec!["h1", "h2"]);
        assert_eq!(d.subscribers("Y"), vec!["h1"]);

        assert!(matches!(
            d.reload_dispatcher_config("nope"),
            Err(DispatchError::NotLoaded(_))
        ));
    }

    #[test]
    fn loading_twice_double_registers() {
        let (mut d, log) = two_handlers("ok");
        d.load_dispatcher("h1").unwrap();
        assert_eq!(d.subscribers("X"), vec!["h1", "h2", "h1"]);
        log.borrow_mut().clear();

        d.dispatch(&Event::new("X", "1")).unwrap();
        assert_eq!(entries(&log), vec!["h1:1", "h2:1", "h1:1"]);

        // Unloading removes one registration per event.
        d.unload_dispatcher("h1").unwrap();
        assert_eq!(d.subscribers("X"), vec!["h2", "h1"]);
        assert_eq!(d.subscribers("Y"), vec!["h1"]);
    }

    #[test]
    fn bulk_load_skips_failures() {
        let (mut d, _log, _wm) = make_dispatcher(json!({
            "general": { "loaded": ["missing", "h1", "duckypad", "h2"] },
            "h1": { "subscribes": ["X"] },
            "h2": { "subscribes": ["X"] },
            "duckypad": { "subscribes": ["activewindow"] },
        }));
        assert_eq!(d.load_all_dispatchers(), 2);
        assert!(d.is_loaded("h1"));
        assert!(d.is_loaded("h2"));
        assert!(!d.is_loaded("missing"));
        assert!(!d.is_loaded("duckypad"));
    }

    #[test]
    fn load_errors_are_distinguished() {
        let (mut d, _log, _wm) = make_dispatcher(json!({
            "duckypad": { "subscribes": [] },
            "h1": { "subscribes": "X" },
        }));
        assert!(matches!(
            d.load_dispatcher("missing"),
            Err(DispatchError::ConfigurationMissing(_))
        ));
        assert!(matches!(
            d.load_dispatcher("duckypad"),
            Err(DispatchError::UnknownHandler(_))
        ));
        assert!(matches!(
            d.load_dispatcher("h1"),
            Err(DispatchError::Handler { source: HandlerError::Config(_), .. })
        ));
        assert!(!d.is_loaded("h1"));
        assert!(d.subscribers("X").is_empty());
    }

    #[test]
    fn run_dispatches_until_stream_closes() {
        let (mut d, log) = two_handlers("ok");
        let stream = EventReader::new(Cursor::new(b"X>>1\ngarbage\nY>>2\nZ>>3\n".to_vec()));
        d.run(stream).unwrap();
        assert_eq!(entries(&log), vec!["h1:1", "h2:1", "h1:2"]);
    }

    #[test]
    fn run_survives_handler_faults() {
        let (mut d, log) = two_handlers("fault");
        let stream = EventReader::new(Cursor::new(b"X>>1\nY>>2\n".to_vec()));
        d.run(stream).unwrap();
        assert_eq!(entries(&log), vec!["h1:1", "h1:2"]);
    }

    #[test]
    fn run_does_not_start_when_stopped() {
        let (mut d, log) = two_handlers("ok");
        d.running_flag().store(false, Ordering::SeqCst);
        d.run(EventReader::new(Cursor::new(b"X>>1\n".to_vec()))).unwrap();
        assert!(entries(&log).is_empty());
    }

    /// Simulates a signal arriving while the loop is blocked in `read`.
    struct InterruptingStream {
        flag: Arc<AtomicBool>,
    }

    impl Read for InterruptingStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            self.flag.store(false, Ordering::SeqCst);
            Err(io::Error::from(ErrorKind::Interrupted))
        }
    }

    #[test]
    fn interrupt_stops_blocked_loop() {
        let (mut d, log) = two_handlers("ok");
        let stream = InterruptingStream {
            flag: d.running_flag(),
        };
        d.run(EventReader::new(stream)).unwrap();
        assert!(entries(&log).is_empty());
    }

    struct BrokenStream;

    impl Read for BrokenStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn read_errors_end_the_loop() {
        let (mut d, _log) = two_handlers("ok");
        let err = d.run(EventReader::new(BrokenStream)).unwrap_err();
        assert!(matches!(err, StreamError::Io(_)));
    }

    #[test]
    fn workspaceswap_end_to_end() {
        let (mut d, _log, wm) = make_dispatcher(json!({
            "general": { "loaded": ["workspaceswap"] },
            "workspaceswap": {
                "subscribes": ["focusedmon", "workspace", "moveworkspacev2", "custom"],
                "swap-ev": { "data": r"^swapws (\d+)$" },
            },
        }));
        assert_eq!(d.load_all_dispatchers(), 1);
        assert_eq!(d.subscribers("custom"), vec!["workspaceswap"]);
        wm.clear_requests();

        let stream = EventReader::new(Cursor::new(
            b"activewindow>>kitty,~\ncustom>>sleep\ncustom>>swapws 3\n".to_vec(),
        ));
        d.run(stream).unwrap();
        assert_eq!(wm.focus_requests(), vec![3]);
    }
}
