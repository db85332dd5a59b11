//! Entry point for the **hyprevents** daemon.
//!
//! Loads the configuration, connects to Hyprland's event socket, loads the
//! configured handlers and dispatches events on the main thread until the
//! socket closes or the process is interrupted.
//!
//! ```text
//! hyprevents [--config <path>]
//! ```

use hyprevents::config::{Config, ConfigError};
use hyprevents::dispatch::EventDispatcher;
use hyprevents::handlers::HandlerFactory;
use hyprevents::hyprland::ctl::{self, Hyprctl, NotificationKind};
use hyprevents::hyprland::socket;
use hyprevents::shutdown;
use hyprevents::traits::CommandGateway;
use log::{error, info, warn};
use std::path::PathBuf;
use std::rc::Rc;

/// Resolve the config directory (`$XDG_CONFIG_HOME/hyprevents`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("hyprevents")
}

/// The path given with `--config`, if any.
fn config_path_arg() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

/// Load the config from `--config <path>` or
/// `$XDG_CONFIG_HOME/hyprevents/config.json`.
///
/// A missing file means "no handlers".  A broken one is reported on screen
/// and ends the process.
fn load_config(gateway: &dyn CommandGateway) -> Config {
    let path = config_path_arg().unwrap_or_else(|| config_dir().join("config.json"));
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e @ ConfigError::Read { .. }) => {
            warn!("no config file ({}), no handlers will be loaded", e);
            Config::default()
        }
        Err(e) => {
            error!("{}", e);
            if let Err(e) = ctl::notify(
                gateway,
                NotificationKind::Error,
                "ff0000",
                "Hyprevents: syntax error in config file",
            ) {
                warn!("could not show notification: {}", e);
            }
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();

    let gateway: Rc<dyn CommandGateway> = Rc::new(Hyprctl::new());

    let events = match socket::connect_events() {
        Ok(events) => events,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let config = load_config(gateway.as_ref());

    let mut dispatcher = EventDispatcher::new(config, HandlerFactory::builtin(), gateway);
    if let Err(e) = shutdown::install(dispatcher.running_flag()) {
        warn!("could not install interrupt handler: {}", e);
    }
    dispatcher.load_all_dispatchers();

    if let Err(e) = dispatcher.run(events) {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("hyprevents stopped");
}
