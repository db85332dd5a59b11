//! Built-in handlers and the registry that constructs them by name.
//!
//! Handlers are compiled into the binary.  The configuration selects which
//! ones run (`general.loaded`); [`HandlerFactory`] turns each name into a
//! fresh instance with the shared services from [`HandlerContext`].

pub mod monitor;
pub mod workspace_swap;

use crate::traits::{CommandGateway, HandlerError, SharedHandler};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use workspace_swap::WorkspaceSwap;

/// Services handed to every handler at construction time.
#[derive(Clone)]
pub struct HandlerContext {
    /// Access to the window manager's control interface.
    pub gateway: Rc<dyn CommandGateway>,
}

impl HandlerContext {
    pub fn new(gateway: Rc<dyn CommandGateway>) -> Self {
        Self { gateway }
    }
}

/// Builds a handler, optionally loading an initial configuration.
pub type Constructor =
    Box<dyn Fn(&HandlerContext, Option<&Value>) -> Result<SharedHandler, HandlerError>>;

/// Name-to-constructor registry.
#[derive(Default)]
pub struct HandlerFactory {
    constructors: HashMap<String, Constructor>,
}

impl HandlerFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory knowing every handler shipped with hyprevents.
    pub fn builtin() -> Self {
        let mut factory = Self::new();
        factory.register(workspace_swap::NAME, |ctx, config| {
            let handler = WorkspaceSwap::new(ctx.gateway.clone(), config)?;
            Ok(Rc::new(RefCell::new(handler)) as SharedHandler)
        });
        factory
    }

    /// Make `constructor` available under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&HandlerContext, Option<&Value>) -> Result<SharedHandler, HandlerError> + 'static,
    {
        self.constructors.insert(name.to_string(), Box::new(constructor));
    }

    /// Construct the handler registered under `name`.
    ///
    /// Returns `None` if the name is unknown.
    pub fn build(
        &self,
        name: &str,
        ctx: &HandlerContext,
        config: Option<&Value>,
    ) -> Option<Result<SharedHandler, HandlerError>> {
        self.constructors.get(name).map(|ctor| ctor(ctx, config))
    }
}
