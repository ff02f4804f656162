//! Filter and exception-handler interfaces.

use std::fmt;

use crate::error::Fault;
use crate::pipeline::context::RequestContext;
use crate::resource::Entity;

/// Priorities: lower runs earlier.
pub mod priority {
    pub const HIGHEST: i32 = 10;
    pub const HIGHER: i32 = 40;
    pub const NORMAL: i32 = 50;
    pub const LOWER: i32 = 60;
    pub const LOWEST: i32 = 90;
}

/// Runs before the action. Receives the request entity (raw bytes at
/// first) and returns its replacement. An `Err` aborts the request.
pub trait InputFilter: Send + Sync + fmt::Debug {
    fn filter(&self, cx: &mut RequestContext<'_>, input: Entity) -> Result<Entity, Fault>;
}

/// Runs after a successful action. Receives the action output and returns
/// its replacement; may also only adjust `cx.response`.
pub trait OutputFilter: Send + Sync + fmt::Debug {
    fn filter(&self, cx: &mut RequestContext<'_>, output: Entity) -> Result<Entity, Fault>;
}

/// Runs when the action fails. Returns the fault to pass on (possibly a
/// different one), or `None` when the fault is fully handled.
pub trait ExceptionHandler: Send + Sync + fmt::Debug {
    fn handle(&self, cx: &mut RequestContext<'_>, fault: Fault) -> Option<Fault>;
}
