//! Reserved identifiers for the interpolation transform.
//!
//! Provides lookup for:
//! - Template globals (Math, JSON, parseInt, ...) that resolve without
//!   rewriting to an instance member access.
//! - Event-body locals ($event, arguments) added to scope inside
//!   listener statement bodies.
//! - The reserved helper identifiers the synthetic program calls.
//!
//! Uses compile-time perfect hash functions (phf) for O(1) lookup with
//! zero runtime initialization cost.

use phf::phf_set;

/// Globals resolvable inside template expressions.
/// These are never rewritten to `this.<name>`.
static TEMPLATE_GLOBALS_SET: phf::Set<&'static str> = phf_set! {
    // ES values
    "Infinity",
    "undefined",
    "NaN",
    // Global functions
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    // Built-in namespaces and constructors
    "Math",
    "Number",
    "Date",
    "Array",
    "Object",
    "Boolean",
    "String",
    "RegExp",
    "Map",
    "Set",
    "JSON",
    "Intl",
    // Module system
    "require",
};

/// Names the synthetic program reserves for itself. User-defined
/// component members must not collide with these.
static HELPERS_SET: phf::Set<&'static str> = phf_set! {
    "__vlsRenderHelper",
    "__vlsComponentHelper",
    "__vlsIterationHelper",
    "__vlsListenerHelper",
};

/// Top-level wrapper for the synthetic program.
pub const RENDER_HELPER: &str = "__vlsRenderHelper";
/// Models element construction.
pub const COMPONENT_HELPER: &str = "__vlsComponentHelper";
/// Models iteration; its callback parameters carry the loop binders.
pub const ITERATION_HELPER: &str = "__vlsIterationHelper";
/// Models an event handler bound to the component instance.
pub const LISTENER_HELPER: &str = "__vlsListenerHelper";

/// Names in scope inside an event handler statement body, in addition
/// to the surrounding scope.
pub const EVENT_LOCALS: [&str; 2] = ["$event", "arguments"];

/// Whether `name` is a template global that resolves without a
/// `this.` rewrite.
pub fn is_template_global(name: &str) -> bool {
    TEMPLATE_GLOBALS_SET.contains(name)
}

/// Whether `name` is one of the reserved helper identifiers.
pub fn is_helper(name: &str) -> bool {
    HELPERS_SET.contains(name)
}
