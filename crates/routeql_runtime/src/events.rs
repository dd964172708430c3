//! Field lifecycle events.
//!
//! Listeners registered on a [`Lifecycle`] are called synchronously around
//! every wired field resolution, in registration order.

use crate::context::RequestContext;
use crate::resolver::{ResolverArgs, ResolverInfo, ResolverResult};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// When the event fires relative to the resolver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPhase {
    BeforeResolve,
    AfterResolve,
}

/// Data passed to field listeners.
pub struct FieldEvent<'a> {
    pub phase: FieldPhase,
    pub parent: &'a Value,
    pub args: &'a ResolverArgs,
    pub context: &'a RequestContext,
    pub info: &'a ResolverInfo,
    /// Resolver outcome; only set for [`FieldPhase::AfterResolve`].
    pub result: Option<&'a ResolverResult>,
}

/// A field lifecycle listener.
pub type FieldListener = Arc<dyn Fn(&FieldEvent<'_>) + Send + Sync>;

/// Listener registry shared by a server and the schemas it builds.
#[derive(Default)]
pub struct Lifecycle {
    before: RwLock<Vec<FieldListener>>,
    after: RwLock<Vec<FieldListener>>,
}

impl Lifecycle {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener called before each field resolver runs.
    pub fn on_before_resolve<F>(&self, listener: F)
    where
        F: Fn(&FieldEvent<'_>) + Send + Sync + 'static,
    {
        self.before.write().push(Arc::new(listener));
    }

    /// Adds a listener called after each field resolver settles.
    pub fn on_after_resolve<F>(&self, listener: F)
    where
        F: Fn(&FieldEvent<'_>) + Send + Sync + 'static,
    {
        self.after.write().push(Arc::new(listener));
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.before.read().is_empty() && self.after.read().is_empty()
    }

    /// Calls every listener registered for the event's phase.
    pub fn emit(&self, event: &FieldEvent<'_>) {
        let listeners = match event.phase {
            FieldPhase::BeforeResolve => self.before.read().clone(),
            FieldPhase::AfterResolve => self.after.read().clone(),
        };
        for listener in &listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("before", &self.before.read().len())
            .field("after", &self.after.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_emit_by_phase() {
        let lifecycle = Lifecycle::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let before = Arc::clone(&seen);
        lifecycle.on_before_resolve(move |event| {
            before.lock().push(format!("before:{}", event.info.field_name));
        });
        let after = Arc::clone(&seen);
        lifecycle.on_after_resolve(move |event| {
            let ok = event.result.is_some_and(Result::is_ok);
            after.lock().push(format!("after:{}:{ok}", event.info.field_name));
        });

        let parent = Value::Null;
        let args = ResolverArgs::new();
        let context = RequestContext::new();
        let info = ResolverInfo::new("person", "Query");
        let result: ResolverResult = Ok(Value::Null);

        lifecycle.emit(&FieldEvent {
            phase: FieldPhase::BeforeResolve,
            parent: &parent,
            args: &args,
            context: &context,
            info: &info,
            result: None,
        });
        lifecycle.emit(&FieldEvent {
            phase: FieldPhase::AfterResolve,
            parent: &parent,
            args: &args,
            context: &context,
            info: &info,
            result: Some(&result),
        });

        assert_eq!(*seen.lock(), vec!["before:person", "after:person:true"]);
    }
}
