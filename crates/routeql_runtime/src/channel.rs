//! Realtime channel paths for subscription fields.
//!
//! A subscription field `personCreated(firstname: String)` owns the channel
//! pattern `/personCreated/{firstname}`. Publishing or subscribing substitutes
//! each parameter with a URL-encoded value to get a concrete path such as
//! `/personCreated/john`.

use crate::document::FieldDef;
use crate::error::{RouteqlError, RouteqlResult};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

/// Channel pattern of a subscription field.
pub fn channel_pattern(field: &FieldDef) -> String {
    let mut pattern = format!("/{}", field.name);
    for arg in field.arguments.keys() {
        pattern.push_str("/{");
        pattern.push_str(arg);
        pattern.push('}');
    }
    pattern
}

/// Concrete channel path of a subscription field.
///
/// `lookup` supplies the value for each declared argument; a missing value is
/// an error.
pub fn concrete_path<'a, F>(field: &FieldDef, lookup: F) -> RouteqlResult<String>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    let mut path = format!("/{}", field.name);
    for arg in field.arguments.keys() {
        let value = lookup(arg).ok_or_else(|| {
            RouteqlError::channel(format!(
                "Missing \"{arg}\" to compute the channel for subscription \"{}\"",
                field.name
            ))
        })?;
        path.push('/');
        path.push_str(&urlencoding::encode(&segment(value)));
    }
    Ok(path)
}

fn segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Transport that delivers published payloads to subscribers.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Subscribes to a concrete channel path.
    async fn subscribe(&self, path: &str) -> RouteqlResult<BoxStream<'static, Value>>;
}
