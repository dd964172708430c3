//! Subscription channels and event publishing.

use crate::pubsub::PubSub;
use routeql_runtime::{channel_pattern, concrete_path, ExecutableSchema, RouteqlError, RouteqlResult};
use serde_json::Value;
use tracing::debug;

/// Registers subscription channels and publishes events onto them.
#[derive(Clone)]
pub struct SubscriptionPublisher {
    pubsub: PubSub,
}

impl SubscriptionPublisher {
    pub fn new(pubsub: PubSub) -> Self {
        Self { pubsub }
    }

    pub fn pubsub(&self) -> &PubSub {
        &self.pubsub
    }

    /// Registers one channel pattern per subscription root field. Returns the
    /// registered patterns.
    pub fn register_channels(
        &self,
        schema: &ExecutableSchema,
        options: Option<&Value>,
    ) -> Vec<String> {
        schema
            .document()
            .subscription_fields()
            .map(|field| {
                let pattern = channel_pattern(field);
                self.pubsub.register_pattern(pattern.clone(), options.cloned());
                pattern
            })
            .collect()
    }

    /// Publishes `payload` for the subscription field `event_name`.
    ///
    /// Each declared argument of the field selects a path segment from the
    /// payload member of the same name. Returns the number of subscribers
    /// reached.
    pub fn publish(
        &self,
        schema: &ExecutableSchema,
        event_name: &str,
        payload: Value,
    ) -> RouteqlResult<usize> {
        let field = schema
            .document()
            .subscription_fields()
            .find(|field| field.name == event_name)
            .ok_or_else(|| RouteqlError::not_found(format!("Subscription \"{event_name}\"")))?;
        let path = concrete_path(field, |name| payload.get(name))?;
        if !self.pubsub.has_subscribers(&path) {
            debug!(event = event_name, %path, "no subscribers");
            return Ok(0);
        }
        Ok(self.pubsub.publish(path, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeql_runtime::ResolverMap;
    use serde_json::json;

    const SDL: &str = r"
        type Person { firstname: String, lastname: String }
        type Query { ok: Boolean }
        type Subscription {
            personCreated(firstname: String): Person
            tick: Int
        }
    ";

    #[tokio::test]
    async fn test_register_and_publish() {
        let schema = ExecutableSchema::from_sdl(SDL, ResolverMap::new()).unwrap();
        let publisher = SubscriptionPublisher::new(PubSub::new());

        let patterns = publisher.register_channels(&schema, Some(&json!({"qos": 1})));
        assert_eq!(patterns, vec!["/personCreated/{firstname}", "/tick"]);

        let mut john = publisher.pubsub().subscribe("/personCreated/john");
        let mut foo = publisher.pubsub().subscribe("/personCreated/foo");
        let payload = json!({"firstname": "john", "lastname": "smith"});
        let delivered = publisher
            .publish(&schema, "personCreated", payload.clone())
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(john.recv().await.unwrap(), payload);
        assert!(foo.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_errors() {
        let schema = ExecutableSchema::from_sdl(SDL, ResolverMap::new()).unwrap();
        let publisher = SubscriptionPublisher::new(PubSub::new());

        let unknown = publisher.publish(&schema, "personDeleted", json!({}));
        assert!(unknown.unwrap_err().message.contains("personDeleted"));

        let missing = publisher
            .publish(&schema, "personCreated", json!({"lastname": "smith"}));
        assert!(missing.unwrap_err().message.contains("firstname"));
    }
}
