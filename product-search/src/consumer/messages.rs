//! Message types for the consumer.
//!
//! Defines the change events that flow through the ingest and their wire decoding.

use chrono::{DateTime, Utc};
use product_search_shared::Product;
use serde::Deserialize;

use crate::errors::IngestError;

/// Whether an upsert came from a create or an update in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
}

/// A catalog change event received from Kafka.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductEvent {
    /// The product was created or updated; `product` is the full snapshot.
    Upsert {
        product: Product,
        kind: ChangeKind,
        timestamp: DateTime<Utc>,
    },
    /// The product was deleted.
    Delete {
        product_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl ProductEvent {
    /// Create a new `Created` event.
    pub fn created(product: Product) -> Self {
        Self::Upsert {
            product,
            kind: ChangeKind::Created,
            timestamp: Utc::now(),
        }
    }

    /// Create a new `Updated` event.
    pub fn updated(product: Product) -> Self {
        Self::Upsert {
            product,
            kind: ChangeKind::Updated,
            timestamp: Utc::now(),
        }
    }

    /// Create a new delete event.
    pub fn delete(product_id: impl Into<String>) -> Self {
        Self::Delete {
            product_id: product_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Identifier of the product this event is about.
    pub fn product_id(&self) -> &str {
        match self {
            Self::Upsert { product, .. } => &product.product_id,
            Self::Delete { product_id, .. } => product_id,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Upsert {
                kind: ChangeKind::Created,
                ..
            } => "created",
            Self::Upsert {
                kind: ChangeKind::Updated,
                ..
            } => "updated",
            Self::Delete { .. } => "deleted",
        }
    }

    /// Decode a Kafka payload into a change event.
    ///
    /// Accepts the flat shape `{EventType, ProductId, Product, Timestamp}` and the
    /// catalog producer's envelope `{EventType, Payload: {...}, Metadata}`. A missing or
    /// unreadable timestamp is replaced with the arrival time.
    pub fn decode(payload: &[u8]) -> Result<Self, IngestError> {
        let wire: WireEvent = serde_json::from_slice(payload)
            .map_err(|e| IngestError::parse(format!("Invalid event JSON: {}", e)))?;
        wire.flatten().into_event()
    }
}

/// Event as it appears on the wire.
#[derive(Debug, Default, Deserialize)]
struct WireEvent {
    #[serde(rename = "EventType", default)]
    event_type: Option<String>,
    #[serde(rename = "ProductId", default)]
    product_id: Option<String>,
    #[serde(rename = "Product", default)]
    product: Option<Product>,
    #[serde(rename = "Timestamp", default)]
    timestamp: Option<String>,
    #[serde(rename = "Payload", default)]
    payload: Option<Box<WireEvent>>,
}

impl WireEvent {
    /// Unwrap an envelope, letting the inner event override the outer fields.
    fn flatten(self) -> Self {
        match self.payload {
            Some(inner) => {
                let inner = inner.flatten();
                Self {
                    event_type: inner.event_type.or(self.event_type),
                    product_id: inner.product_id.or(self.product_id),
                    product: inner.product.or(self.product),
                    timestamp: inner.timestamp.or(self.timestamp),
                    payload: None,
                }
            }
            None => self,
        }
    }

    fn into_event(self) -> Result<ProductEvent, IngestError> {
        let event_type = self
            .event_type
            .ok_or_else(|| IngestError::parse("Missing EventType"))?;

        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let product_id = self
            .product_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let kind = match event_type.trim().to_ascii_lowercase().as_str() {
            "productcreated" | "created" => Some(ChangeKind::Created),
            "productupdated" | "updated" => Some(ChangeKind::Updated),
            "productdeleted" | "deleted" => None,
            other => {
                return Err(IngestError::parse(format!("Unknown EventType '{}'", other)));
            }
        };

        match kind {
            Some(kind) => {
                let mut product = self.product.ok_or_else(|| {
                    IngestError::parse(format!("{} event without a product snapshot", event_type))
                })?;
                product.product_id = product.product_id.trim().to_string();

                match product_id {
                    Some(id) if product.product_id.is_empty() => product.product_id = id,
                    Some(id) if id != product.product_id => {
                        return Err(IngestError::parse(format!(
                            "ProductId '{}' does not match snapshot id '{}'",
                            id, product.product_id
                        )));
                    }
                    _ => {}
                }

                if !product.is_valid() {
                    return Err(IngestError::parse("Event without a product id"));
                }

                Ok(ProductEvent::Upsert {
                    product,
                    kind,
                    timestamp,
                })
            }
            None => {
                let product_id = product_id
                    .or_else(|| {
                        self.product
                            .map(|p| p.product_id.trim().to_string())
                            .filter(|id| !id.is_empty())
                    })
                    .ok_or_else(|| IngestError::parse("Delete event without a product id"))?;

                Ok(ProductEvent::Delete {
                    product_id,
                    timestamp,
                })
            }
        }
    }
}

/// Kafka coordinates of a consumed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl EventOffset {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// One change event with the offset to acknowledge.
    Event {
        event: ProductEvent,
        offset: EventOffset,
    },
    /// Outcome of applying the event at `offset`.
    Acknowledgment {
        offset: EventOffset,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Result<ProductEvent, IngestError> {
        ProductEvent::decode(value.to_string().as_bytes())
    }

    #[test]
    fn test_decode_flat_created() {
        let event = decode(json!({
            "EventType": "ProductCreated",
            "ProductId": "P1",
            "Product": { "product_id": "P1", "name": "Nike Air", "price": 120.0 },
            "Timestamp": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        match event {
            ProductEvent::Upsert {
                product,
                kind,
                timestamp,
            } => {
                assert_eq!(kind, ChangeKind::Created);
                assert_eq!(product.name, "Nike Air");
                assert_eq!(timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_envelope() {
        let event = decode(json!({
            "EventType": "ProductUpdated",
            "Payload": {
                "EventType": "ProductUpdated",
                "ProductId": "P1",
                "Product": { "product_id": "P1", "name": "Nike Air", "price": 150.0 },
                "Timestamp": "2024-05-01T10:00:00.1234567Z"
            },
            "Metadata": { "ProducedAt": "2024-05-01T10:00:00Z", "Source": "ProductService" }
        }))
        .unwrap();

        assert_eq!(event.label(), "updated");
        assert_eq!(event.product_id(), "P1");
    }

    #[test]
    fn test_decode_pascal_case_snapshot() {
        let event = decode(json!({
            "EventType": "ProductCreated",
            "ProductId": "P1",
            "Product": { "ProductId": "P1", "Name": "Nike Air", "Price": 120.0 }
        }))
        .unwrap();

        match event {
            ProductEvent::Upsert { product, .. } => {
                assert_eq!(product.product_id, "P1");
                assert_eq!(product.name, "Nike Air");
                assert_eq!(product.price, 120.0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_event_type_aliases() {
        let event = decode(json!({ "EventType": "deleted", "ProductId": "P1" })).unwrap();
        assert!(matches!(&event, ProductEvent::Delete { product_id, .. } if product_id == "P1"));

        let event = decode(json!({
            "EventType": "CREATED",
            "ProductId": "P2",
            "Product": { "name": "Boot" }
        }))
        .unwrap();
        // A snapshot without an id inherits ProductId.
        assert_eq!(event.product_id(), "P2");
    }

    #[test]
    fn test_decode_errors() {
        let cases = vec![
            json!({ "EventType": "ProductCreated", "ProductId": "P1" }),
            json!({ "EventType": "ProductArchived", "ProductId": "P1" }),
            json!({ "EventType": "ProductDeleted", "ProductId": "  " }),
            json!({ "ProductId": "P1" }),
            json!({
                "EventType": "ProductUpdated",
                "ProductId": "P1",
                "Product": { "product_id": "P2", "name": "Other" }
            }),
        ];

        for case in cases {
            let err = decode(case.clone()).unwrap_err();
            assert!(
                matches!(err, IngestError::ParseError(_)),
                "expected parse error for {}",
                case
            );
        }

        assert!(matches!(
            ProductEvent::decode(b"not json").unwrap_err(),
            IngestError::ParseError(_)
        ));
    }

    #[test]
    fn test_missing_timestamp_uses_arrival_time() {
        let before = Utc::now();
        let event = decode(json!({ "EventType": "ProductDeleted", "ProductId": "P1" })).unwrap();
        match event {
            ProductEvent::Delete { timestamp, .. } => assert!(timestamp >= before),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
