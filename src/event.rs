//! The values that flow through the pipeline and their wire format.

use serde::{Deserialize, Serialize};

/// A single stat observation. Count events are deltas to a counter, value
/// events are samples of a gauge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Event {
    Count {
        #[serde(rename = "stat")]
        name: String,
        count: i64,
    },
    Value {
        #[serde(rename = "stat")]
        name: String,
        value: f64,
    },
}

impl Event {
    pub fn count(name: impl Into<String>, count: i64) -> Self {
        Event::Count {
            name: name.into(),
            count,
        }
    }

    pub fn value(name: impl Into<String>, value: f64) -> Self {
        Event::Value {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Event::Count { name, .. } | Event::Value { name, .. } => name,
        }
    }
}

/// A group of events sent to the collector in one request. Serializes as
/// `{"ezkey": ..., "data": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(rename = "ezkey")]
    pub key: String,
    #[serde(rename = "data")]
    pub items: Vec<Event>,
}

impl Batch {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            items: Vec::new(),
        }
    }

    pub fn with_capacity(key: impl Into<String>, capacity: usize) -> Self {
        Self {
            key: key.into(),
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.items.push(event);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// What the collector answers with. Only `status == 200` is a success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: i64,
    #[serde(rename = "msg", default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<i64>,
}

impl ApiResponse {
    pub const OK: i64 = 200;

    pub fn ok() -> Self {
        Self {
            status: Self::OK,
            message: "ok".into(),
            multiple: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Self::OK
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn batch_wire_format() {
        let mut batch = Batch::new("ezkey");
        batch.push(Event::count("a", 1));
        batch.push(Event::value("latency", 2.5));
        let encoded: serde_json::Value = serde_json::from_slice(&batch.to_json().unwrap()).unwrap();
        assert_eq!(
            encoded,
            json!({
                "ezkey": "ezkey",
                "data": [
                    {"stat": "a", "count": 1},
                    {"stat": "latency", "value": 2.5},
                ]
            })
        );
    }

    #[test]
    fn untagged_events_decode_by_field() {
        let batch: Batch = serde_json::from_value(json!({
            "ezkey": "k",
            "data": [{"stat": "c", "count": 3}, {"stat": "v", "value": 0.5}],
        }))
        .unwrap();
        assert_eq!(batch.items, vec![Event::count("c", 3), Event::value("v", 0.5)]);
        assert_eq!(batch.items[1].name(), "v");
    }

    #[test]
    fn response_decodes_without_optional_fields() {
        let resp: ApiResponse = serde_json::from_str(r#"{"status": 500}"#).unwrap();
        assert!(!resp.is_ok());
        assert_eq!(resp.message, "");

        let resp: ApiResponse =
            serde_json::from_str(r#"{"status": 200, "msg": "ok", "multiple": 2}"#).unwrap();
        assert!(resp.is_ok());
        assert_eq!(resp.multiple, Some(2));
    }
}
