use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value as JsonValue;

use crate::data::model::{PingRecord, Region};
use crate::error::{MaskError, Result};

/// Default address of a locally running LSSS instance.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Endpoint that accepts school masks for the pelagic echogram.
pub const SCHOOL_MASK_PATH: &str = "/lsss/module/PelagicEchogramModule/school-mask";

// ---------------------------------------------------------------------------
// Transport – one blocking POST
// ---------------------------------------------------------------------------

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    /// Serialised as `application/json`.
    Json(JsonValue),
    /// Sent verbatim. Slow for large pings; prefer JSON masks.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub text: String,
}

/// Sends a single POST and returns whatever the server answered.
pub trait Transport {
    fn post(&self, url: &str, params: &[(String, String)], body: &Body) -> Result<Response>;
}

/// Blocking `reqwest` transport. No timeout: a hung server hangs the run.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Option::<Duration>::None)
            .build()
            .map_err(|e| MaskError::Transport(e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, params: &[(String, String)], body: &Body) -> Result<Response> {
        let mut request = self.client.post(url);
        if !params.is_empty() {
            request = request.query(params);
        }
        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Raw(bytes) => request.body(bytes.clone()),
        };

        let response = request
            .send()
            .map_err(|e| MaskError::Transport(format!("{url}: {e}")))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| MaskError::Transport(format!("{url}: reading body: {e}")))?;

        Ok(Response { status, text })
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Posts to an LSSS API rooted at `base_url`.
#[derive(Debug)]
pub struct Publisher<T> {
    base_url: String,
    transport: T,
}

impl<T: Transport> Publisher<T> {
    pub fn new(base_url: impl Into<String>, transport: T) -> Self {
        Publisher {
            base_url: base_url.into(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST `body` to `base_url + path`.
    ///
    /// * 200 → the parsed JSON response
    /// * 204 → `None`
    /// * anything else → [`MaskError::RemoteRejected`]
    pub fn post(
        &self,
        path: &str,
        params: &[(String, String)],
        body: &Body,
    ) -> Result<Option<JsonValue>> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("POST {url}");

        let response = self.transport.post(&url, params, body)?;
        match response.status {
            200 => serde_json::from_str(&response.text)
                .map(Some)
                .map_err(|e| MaskError::Transport(format!("{url}: invalid JSON response: {e}"))),
            204 => Ok(None),
            status => Err(MaskError::RemoteRejected {
                url,
                status,
                text: response.text,
            }),
        }
    }

    /// Publish one region's ping records as a school mask.
    ///
    /// Returns `Ok(false)` without contacting the server when there are no
    /// records.
    pub fn publish_mask(&self, region: &Region, records: &[PingRecord]) -> Result<bool> {
        if records.is_empty() {
            log::debug!("region {} has no mask pings, nothing to publish", region.id);
            return Ok(false);
        }

        let body = serde_json::to_value(records)
            .map_err(|e| MaskError::Transport(format!("serialising mask: {e}")))?;
        self.post(SCHOOL_MASK_PATH, &[], &Body::Json(body))?;

        log::info!(
            "Published region {} ({}) with {} pings",
            region.id,
            region.type_name,
            records.len()
        );
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::data::model::{BoundingBox, DepthRange, MaskGeometry};

    /// Records every request and answers from a queue of canned responses.
    /// Answers `204` once the queue runs dry.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingTransport {
        pub requests: RefCell<Vec<(String, Body)>>,
        pub responses: RefCell<VecDeque<Response>>,
    }

    impl RecordingTransport {
        pub(crate) fn answering(responses: Vec<(u16, &str)>) -> Self {
            RecordingTransport {
                requests: RefCell::default(),
                responses: RefCell::new(
                    responses
                        .into_iter()
                        .map(|(status, text)| Response {
                            status,
                            text: text.to_string(),
                        })
                        .collect(),
                ),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn post(&self, url: &str, _params: &[(String, String)], body: &Body) -> Result<Response> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), body.clone()));
            Ok(self.responses.borrow_mut().pop_front().unwrap_or(Response {
                status: 204,
                text: String::new(),
            }))
        }
    }

    fn region() -> Region {
        Region {
            id: 3,
            name: "school".into(),
            type_code: 0,
            type_name: "TRACKING".into(),
            categories: Vec::new(),
            bounding_box: BoundingBox {
                min_depth: 0.0,
                max_depth: 1.0,
                start_time: 0.0,
                end_time: 1.0,
            },
            mask: MaskGeometry::default(),
        }
    }

    #[test]
    fn status_200_returns_parsed_json() {
        let publisher = Publisher::new(
            DEFAULT_BASE_URL,
            RecordingTransport::answering(vec![(200, r#"{"id": 12}"#)]),
        );
        let out = publisher.post(SCHOOL_MASK_PATH, &[], &Body::Empty).unwrap();
        assert_eq!(out, Some(serde_json::json!({"id": 12})));
    }

    #[test]
    fn status_204_returns_nothing() {
        let publisher = Publisher::new(DEFAULT_BASE_URL, RecordingTransport::answering(vec![(204, "")]));
        assert_eq!(publisher.post(SCHOOL_MASK_PATH, &[], &Body::Empty).unwrap(), None);
    }

    #[test]
    fn other_status_is_rejected_with_url_code_and_text() {
        for (status, text) in [(404, "not found"), (500, "internal error")] {
            let publisher = Publisher::new(
                DEFAULT_BASE_URL,
                RecordingTransport::answering(vec![(status, text)]),
            );
            let err = publisher
                .post(SCHOOL_MASK_PATH, &[], &Body::Empty)
                .unwrap_err();
            assert!(matches!(err, MaskError::RemoteRejected { status: s, .. } if s == status));
            let msg = err.to_string();
            assert!(msg.contains(
                "http://localhost:8000/lsss/module/PelagicEchogramModule/school-mask"
            ));
            assert!(msg.contains(&status.to_string()));
            assert!(msg.contains(text));
        }
    }

    #[test]
    fn status_200_with_bad_json_is_a_transport_error() {
        let publisher = Publisher::new(DEFAULT_BASE_URL, RecordingTransport::answering(vec![(200, "<html>")]));
        let err = publisher.post("/x", &[], &Body::Empty).unwrap_err();
        assert!(matches!(err, MaskError::Transport(_)));
    }

    #[test]
    fn url_is_base_plus_path() {
        let publisher = Publisher::new("http://lsss:9000", RecordingTransport::default());
        publisher.post("/lsss/some/path", &[], &Body::Empty).unwrap();
        let requests = publisher.transport().requests.borrow();
        assert_eq!(requests[0].0, "http://lsss:9000/lsss/some/path");
    }

    #[test]
    fn empty_records_are_not_posted() {
        let publisher = Publisher::new(DEFAULT_BASE_URL, RecordingTransport::default());
        assert!(!publisher.publish_mask(&region(), &[]).unwrap());
        assert!(publisher.transport().requests.borrow().is_empty());
    }

    #[test]
    fn records_are_posted_as_json_array() {
        let publisher = Publisher::new(DEFAULT_BASE_URL, RecordingTransport::default());
        let records = vec![PingRecord {
            ping_number: 54001,
            depth_ranges: vec![DepthRange { min: 30.5, max: 34.0 }],
        }];
        assert!(publisher.publish_mask(&region(), &records).unwrap());

        let requests = publisher.transport().requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].1,
            Body::Json(serde_json::json!([
                {"pingNumber": 54001, "depthRanges": [{"min": 30.5, "max": 34.0}]}
            ]))
        );
    }
}
