use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::domain::map_scene::{MapMarker, MapScene};
use crate::error::Result;
use crate::ports::live_view::LiveView;
use crate::ports::transport::{Transport, TransportRequest, TransportResponse};

struct Route {
    fragment: String,
    status: u16,
    body: String,
}

/// Scripted transport: the first route whose fragment occurs in the request
/// URL answers; anything else gets an empty 404. Every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: Vec<Route>,
    delay: Option<Duration>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_body(mut self, fragment: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            fragment: fragment.to_string(),
            status,
            body: body.to_string(),
        });
        self
    }

    #[must_use]
    pub fn with_json(self, fragment: &str, status: u16, body: Value) -> Self {
        self.with_body(fragment, status, &body.to_string())
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let route = self
            .routes
            .iter()
            .find(|r| request.url.contains(r.fragment.as_str()));
        Ok(match route {
            Some(r) => TransportResponse {
                status: StatusCode::from_u16(r.status).unwrap(),
                body: r.body.clone(),
            },
            None => TransportResponse {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            },
        })
    }
}

#[derive(Default)]
struct Recorded {
    open: bool,
    renders: usize,
    last_scene: Option<MapScene>,
    inserted: Vec<String>,
    status: Option<String>,
}

/// `LiveView` that records what it was asked to show.
#[derive(Default)]
pub struct RecordingView {
    recorded: Mutex<Recorded>,
}

impl RecordingView {
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn render_count(&self) -> usize {
        self.recorded.lock().unwrap().renders
    }

    pub fn last_scene(&self) -> Option<MapScene> {
        self.recorded.lock().unwrap().last_scene.clone()
    }

    pub fn inserted_ids(&self) -> Vec<String> {
        self.recorded.lock().unwrap().inserted.clone()
    }

    pub fn status(&self) -> Option<String> {
        self.recorded.lock().unwrap().status.clone()
    }
}

impl LiveView for RecordingView {
    fn is_open(&self) -> bool {
        self.recorded.lock().unwrap().open
    }

    fn open(&self) {
        self.recorded.lock().unwrap().open = true;
    }

    fn close(&self) {
        self.recorded.lock().unwrap().open = false;
    }

    fn render(&self, scene: MapScene) {
        let mut r = self.recorded.lock().unwrap();
        if r.open {
            r.renders += 1;
            r.last_scene = Some(scene);
        }
    }

    fn insert_marker(&self, marker: MapMarker) -> bool {
        let mut r = self.recorded.lock().unwrap();
        if !r.open {
            return false;
        }
        r.inserted.push(marker.id);
        true
    }

    fn set_status(&self, text: &str) {
        let mut r = self.recorded.lock().unwrap();
        if r.open {
            r.status = Some(text.to_string());
        }
    }
}
