use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::map_scene::{MapMarker, MapScene, points_status};
use crate::ports::live_view::LiveView;

#[derive(Default)]
struct ViewState {
    open: bool,
    scene: MapScene,
    shown: HashSet<String>,
    status: Option<String>,
}

/// The map view hosted by the server: keeps the last rendered scene so MCP
/// clients can read it back.
#[derive(Default)]
pub struct SceneView {
    state: Mutex<ViewState>,
}

impl SceneView {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn scene(&self) -> MapScene {
        self.state().scene.clone()
    }

    pub fn status(&self) -> Option<String> {
        self.state().status.clone()
    }

    /// Rendered scene plus the status line, as shown to a user.
    pub fn snapshot(&self) -> String {
        let state = self.state();
        if !state.open {
            return "Map view is closed. Open it with olx_open_map.".into();
        }
        let mut text = String::new();
        if let Some(ref status) = state.status {
            text.push_str(status);
            text.push_str("\n\n");
        }
        text.push_str(&state.scene.to_string());
        text
    }
}

impl LiveView for SceneView {
    fn is_open(&self) -> bool {
        self.state().open
    }

    fn open(&self) {
        self.state().open = true;
    }

    fn close(&self) {
        let mut state = self.state();
        *state = ViewState::default();
    }

    fn render(&self, scene: MapScene) {
        let mut state = self.state();
        if !state.open {
            return;
        }
        state.shown = scene.markers.iter().map(|m| m.id.clone()).collect();
        state.status = Some(scene.status_line());
        state.scene = scene;
    }

    fn insert_marker(&self, marker: MapMarker) -> bool {
        let mut state = self.state();
        if !state.open || !state.shown.insert(marker.id.clone()) {
            return false;
        }
        state.scene.markers.push(marker);
        let count = state.scene.markers.len();
        state.status = Some(points_status(count));
        true
    }

    fn set_status(&self, text: &str) {
        let mut state = self.state();
        if state.open {
            state.status = Some(text.to_string());
        }
    }
}
