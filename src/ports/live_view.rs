use crate::domain::map_scene::{MapMarker, MapScene};

/// The map view a user looks at. Every call is a silent no-op while the view is closed.
pub trait LiveView: Send + Sync {
    fn is_open(&self) -> bool;
    fn open(&self);
    fn close(&self);
    /// Replace everything shown with `scene`.
    fn render(&self, scene: MapScene);
    /// Add one marker to the current scene. Returns `false` when it was not added.
    fn insert_marker(&self, marker: MapMarker) -> bool;
    fn set_status(&self, text: &str);
}
