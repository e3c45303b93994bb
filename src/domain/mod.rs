pub mod extract;
pub mod map_scene;
pub mod offer;
pub mod payload;
pub mod presentation;
pub mod search_params;
pub mod store;
