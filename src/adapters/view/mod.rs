pub mod scene_view;
