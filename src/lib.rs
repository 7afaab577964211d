pub mod atmosphere;
pub mod axis;
pub mod converter;
pub mod gpoint;
pub mod model_handle;
pub mod motion_planner;
pub mod mount_config;
pub mod pointing_model;
pub mod tpoint;
