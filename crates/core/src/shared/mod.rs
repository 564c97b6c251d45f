pub mod bounding_box;
pub mod constants;
pub mod detection;
pub mod frame;
pub mod label_map;
