pub mod detection_model;
