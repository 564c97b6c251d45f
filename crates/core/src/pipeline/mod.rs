pub mod pipeline_config;
pub mod pipeline_controller;
pub mod pipeline_error;
pub mod pipeline_logger;
pub mod pipeline_state;
pub mod stop_signal;
