pub mod media_resource;
pub mod simulated;
pub mod vlc_http;
