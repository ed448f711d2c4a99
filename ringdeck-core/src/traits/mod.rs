pub mod capture_device;
pub mod playback_device;
pub mod transport_delegate;
