pub mod cache;
pub mod mirror;
pub mod registrations;
pub mod visitors;

pub use cache::{DeviceCache, MATCHES_KEY, PROFILE_KEY};
pub use mirror::MirrorLog;
pub use registrations::RegistrationStore;
pub use visitors::VisitorStore;
