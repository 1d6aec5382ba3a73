pub mod data_url;
pub mod error;
pub mod traits;
pub mod types;

pub use data_url::DecodedImage;
pub use error::LensError;
pub use traits::{FaceIndex, OcrEngine, TextModel};
pub use types::{FaceMatch, MatchReport, NewRegistrant, Registrant, VisitorFields, VisitorRecord};
