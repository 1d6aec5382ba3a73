pub mod gemini;
pub mod ocr;
pub mod prompt;
pub mod scanner;

pub use gemini::GeminiClient;
pub use ocr::TesseractOcr;
pub use scanner::CardScanner;
