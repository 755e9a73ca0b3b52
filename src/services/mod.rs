pub mod responder;
pub mod sms_client;

// Re-export for convenience
pub use responder::AiResponder;
pub use sms_client::TwilioClient;
