//! Minimal TwiML documents for the two webhook responses.

use quick_xml::escape::escape;

/// Spoken message followed by a hangup.
pub fn voice_say(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Say>{}</Say><Hangup/></Response>",
        escape(message)
    )
}

/// Empty acknowledgment; replies go out via the send API, not inline.
pub fn empty_response() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>".to_string()
}
