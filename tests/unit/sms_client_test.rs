use leadline_controller::services::sms_client::{SmsError, TwilioClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_send_sms_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(body_string_contains("Body=Hello"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "sid": "SM123",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = TwilioClient::new(server.uri(), "AC123".to_string(), "token".to_string());
    let receipt = client
        .send_sms("+15551234567", "+15550001111", "Hello")
        .await
        .unwrap();

    assert_eq!(receipt.sid, "SM123");
    assert_eq!(receipt.status, "queued");
}

#[tokio::test]
async fn test_send_sms_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("authentication failed"))
        .mount(&server)
        .await;

    let client = TwilioClient::new(server.uri(), "AC123".to_string(), "bad".to_string());
    let result = client.send_sms("+15551234567", "+15550001111", "Hi").await;

    match result {
        Err(SmsError::ApiError { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("authentication failed"));
        }
        other => panic!("expected ApiError, got {:?}", other.map(|r| r.sid)),
    }
}
