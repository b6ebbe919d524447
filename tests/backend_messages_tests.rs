// Wire format tests for the interview backend contract

use voice_interviewer::analysis::Decision;
use voice_interviewer::backend::{
    AnalyzeReply, CompleteReply, StartSessionRequest, StartSessionResponse, SynthesizeRequest,
};

#[test]
fn test_start_session_serialization() {
    let req = StartSessionRequest {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
    };

    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("\"name\":\"Ada Lovelace\""));
    assert!(json.contains("\"email\":\"ada@example.com\""));
}

#[test]
fn test_start_session_response_uses_camel_case_id() {
    let msg: StartSessionResponse = serde_json::from_str(r#"{"sessionId": "abc-123"}"#).unwrap();
    assert_eq!(msg.session_id, "abc-123");

    assert!(serde_json::from_str::<StartSessionResponse>(r#"{"session_id": "abc"}"#).is_err());
}

#[test]
fn test_analyze_reply_full() {
    let json = r#"{
        "action": "rephrase",
        "transcript": "I sold software mostly",
        "reason": "answer was off topic"
    }"#;

    let reply: AnalyzeReply = serde_json::from_str(json).unwrap();
    assert_eq!(Decision::from_wire(reply.action.as_deref()), Decision::Rephrase);
    assert_eq!(reply.transcript.as_deref(), Some("I sold software mostly"));
    assert_eq!(reply.reason.as_deref(), Some("answer was off topic"));
}

#[test]
fn test_analyze_reply_missing_fields_means_next() {
    let reply: AnalyzeReply = serde_json::from_str("{}").unwrap();
    assert!(reply.action.is_none());
    assert!(reply.transcript.is_none());
    assert_eq!(Decision::from_wire(reply.action.as_deref()), Decision::Next);
}

#[test]
fn test_analyze_reply_unknown_action_means_next() {
    let reply: AnalyzeReply = serde_json::from_str(r#"{"action": "escalate"}"#).unwrap();
    assert_eq!(Decision::from_wire(reply.action.as_deref()), Decision::Next);
}

#[test]
fn test_synthesize_request() {
    let json = serde_json::to_string(&SynthesizeRequest {
        text: "Could you elaborate?".to_string(),
    })
    .unwrap();
    assert_eq!(json, r#"{"text":"Could you elaborate?"}"#);
}

#[test]
fn test_complete_reply_tolerates_empty_body() {
    let reply: CompleteReply = serde_json::from_str("{}").unwrap();
    assert!(!reply.ok);
    assert!(reply.message.is_none());
}
