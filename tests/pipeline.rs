//! End-to-end tests of the capture -> gate -> advice -> handler chain,
//! driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use checkpoint::config::model::Config;
use checkpoint::events::{MemorySink, PipelineEvent};
use checkpoint::pipeline::Pipeline;
use checkpoint::registry::{HandlerId, MarkerLevel};

const REGISTER: HandlerId = HandlerId::new("user", "register");

fn config() -> Config {
    serde_json::from_str(
        r#"{
            "advice": {"group": "user"},
            "groups": [
                {"id": "user", "operations": [
                    {"id": "register", "markers": ["open-access"]},
                    {"id": "remove"}
                ]},
                {"id": "open", "markers": ["open-access"], "operations": [
                    {"id": "echo"}, {"id": "greet"}
                ]}
            ]
        }"#,
    )
    .unwrap()
}

fn app(config: &Config) -> (Router, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let router = Pipeline::from_config(config, sink.clone()).router();
    (router, sink)
}

fn register_request(phone: &str) -> Request<Body> {
    Request::post("/api/user")
        .header("content-type", "application/json")
        .body(Body::from(format!(
            r#"{{"name":"kim","phoneNumber":"{phone}","email":"kim@example.com"}}"#
        )))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn admitted_advised_request_emits_events_in_order() {
    let (router, sink) = app(&config());
    let (status, body) = send(router, register_request("010-1234-5678")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        sink.kinds(),
        vec![
            "gate-admit",
            "before",
            "timing",
            "after-returning",
            "after",
            "request-body",
            "response-body",
        ]
    );

    let events = sink.events();
    assert_eq!(
        events[0],
        PipelineEvent::GateAdmitted {
            handler: REGISTER,
            level: MarkerLevel::Method,
        }
    );
    assert_eq!(
        events[5],
        PipelineEvent::RequestBody {
            method: "POST".into(),
            path: "/api/user".into(),
            body: r#"{"name":"kim","phoneNumber":"010-1234-5678","email":"kim@example.com"}"#
                .into(),
        }
    );
    assert_eq!(
        events[6],
        PipelineEvent::ResponseBody {
            status: 201,
            body: body.clone(),
        }
    );
}

#[tokio::test]
async fn handler_receives_normalized_phone_number() {
    let (router, _sink) = app(&config());
    let (_, body) = send(router, register_request("010 1234.5678")).await;

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["phoneNumber"], "01012345678");
    assert_eq!(json["name"], "kim");
}

#[tokio::test]
async fn closed_handler_is_rejected_before_advice_runs() {
    let (router, sink) = app(&config());
    let request = Request::delete("/api/user/7").body(Body::empty()).unwrap();
    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    assert_eq!(sink.kinds(), vec!["gate-reject", "request-body", "response-body"]);
    assert_eq!(
        sink.events()[0],
        PipelineEvent::GateRejected {
            handler: HandlerId::new("user", "remove"),
            path: "/api/user/7".into(),
        }
    );
}

#[tokio::test]
async fn reject_status_is_configurable() {
    let mut cfg = config();
    cfg.gate.reject_status = 404;
    let (router, _sink) = app(&cfg);
    let request = Request::delete("/api/user/7").body(Body::empty()).unwrap();
    let (status, _) = send(router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn handler_error_is_reported_and_propagated() {
    let (router, sink) = app(&config());
    let request = Request::post("/api/user")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"name":"","phoneNumber":"1"}"#))
        .unwrap();
    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("name must not be empty"));
    assert_eq!(
        sink.kinds(),
        vec![
            "gate-admit",
            "before",
            "timing",
            "after-throwing",
            "after",
            "request-body",
            "response-body",
        ]
    );
    assert!(sink.events().contains(&PipelineEvent::AdviceThrew {
        handler: REGISTER,
        error: "name must not be empty".into(),
    }));
}

#[tokio::test]
async fn handlers_outside_the_advice_group_are_not_advised() {
    let (router, sink) = app(&config());
    let request = Request::get("/open-api/greet/kim").body(Body::empty()).unwrap();
    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "hello, kim");
    assert_eq!(sink.kinds(), vec!["gate-admit", "request-body", "response-body"]);
    assert_eq!(
        sink.events()[0],
        PipelineEvent::GateAdmitted {
            handler: HandlerId::new("open", "greet"),
            level: MarkerLevel::Group,
        }
    );
}

#[tokio::test]
async fn echo_body_is_captured_on_both_sides() {
    let (router, sink) = app(&config());
    let request = Request::post("/open-api/echo")
        .body(Body::from("ping-1 2.3"))
        .unwrap();
    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ping-1 2.3");
    let events = sink.events();
    assert!(matches!(&events[1], PipelineEvent::RequestBody { body, .. } if body == "ping-1 2.3"));
    assert!(matches!(&events[2], PipelineEvent::ResponseBody { body, status: 200 } if body == "ping-1 2.3"));
}

#[tokio::test]
async fn capture_does_not_change_what_the_client_sees() {
    let mut without = config();
    without.capture.enabled = false;

    let (with_router, with_sink) = app(&config());
    let (without_router, without_sink) = app(&without);

    let captured = send(with_router, register_request("010-1234-5678")).await;
    let plain = send(without_router, register_request("010-1234-5678")).await;

    assert_eq!(captured, plain);
    assert!(with_sink.kinds().contains(&"response-body"));
    assert!(!without_sink.kinds().contains(&"request-body"));
}

#[tokio::test]
async fn disabled_gate_admits_everything_silently() {
    let mut cfg = config();
    cfg.gate.enabled = false;
    let (router, sink) = app(&cfg);
    let request = Request::delete("/api/user/7").body(Body::empty()).unwrap();
    let (status, _) = send(router, request).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!sink.kinds().iter().any(|k| k.starts_with("gate")));
    assert!(sink.kinds().contains(&"after-returning"));
}

#[tokio::test]
async fn without_advice_separators_reach_the_handler() {
    let mut cfg = config();
    cfg.advice.group = None;
    let (router, sink) = app(&cfg);
    let (status, body) = send(router, register_request("010-1234-5678")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("010-1234-5678"));
    assert_eq!(sink.kinds(), vec!["gate-admit", "request-body", "response-body"]);
}
