//! End-to-end pipeline tests against the mock API.
//!
//! # Design
//! Every test drives a real `Client` through `RouterTransport`, so URL
//! construction, parameter encoding, multipart bodies and signing are checked
//! by the mock server's own extractors rather than by inspecting requests.

mod common;

use std::io::Write;

use chirp_core::{Attachment, ClientError, Credential, Params, Payload, RequestSpec};
use common::mock_client;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn structured(payload: Payload) -> Value {
    payload.into_structured().expect("expected a structured payload")
}

#[test]
fn search_uses_search_subdomain() {
    let client = mock_client(Credential::None);
    client
        .post("statuses/update", Params::new().with("status", "hello from rust"))
        .unwrap();
    client
        .post("statuses/update", Params::new().with("status", "unrelated"))
        .unwrap();

    let value = structured(
        client
            .execute(RequestSpec::get("search").param("q", "hello").subdomain("search"))
            .unwrap(),
    );
    let results = value["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["text"], "hello from rust");
}

#[test]
fn search_without_override_hits_api_host() {
    let client = mock_client(Credential::None);
    let err = client
        .execute(RequestSpec::get("search").param("q", "hello"))
        .unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Search is served from the search host.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn null_params_are_not_sent() {
    let client = mock_client(Credential::None);
    let value = structured(
        client
            .execute(
                RequestSpec::get("search")
                    .param("q", "x")
                    .param("lang", None::<String>)
                    .param("rpp", 10)
                    .subdomain("search"),
            )
            .unwrap(),
    );
    assert_eq!(value["params"], json!({ "q": "x", "rpp": "10" }));
}

#[test]
fn api_error_message_comes_from_error_field() {
    let client = mock_client(Credential::None);
    let err = client
        .execute(RequestSpec::get("search").param("q", "").subdomain("search"))
        .unwrap_err();
    assert_eq!(err.status(), 403);
    assert!(matches!(&err, ClientError::Api { message, .. } if message == "You must enter a query."));
}

#[test]
fn non_json_error_body_is_the_message() {
    let client = mock_client(Credential::None);
    let err = client.get("nothing/here", Params::new()).unwrap_err();
    assert!(matches!(
        &err,
        ClientError::Api { status: 404, message } if message == "Sorry, that page does not exist"
    ));
}

#[test]
fn update_with_media_from_path() {
    let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    file.write_all(b"\x89PNG\r\n\x1a\n").unwrap();
    let filename = file.path().file_name().unwrap().to_string_lossy().into_owned();

    let client = mock_client(Credential::None);
    let value = structured(
        client
            .execute(
                RequestSpec::post("statuses/update_with_media")
                    .param("status", "look at this")
                    .param("lat", "37.78")
                    .param("place_id", None::<String>)
                    .attachment(Attachment::from_path("media[]", file.path()))
                    .subdomain("upload"),
            )
            .unwrap(),
    );

    assert_eq!(value["text"], "look at this");
    assert_eq!(value["media"][0]["field"], "media[]");
    assert_eq!(value["media"][0]["filename"], Value::String(filename));
    assert_eq!(value["media"][0]["size"], 8);
    assert_eq!(value["extra"], json!({ "lat": "37.78" }));
}

#[test]
fn update_with_media_from_bytes_forces_post() {
    let client = mock_client(Credential::None);
    let value = structured(
        client
            .execute(
                RequestSpec::get("statuses/update_with_media")
                    .param("status", "bytes")
                    .attachment(Attachment::from_bytes("media[]", "cat.gif", b"GIF89a".to_vec()))
                    .subdomain("upload"),
            )
            .unwrap(),
    );
    assert_eq!(value["media"][0]["filename"], "cat.gif");
    assert_eq!(value["media"][0]["size"], 6);
}

#[test]
fn line_breaks_in_part_names_stay_inside_the_part() {
    let client = mock_client(Credential::None);
    let value = structured(
        client
            .execute(
                RequestSpec::post("statuses/update_with_media")
                    .param("status", "crlf")
                    .param("x\"\r\nContent-Type: text/evil\r\n\r\ninjected", "v")
                    .attachment(Attachment::from_bytes("media[]", "evil\r\n.png", vec![7, 7]))
                    .subdomain("upload"),
            )
            .unwrap(),
    );

    assert_eq!(value["text"], "crlf");
    let extra = value["extra"].as_object().unwrap();
    assert_eq!(extra.len(), 1, "unexpected fields: {extra:?}");
    let (key, field) = extra.iter().next().unwrap();
    assert!(key.starts_with('x'));
    assert!(!key.contains(['\r', '\n']));
    assert_eq!(field, "v");

    let filename = value["media"][0]["filename"].as_str().unwrap();
    assert!(filename.starts_with("evil"));
    assert!(!filename.contains(['\r', '\n']));
    assert_eq!(value["media"][0]["size"], 2);
}

#[test]
fn update_with_media_needs_upload_subdomain() {
    let client = mock_client(Credential::None);
    let err = client
        .execute(
            RequestSpec::post("statuses/update_with_media")
                .param("status", "x")
                .attachment(Attachment::from_bytes("media[]", "a.png", vec![1])),
        )
        .unwrap_err();
    assert_eq!(err.status(), 404);
}

#[test]
fn unauthenticated_request_is_rejected() {
    let client = mock_client(Credential::None);
    let err = client.get("account/verify_credentials", Params::new()).unwrap_err();
    assert!(matches!(
        &err,
        ClientError::Api { status: 401, message } if message == "Could not authenticate you."
    ));
}

#[test]
fn basic_credential_is_attached() {
    let client = mock_client(Credential::basic("jack", "hunter2"));
    let value = structured(client.get("account/verify_credentials", Params::new()).unwrap());
    assert_eq!(value, json!({ "screen_name": "jack", "auth": "basic" }));
}

#[test]
fn oauth_credential_is_attached() {
    let client = mock_client(Credential::oauth1("ck", "cs", "tk", "ts"));
    let value = structured(client.get("account/verify_credentials", Params::new()).unwrap());
    assert_eq!(value["auth"], "oauth");
}

#[test]
fn empty_body_passes_through() {
    let client = mock_client(Credential::None);
    let payload = client.post("account/end_session", Params::new()).unwrap();
    assert_eq!(payload, Payload::Raw(Vec::new()));
}

#[test]
fn status_lifecycle() {
    let client = mock_client(Credential::None);

    // create
    let created = structured(
        client
            .post("statuses/update", Params::new().with("status", "short-lived"))
            .unwrap(),
    );
    let id = created["id"].as_i64().unwrap();

    // show
    let shown = structured(client.get(&format!("statuses/show/{id}"), Params::new()).unwrap());
    assert_eq!(shown["text"], "short-lived");

    // timeline
    let timeline = structured(
        client
            .get("statuses/home_timeline", Params::new().with("count", 5))
            .unwrap(),
    );
    assert_eq!(timeline.as_array().unwrap().len(), 1);

    // destroy
    let destroyed = structured(
        client
            .post(&format!("statuses/destroy/{id}"), Params::new())
            .unwrap(),
    );
    assert_eq!(destroyed["id"], id);

    // show after destroy
    let err = client
        .get(&format!("statuses/show/{id}"), Params::new())
        .unwrap_err();
    assert!(matches!(
        &err,
        ClientError::Api { status: 404, message } if message == "No status found with that ID."
    ));
}
