//! Flow-execution scenarios S5-S6 from spec.md §8, driven against
//! `FlowRunner` with a stub transport (no live network).

use async_trait::async_trait;
use http::{Request, Response};
use morc::capture;
use morc::flow::FlowRunner;
use morc::project::{Flow, FlowStep, Project, RequestTemplate};
use morc::sender::SendOptions;
use morc::transport::{SendTransport, TransportError};
use std::sync::Mutex;

/// Replays one canned response per call, in order, ignoring the request body.
struct ScriptedTransport {
    responses: Mutex<Vec<(u16, Vec<(&'static str, &'static str)>, Vec<u8>)>>,
}

#[async_trait]
impl SendTransport for ScriptedTransport {
    async fn send(&self, _req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
        let (status, headers, body) = self.responses.lock().unwrap().remove(0);
        let mut builder = Response::builder().status(status);
        for (k, v) in headers {
            builder = builder.header(k, v);
        }
        builder.body(body).map_err(|e| TransportError(e.to_string()))
    }
}

#[tokio::test]
async fn s5_flow_capture_is_reused_by_a_later_step() {
    let mut project = Project::new("demo");

    let mut login = RequestTemplate::new("login");
    login.method = "POST".to_string();
    login.url = "https://example.com/auth".to_string();
    login.body = Some(br#"{"u":"x"}"#.to_vec());
    login
        .captures
        .insert("TOKEN".to_string(), capture::parse("token", ".token").unwrap());
    project.add_template(login).unwrap();

    let mut me = RequestTemplate::new("me");
    me.method = "GET".to_string();
    me.url = "https://example.com/me".to_string();
    me.headers
        .insert("Authorization".to_string(), vec!["Bearer ${TOKEN}".to_string()]);
    project.add_template(me).unwrap();

    let mut flow = Flow::new("auth_me");
    flow.steps.push(FlowStep { template: "login".to_string() });
    flow.steps.push(FlowStep { template: "me".to_string() });
    project.add_flow(flow).unwrap();

    let transport = ScriptedTransport {
        responses: Mutex::new(vec![
            (200, vec![], br#"{"token":"abc"}"#.to_vec()),
            (200, vec![], b"{}".to_vec()),
        ]),
    };

    let outcome = FlowRunner::run("auth_me", &mut project, &SendOptions::default(), &transport)
        .await
        .unwrap();

    assert_eq!(outcome.step_outcomes.len(), 2);
    assert_eq!(project.vars.get("token"), "abc");
    assert_eq!(project.history.len(), 2);
    assert_eq!(project.history[0].template_name, "login");
    assert_eq!(project.history[1].template_name, "me");
    assert_eq!(
        project.history[1].request_snapshot.headers.get("Authorization"),
        Some(&vec!["Bearer abc".to_string()])
    );
}

#[tokio::test]
async fn s6_cookie_set_in_step_one_is_sent_in_step_two() {
    let mut project = Project::new("demo");

    let mut step1 = RequestTemplate::new("step1");
    step1.method = "GET".to_string();
    step1.url = "https://example.com/login".to_string();
    project.add_template(step1).unwrap();

    let mut step2 = RequestTemplate::new("step2");
    step2.method = "GET".to_string();
    step2.url = "https://example.com/me".to_string();
    project.add_template(step2).unwrap();

    let mut flow = Flow::new("chain");
    flow.steps.push(FlowStep { template: "step1".to_string() });
    flow.steps.push(FlowStep { template: "step2".to_string() });
    project.add_flow(flow).unwrap();

    let transport = ScriptedTransport {
        responses: Mutex::new(vec![
            (200, vec![("set-cookie", "session=s1")], b"{}".to_vec()),
            (200, vec![], b"{}".to_vec()),
        ]),
    };

    FlowRunner::run("chain", &mut project, &SendOptions::default(), &transport)
        .await
        .unwrap();

    assert_eq!(
        project.history[1].request_snapshot.headers.get("Cookie"),
        Some(&vec!["session=s1".to_string()])
    );
}

#[tokio::test]
async fn sender_evicts_expired_cookies_before_attaching_them() {
    // Unlike the direct SessionJar unit below, this drives the real send
    // path so a stale cookie is dropped by `Sender::send` itself, not just
    // by calling `evict_older_than` by hand.
    let mut project = Project::new("demo");
    project.config.cookie_lifetime = std::time::Duration::from_millis(1);

    let url = url::Url::parse("https://example.com/").unwrap();
    let stale = chrono::Utc::now() - chrono::Duration::seconds(10);
    project.cookies.record(&url, &["session=stale".to_string()], stale);

    let mut step = RequestTemplate::new("step");
    step.method = "GET".to_string();
    step.url = "https://example.com/me".to_string();
    project.add_template(step).unwrap();

    let transport = ScriptedTransport {
        responses: Mutex::new(vec![(200, vec![], b"{}".to_vec())]),
    };

    let template = project.get_template("step").unwrap().clone();
    morc::sender::Sender::send(&template, &mut project, &SendOptions::default(), &transport)
        .await
        .unwrap();

    assert_eq!(project.history.len(), 1);
    assert!(project.history[0].request_snapshot.headers.get("Cookie").is_none());
    assert_eq!(project.cookies.total_cookie_sets(), 0);
}

#[tokio::test]
async fn s6_cookie_is_dropped_once_its_lifetime_has_elapsed() {
    let mut project = Project::new("demo");
    let url = url::Url::parse("https://example.com/").unwrap();
    let received_at = chrono::Utc::now() - chrono::Duration::hours(1);
    project.cookies.record(&url, &["session=s1".to_string()], received_at);

    // A zero-duration lifetime is coerced to 24h; a one-hour-old cookie survives.
    project
        .cookies
        .evict_older_than(std::time::Duration::from_secs(0), chrono::Utc::now());
    assert!(project.cookies.cookie_header(&url, chrono::Utc::now()).is_some());

    // A genuinely short lifetime evicts it.
    project
        .cookies
        .evict_older_than(std::time::Duration::from_nanos(1), chrono::Utc::now());
    assert!(project.cookies.cookie_header(&url, chrono::Utc::now()).is_none());
}
