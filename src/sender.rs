//! §4.5 Sender — single request send: build, transport, receive, scrape,
//! record. Grounded on the teacher's `endpoint.rs` build-request /
//! dispatch / update-cookies sequencing, generalized from SAP-specific
//! session/auth headers to the spec's overlay + cookie-jar model.

use crate::capture::VarScraper;
use crate::error::{CaptureError, MorcError};
use crate::project::{HeaderMap as TemplateHeaders, Project, RequestSnapshot, RequestTemplate, ResponseSnapshot};
use crate::substitute::{substitute, substitute_bytes, Overlay};
use crate::transport::SendTransport;
use derive_builder::Builder;
use http::{HeaderName, HeaderValue, Method, Request};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into), default)]
pub struct OutputControl {
    pub show_request: bool,
    pub show_response_headers: bool,
    pub no_body: bool,
    pub show_captures: bool,
}

#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into), default)]
pub struct SendOptions {
    /// One-time variable overlay, takes precedence over the VarStore for
    /// this send only.
    pub overlay: HashMap<String, String>,
    pub extra_headers: TemplateHeaders,
    #[builder(setter(into, strip_option))]
    pub body_override: Option<Vec<u8>>,
    pub extra_scrapers: Vec<VarScraper>,
    pub output: OutputControl,
}

/// Outcome of one send: the response plus any non-fatal scrape failures.
#[derive(Debug)]
pub struct SendOutcome {
    pub response: ResponseSnapshot,
    pub capture_failures: Vec<(String, CaptureError)>,
}

pub struct Sender;

impl Sender {
    #[instrument(skip(project, opts, transport), fields(template = %template.name))]
    pub async fn send(
        template: &RequestTemplate,
        project: &mut Project,
        opts: &SendOptions,
        transport: &dyn SendTransport,
    ) -> Result<SendOutcome, MorcError> {
        let now = chrono::Utc::now();
        let prefix = project.config.prefix_char()?;

        // 1. Overlay variables.
        let lookup = Overlay {
            base: &project.vars,
            overlay: &opts.overlay,
        };

        // 2. Substitute method, URL, headers, body.
        let method_str = substitute(&template.method, &lookup, prefix).to_uppercase();
        let url_str = substitute(&template.url, &lookup, prefix);

        let mut headers: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, values) in template.headers.iter().chain(opts.extra_headers.iter()) {
            let sub_key = substitute(key, &lookup, prefix);
            let entry = headers.entry(sub_key).or_default();
            for v in values {
                entry.push(substitute(v, &lookup, prefix));
            }
        }

        let body = match &opts.body_override {
            Some(b) => Some(b.clone()),
            None => template
                .body
                .as_ref()
                .map(|b| substitute_bytes(b, &lookup, prefix)),
        };

        // 3. Parse URL.
        let url = url::Url::parse(&url_str).map_err(|source| MorcError::BadUrl {
            url: url_str.clone(),
            source,
        })?;

        // 4. Attach cookies (user-supplied `Cookie` header overrides). Evict
        // first so an expired cookie is never sent (spec.md §4.2 "called...
        // before a send").
        project.cookies.evict_older_than(project.config.cookie_lifetime, now);
        let has_explicit_cookie = headers.keys().any(|k| k.eq_ignore_ascii_case("cookie"));
        if !has_explicit_cookie {
            if let Some(cookie_header) = project.cookies.cookie_header(&url, now) {
                headers.insert("Cookie".to_string(), vec![cookie_header]);
            }
        }

        debug!(%url, method = %method_str, "dispatching request");

        let request = build_http_request(&method_str, &url, &headers, body.as_deref())?;

        // 5. Transport.
        let response = transport
            .send(request)
            .await
            .map_err(|e| MorcError::Transport {
                url: url.to_string(),
                message: e.0,
            })?;

        let (parts, resp_body) = response.into_parts();
        let response_headers = header_map_to_template_headers(&parts.headers);

        let request_snapshot = RequestSnapshot {
            method: method_str.clone(),
            url: url.to_string(),
            headers: headers.clone(),
            body: body.clone(),
        };
        let response_snapshot = ResponseSnapshot {
            status: parts.status.as_u16(),
            headers: response_headers.clone(),
            body: Some(resp_body.clone()),
        };

        // 6. Record BEFORE scraping.
        if project.config.record_history {
            project.history.push(crate::project::HistoryEntry {
                template_name: template.name.clone(),
                request_snapshot,
                response_snapshot: response_snapshot.clone(),
                timestamp: now,
            });
        }

        // 7. Update session from Set-Cookie headers.
        if let Some(set_cookie_headers) = response_headers.get("set-cookie") {
            project.cookies.record(&url, set_cookie_headers, now);
        }

        // 8. Scrape.
        let mut capture_failures = Vec::new();
        for scraper in template.captures.values().chain(opts.extra_scrapers.iter()) {
            match scraper.extract(&resp_body) {
                Ok(value) => project.vars.set(scraper.name(), value),
                Err(e) => {
                    warn!(capture = scraper.name(), error = %e, "capture failed");
                    capture_failures.push((scraper.name().to_string(), e));
                }
            }
        }

        // 9. Emit output per OutputControl.
        emit_output(&method_str, &url, &headers, body.as_deref(), &response_snapshot, opts, &capture_failures);

        Ok(SendOutcome {
            response: response_snapshot,
            capture_failures,
        })
    }
}

fn build_http_request(
    method: &str,
    url: &url::Url,
    headers: &IndexMap<String, Vec<String>>,
    body: Option<&[u8]>,
) -> Result<Request<Vec<u8>>, MorcError> {
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| MorcError::BadInput(format!("invalid HTTP method '{method}'")))?;

    let mut builder = Request::builder().method(method).uri(url.as_str());
    for (name, values) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| MorcError::BadInput(format!("invalid header name '{name}'")))?;
        for value in values {
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| MorcError::BadInput(format!("invalid header value '{value}'")))?;
            builder = builder.header(header_name.clone(), header_value);
        }
    }

    builder
        .body(body.map(|b| b.to_vec()).unwrap_or_default())
        .map_err(|e| MorcError::BadInput(e.to_string()))
}

fn header_map_to_template_headers(headers: &http::HeaderMap) -> IndexMap<String, Vec<String>> {
    let mut out: IndexMap<String, Vec<String>> = IndexMap::new();
    for (name, value) in headers.iter() {
        out.entry(name.as_str().to_ascii_lowercase())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn emit_output(
    method: &str,
    url: &url::Url,
    headers: &IndexMap<String, Vec<String>>,
    body: Option<&[u8]>,
    response: &ResponseSnapshot,
    opts: &SendOptions,
    capture_failures: &[(String, CaptureError)],
) {
    if opts.output.show_request {
        println!("> {method} {url}");
        for (name, values) in headers {
            for v in values {
                println!("> {name}: {v}");
            }
        }
        if let Some(b) = body {
            println!("{}", String::from_utf8_lossy(b));
        }
    }

    println!("< {}", response.status);
    if opts.output.show_response_headers {
        for (name, values) in &response.headers {
            for v in values {
                println!("< {name}: {v}");
            }
        }
    }
    if !opts.output.no_body {
        if let Some(b) = &response.body {
            println!("{}", String::from_utf8_lossy(b));
        }
    }
    if opts.output.show_captures {
        for (name, err) in capture_failures {
            eprintln!("capture {name} failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture;
    use crate::project::Project;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use http::Response;
    use std::sync::Mutex;

    /// Replays a fixed sequence of responses, one per call, ignoring the
    /// request (spec.md §9 "Transport injection").
    struct StubTransport {
        responses: Mutex<Vec<(u16, Vec<(&'static str, &'static str)>, Vec<u8>)>>,
    }

    #[async_trait]
    impl SendTransport for StubTransport {
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
    async fn capture_feeds_next_request_in_a_flow() {
        let mut project = Project::new("demo");
        let transport = StubTransport {
            responses: Mutex::new(vec![(200, vec![], br#"{"token":"abc"}"#.to_vec())]),
        };

        let mut login = RequestTemplate::new("login");
        login.method = "POST".to_string();
        login.url = "https://example.com/auth".to_string();
        login
            .captures
            .insert("TOKEN".to_string(), capture::parse("token", ".token").unwrap());

        Sender::send(&login, &mut project, &SendOptions::default(), &transport)
            .await
            .unwrap();
        assert_eq!(project.vars.get("token"), "abc");

        let mut me = RequestTemplate::new("me");
        me.method = "GET".to_string();
        me.url = "https://example.com/me".to_string();
        me.headers
            .insert("Authorization".to_string(), vec!["Bearer ${TOKEN}".to_string()]);

        let built = {
            let lookup = Overlay {
                base: &project.vars,
                overlay: &HashMap::new(),
            };
            substitute("Bearer ${TOKEN}", &lookup, '$')
        };
        assert_eq!(built, "Bearer abc");

        assert_eq!(project.history.len(), 1);
    }

    #[tokio::test]
    async fn cookie_set_in_step_one_is_sent_in_step_two() {
        let mut project = Project::new("demo");
        let transport = StubTransport {
            responses: Mutex::new(vec![
                (200, vec![("set-cookie", "session=s1")], b"{}".to_vec()),
            ]),
        };

        let mut step1 = RequestTemplate::new("step1");
        step1.method = "GET".to_string();
        step1.url = "https://example.com/login".to_string();
        Sender::send(&step1, &mut project, &SendOptions::default(), &transport)
            .await
            .unwrap();

        let dest = url::Url::parse("https://example.com/me").unwrap();
        let now = chrono::Utc::now();
        assert_eq!(
            project.cookies.cookie_header(&dest, now),
            Some("session=s1".to_string())
        );
    }

    #[tokio::test]
    async fn capture_failure_does_not_abort_the_send() {
        let mut project = Project::new("demo");
        let transport = StubTransport {
            responses: Mutex::new(vec![(200, vec![], b"not json".to_vec())]),
        };

        let mut template = RequestTemplate::new("req1");
        template.method = "GET".to_string();
        template.url = "https://example.com/".to_string();
        template
            .captures
            .insert("X".to_string(), capture::parse("x", ".x").unwrap());

        let outcome = Sender::send(&template, &mut project, &SendOptions::default(), &transport)
            .await
            .unwrap();
        assert_eq!(outcome.capture_failures.len(), 1);
    }
}
