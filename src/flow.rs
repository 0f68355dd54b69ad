//! §4.6 FlowRunner — sequential execution of a named flow's steps, with
//! recursive `auth_flow` resolution. Grounded on the teacher's
//! `dispatch.rs` step-sequencing loop, generalized from ABAP-unit-test
//! phases to arbitrary user-defined request chains.

use crate::error::MorcError;
use crate::project::Project;
use crate::sender::{Sender, SendOptions, SendOutcome};
use crate::transport::SendTransport;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{info, instrument};

/// Outcome of one `exec`: per-step send outcomes in execution order,
/// including any auth-flow steps that ran along the way.
#[derive(Debug)]
pub struct FlowOutcome {
    pub step_outcomes: Vec<(String, SendOutcome)>,
}

pub struct FlowRunner;

impl FlowRunner {
    #[instrument(skip(project, opts, transport))]
    pub async fn run(
        flow_name: &str,
        project: &mut Project,
        opts: &SendOptions,
        transport: &dyn SendTransport,
    ) -> Result<FlowOutcome, MorcError> {
        let mut visited: HashMap<String, bool> = HashMap::new();
        let mut step_outcomes = Vec::new();
        Self::run_inner(flow_name, project, opts, transport, &mut visited, &mut step_outcomes).await?;
        Ok(FlowOutcome { step_outcomes })
    }

    /// Runs `flow_name`, appending every step's outcome to `step_outcomes`.
    /// `visited` tracks, per lowercased flow name, whether that flow is
    /// currently being executed (`false`) or has already completed in this
    /// invocation (`true`): re-entering a flow still marked in-progress is a
    /// cycle; re-entering one already completed is a deliberate no-op
    /// (§4.6 — an `auth_flow` shared by several steps runs once per `exec`).
    ///
    /// Boxed by hand since a recursive `async fn` isn't directly expressible
    /// in Rust without pinning its own future.
    fn run_inner<'a>(
        flow_name: &'a str,
        project: &'a mut Project,
        opts: &'a SendOptions,
        transport: &'a dyn SendTransport,
        visited: &'a mut HashMap<String, bool>,
        step_outcomes: &'a mut Vec<(String, SendOutcome)>,
    ) -> Pin<Box<dyn Future<Output = Result<(), MorcError>> + Send + 'a>> {
        Box::pin(async move {
            let key = flow_name.to_lowercase();
            match visited.get(&key) {
                Some(false) => return Err(MorcError::AuthCycle(flow_name.to_string())),
                Some(true) => return Ok(()),
                None => {
                    visited.insert(key.clone(), false);
                }
            }

            let flow = project
                .get_flow(flow_name)
                .cloned()
                .ok_or_else(|| MorcError::not_found("flow", flow_name))?;

            info!(flow = %flow.name, steps = flow.steps.len(), "running flow");

            for step in &flow.steps {
                let template = project
                    .get_template(&step.template)
                    .cloned()
                    .ok_or_else(|| MorcError::StepUnresolved(step.template.clone()))?;

                if !template.is_sendable() {
                    return Err(MorcError::StepUnresolved(step.template.clone()));
                }

                if let Some(auth_flow) = template.auth_flow.clone() {
                    FlowRunner::run_inner(&auth_flow, project, opts, transport, visited, step_outcomes)
                        .await?;
                }

                let outcome = Sender::send(&template, project, opts, transport).await?;
                step_outcomes.push((template.name.clone(), outcome));
            }

            visited.insert(key, true);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{Flow, FlowStep, Project, RequestTemplate};
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use http::{Request, Response};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTransport {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SendTransport for CountingTransport {
        async fn send(&self, _req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::builder().status(200).body(b"{}".to_vec()).unwrap())
        }
    }

    fn sendable_template(name: &str, auth_flow: Option<&str>) -> RequestTemplate {
        let mut t = RequestTemplate::new(name);
        t.method = "GET".to_string();
        t.url = "https://example.com/".to_string();
        t.auth_flow = auth_flow.map(str::to_string);
        t
    }

    #[tokio::test]
    async fn runs_every_step_in_order() {
        let mut project = Project::new("demo");
        project.add_template(sendable_template("a", None)).unwrap();
        project.add_template(sendable_template("b", None)).unwrap();
        let mut flow = Flow::new("chain");
        flow.steps.push(FlowStep { template: "a".to_string() });
        flow.steps.push(FlowStep { template: "b".to_string() });
        project.add_flow(flow).unwrap();

        let transport = CountingTransport { calls: Arc::new(AtomicUsize::new(0)) };
        let outcome = FlowRunner::run("chain", &mut project, &SendOptions::default(), &transport)
            .await
            .unwrap();
        assert_eq!(outcome.step_outcomes.len(), 2);
    }

    #[tokio::test]
    async fn shared_auth_flow_runs_once() {
        let mut project = Project::new("demo");
        project.add_template(sendable_template("login", None)).unwrap();
        project.add_template(sendable_template("a", Some("auth"))).unwrap();
        project.add_template(sendable_template("b", Some("auth"))).unwrap();
        let mut auth = Flow::new("auth");
        auth.steps.push(FlowStep { template: "login".to_string() });
        project.add_flow(auth).unwrap();
        let mut flow = Flow::new("chain");
        flow.steps.push(FlowStep { template: "a".to_string() });
        flow.steps.push(FlowStep { template: "b".to_string() });
        project.add_flow(flow).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let transport = CountingTransport { calls: calls.clone() };
        let outcome = FlowRunner::run("chain", &mut project, &SendOptions::default(), &transport)
            .await
            .unwrap();
        // login + a + b == 3 sends, not 4 (auth ran once despite two steps).
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.step_outcomes.len(), 3);
    }

    #[tokio::test]
    async fn auth_cycle_is_rejected() {
        let mut project = Project::new("demo");
        project.add_template(sendable_template("a", Some("flow_b"))).unwrap();
        project.add_template(sendable_template("b", Some("flow_a"))).unwrap();
        let mut flow_a = Flow::new("flow_a");
        flow_a.steps.push(FlowStep { template: "a".to_string() });
        project.add_flow(flow_a).unwrap();
        let mut flow_b = Flow::new("flow_b");
        flow_b.steps.push(FlowStep { template: "b".to_string() });
        project.add_flow(flow_b).unwrap();

        let transport = CountingTransport { calls: Arc::new(AtomicUsize::new(0)) };
        let err = FlowRunner::run("flow_a", &mut project, &SendOptions::default(), &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, MorcError::AuthCycle(_)));
    }

    #[tokio::test]
    async fn unresolved_step_template_is_reported() {
        let mut project = Project::new("demo");
        let mut flow = Flow::new("chain");
        flow.steps.push(FlowStep { template: "missing".to_string() });
        project.add_flow(flow).unwrap();

        let transport = CountingTransport { calls: Arc::new(AtomicUsize::new(0)) };
        let err = FlowRunner::run("chain", &mut project, &SendOptions::default(), &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, MorcError::StepUnresolved(_)));
    }
}
