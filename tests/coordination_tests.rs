// Integration tests for end-to-end turn coordination with scripted agents

#[cfg(test)]
mod coordination_tests {
    use async_trait::async_trait;
    use ideaforge_lib::config::{CoordinatorConfig, RoutingConfig};
    use ideaforge_lib::coordinator::{
        AgentInvoker, Coordinator, InvocationReply, InvocationRequest, DEADLINE_EXCEEDED,
    };
    use ideaforge_lib::models::{
        AgentDescriptor, CoordinationMode, InteractionKind, QueryContext, TurnOutcome, TurnReport,
        COORDINATOR_ID,
    };
    use ideaforge_lib::routing::{CapabilityRegistry, Router};
    use ideaforge_lib::storage::{JsonlStore, RecordStore, TurnRecord};
    use ideaforge_lib::AgentInvocationError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread::ThreadId;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone)]
    enum Behavior {
        Ok,
        Fail(&'static str),
        Delay(u64),
    }

    /// Answers "<agent> findings (<kind>)" and records every request it sees
    #[derive(Default)]
    struct ScriptedInvoker {
        behaviors: HashMap<String, Behavior>,
        fail_delegations: bool,
        requests: Mutex<Vec<InvocationRequest>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    /// Counts one invocation as in flight until dropped
    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl ScriptedInvoker {
        fn with(mut self, agent_id: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(agent_id.to_string(), behavior);
            self
        }

        fn failing_delegations(mut self) -> Self {
            self.fail_delegations = true;
            self
        }

        fn requests(&self) -> Vec<InvocationRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// Same behavior for every listed agent
        fn with_all(self, agent_ids: &[&str], behavior: Behavior) -> Self {
            agent_ids
                .iter()
                .fold(self, |invoker, id| invoker.with(id, behavior.clone()))
        }

        /// Most invocations that were running at the same time
        fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }

        fn enter(&self) -> InFlight<'_> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            InFlight(&self.in_flight)
        }

        fn prompt_for(&self, agent_id: &str) -> String {
            self.requests()
                .into_iter()
                .find(|r| r.agent_id == agent_id)
                .map(|r| r.prompt)
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl AgentInvoker for ScriptedInvoker {
        async fn invoke(
            &self,
            request: InvocationRequest,
        ) -> Result<InvocationReply, AgentInvocationError> {
            self.requests.lock().unwrap().push(request.clone());
            let _running = self.enter();

            if self.fail_delegations && request.kind == InteractionKind::Delegation {
                return Err(AgentInvocationError::failed(&request.agent_id, "merge crashed"));
            }

            match self.behaviors.get(&request.agent_id).cloned().unwrap_or(Behavior::Ok) {
                Behavior::Ok => {}
                Behavior::Fail(message) => {
                    return Err(AgentInvocationError::failed(&request.agent_id, message))
                }
                Behavior::Delay(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            }

            let content = match request.round {
                Some(round) => format!("{} position round {}", request.agent_id, round),
                None => format!("{} findings ({})", request.agent_id, request.kind),
            };
            Ok(InvocationReply::text(content).with_confidence(80))
        }
    }

    /// Agents that all match "pricing" equally, in declaration order
    fn router(agent_ids: &[&str]) -> Router {
        let agents = agent_ids
            .iter()
            .map(|id| {
                let mut name = id.to_string();
                name[..1].make_ascii_uppercase();
                AgentDescriptor::new(*id, name).with_capabilities(["pricing"])
            })
            .collect();
        let routing = RoutingConfig {
            phase_agents: Default::default(),
            phase_exclusions: Default::default(),
            affinity_gated_agents: Vec::new(),
            fallback_agent: None,
            retrieval_agent: None,
            ..RoutingConfig::default()
        };
        Router::new(Arc::new(CapabilityRegistry::new(agents).unwrap()), routing)
    }

    fn config() -> CoordinatorConfig {
        CoordinatorConfig {
            agent_timeout_secs: 5,
            turn_timeout_secs: 10,
            ..CoordinatorConfig::default()
        }
    }

    fn coordinator(
        agent_ids: &[&str],
        config: CoordinatorConfig,
        invoker: Arc<ScriptedInvoker>,
    ) -> Coordinator {
        Coordinator::new(router(agent_ids), config, invoker)
    }

    fn answered(outcome: TurnOutcome) -> TurnReport {
        match outcome {
            TurnOutcome::Answered(report) => report,
            TurnOutcome::Failed(failure) => panic!("turn failed: {}", failure.reason),
        }
    }

    fn query() -> QueryContext {
        QueryContext::new("What pricing should we launch with?")
    }

    #[tokio::test]
    async fn test_sequential_passes_previous_findings() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let coordinator = coordinator(&["alpha", "beta", "gamma"], config(), invoker.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Sequential))
                .await
                .unwrap(),
        );

        assert_eq!(report.decision.primary, "alpha");
        assert_eq!(report.decision.supporting, vec!["beta", "gamma"]);
        assert_eq!(report.results.len(), 3);
        assert_eq!(
            report.response.headings(),
            vec!["Alpha Insights", "Beta Insights", "Gamma Insights"]
        );

        let order: Vec<String> = invoker.requests().into_iter().map(|r| r.agent_id).collect();
        assert_eq!(order, vec!["alpha", "beta", "gamma"]);

        let beta_prompt = invoker.prompt_for("beta");
        assert!(beta_prompt.contains("## Previous Findings"));
        assert!(beta_prompt.contains("alpha findings"));
        let gamma_prompt = invoker.prompt_for("gamma");
        assert!(gamma_prompt.contains("alpha findings"));
        assert!(gamma_prompt.contains("beta findings"));
        assert!(!report.response.partial);
    }

    #[tokio::test]
    async fn test_parallel_timeout_leaves_gap() {
        let invoker = Arc::new(ScriptedInvoker::default().with("gamma", Behavior::Delay(3000)));
        let config = CoordinatorConfig {
            agent_timeout_secs: 1,
            turn_timeout_secs: 10,
            ..CoordinatorConfig::default()
        };
        let coordinator = coordinator(&["alpha", "beta", "gamma"], config, invoker);

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Parallel))
                .await
                .unwrap(),
        );

        let response = &report.response;
        assert_eq!(response.headings(), vec!["Alpha Insights", "Beta Insights"]);
        assert!(!response.has_heading("Gamma Insights"));
        assert!(response.partial);
        assert_eq!(response.gaps.len(), 1);
        assert_eq!(response.gaps[0].agent_id, "gamma");
        assert!(response.gaps[0].reason.contains("timed out"));
        assert!(response.summary.contains("Not included: Gamma."));
    }

    #[tokio::test]
    async fn test_debate_with_two_agents_makes_five_calls() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let coordinator = coordinator(&["alpha", "beta"], config(), invoker.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Debate))
                .await
                .unwrap(),
        );

        let requests = invoker.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests.iter().filter(|r| r.round == Some(1)).count(), 2);
        assert_eq!(requests.iter().filter(|r| r.round == Some(2)).count(), 2);
        let synthesis: Vec<_> = requests
            .iter()
            .filter(|r| r.kind == InteractionKind::Delegation)
            .collect();
        assert_eq!(synthesis.len(), 1);
        assert_eq!(synthesis[0].agent_id, "alpha");

        // Rebuttal prompts carry the other side's opening position
        let alpha_rebuttal = requests
            .iter()
            .find(|r| r.agent_id == "alpha" && r.round == Some(2))
            .unwrap();
        assert!(alpha_rebuttal.prompt.contains("beta position round 1"));

        let response = &report.response;
        assert!(!response.degraded);
        assert_eq!(
            response.narrative.as_deref(),
            Some("alpha findings (delegation)")
        );
        assert_eq!(
            response.section_for("beta").unwrap().content,
            "beta position round 2"
        );
    }

    #[tokio::test]
    async fn test_debate_synthesis_failure_is_degraded() {
        let invoker = Arc::new(ScriptedInvoker::default().failing_delegations());
        let coordinator = coordinator(&["alpha", "beta"], config(), invoker);

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Debate))
                .await
                .unwrap(),
        );

        let response = &report.response;
        assert!(response.degraded);
        assert!(response.partial);
        assert!(response.narrative.is_none());
        assert_eq!(response.headings(), vec!["Alpha Insights", "Beta Insights"]);
        assert_eq!(
            response.section_for("alpha").unwrap().content,
            "alpha position round 2"
        );
        assert!(response.summary.contains("merge step did not complete"));
    }

    #[tokio::test]
    async fn test_debate_with_single_position_skips_rebuttal() {
        let invoker = Arc::new(ScriptedInvoker::default().with("beta", Behavior::Fail("down")));
        let coordinator = coordinator(&["alpha", "beta"], config(), invoker.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Debate))
                .await
                .unwrap(),
        );

        assert_eq!(invoker.requests().len(), 2);
        assert_eq!(report.response.headings(), vec!["Alpha Insights"]);
        assert_eq!(report.response.gaps[0].agent_id, "beta");
    }

    #[tokio::test]
    async fn test_collaborative_consults_through_coordinator() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let coordinator = coordinator(&["alpha", "beta", "gamma"], config(), invoker.clone());

        let report = answered(coordinator.handle(query(), None).await.unwrap());
        assert_eq!(report.decision.mode, CoordinationMode::Collaborative);

        let kinds: Vec<(String, InteractionKind)> = invoker
            .requests()
            .into_iter()
            .map(|r| (r.agent_id, r.kind))
            .collect();
        assert_eq!(kinds[0], ("alpha".to_string(), InteractionKind::Request));
        assert!(kinds.contains(&("beta".to_string(), InteractionKind::Consultation)));
        assert!(kinds.contains(&("gamma".to_string(), InteractionKind::Consultation)));
        assert_eq!(kinds[3], ("alpha".to_string(), InteractionKind::Delegation));

        // Consultation prompts include the primary's draft
        assert!(invoker.prompt_for("beta").contains("alpha findings (request)"));

        // Every edge runs between the coordinator and one agent
        for interaction in &report.interactions {
            assert!(
                interaction.source == COORDINATOR_ID || interaction.target == COORDINATOR_ID,
                "direct agent-to-agent edge: {} -> {}",
                interaction.source,
                interaction.target
            );
        }

        let response = &report.response;
        assert_eq!(
            response.section_for("alpha").unwrap().content,
            "alpha findings (delegation)"
        );
        assert!(response
            .section_for("beta")
            .unwrap()
            .content
            .contains("Consulted by the Alpha specialist"));
    }

    #[tokio::test]
    async fn test_collaborative_without_draft_surfaces_consultations() {
        let invoker = Arc::new(ScriptedInvoker::default().with("alpha", Behavior::Fail("no draft")));
        let coordinator = coordinator(&["alpha", "beta", "gamma"], config(), invoker.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Collaborative))
                .await
                .unwrap(),
        );

        assert_eq!(invoker.requests().len(), 3);
        let response = &report.response;
        assert_eq!(response.headings(), vec!["Beta Insights", "Gamma Insights"]);
        assert_eq!(
            response.section_for("beta").unwrap().content,
            "beta findings (consultation)"
        );
        assert_eq!(response.gaps[0].agent_id, "alpha");
        assert!(response.gaps[0].reason.contains("no draft"));
    }

    #[tokio::test]
    async fn test_all_agents_failing_is_failed_turn() {
        let invoker = Arc::new(
            ScriptedInvoker::default()
                .with("alpha", Behavior::Fail("boom"))
                .with("beta", Behavior::Fail("boom"))
                .with("gamma", Behavior::Fail("boom")),
        );
        let coordinator = coordinator(&["alpha", "beta", "gamma"], config(), invoker);

        let outcome = coordinator
            .handle(query(), Some(CoordinationMode::Parallel))
            .await
            .unwrap();

        match outcome {
            TurnOutcome::Failed(failure) => {
                assert_eq!(failure.gaps.len(), 3);
                assert!(failure.gaps.iter().all(|g| g.reason.contains("boom")));
                assert_eq!(failure.interactions.len(), 6);
            }
            TurnOutcome::Answered(_) => panic!("expected a failed turn"),
        }
    }

    #[tokio::test]
    async fn test_turn_deadline_expires_open_calls() {
        let invoker = Arc::new(ScriptedInvoker::default().with("gamma", Behavior::Delay(5000)));
        let config = CoordinatorConfig {
            agent_timeout_secs: 30,
            turn_timeout_secs: 1,
            ..CoordinatorConfig::default()
        };
        let coordinator = coordinator(&["alpha", "beta", "gamma"], config, invoker);

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Parallel))
                .await
                .unwrap(),
        );

        let response = &report.response;
        assert_eq!(response.headings(), vec!["Alpha Insights", "Beta Insights"]);
        assert_eq!(response.gaps.len(), 1);
        assert_eq!(response.gaps[0].reason, DEADLINE_EXCEEDED);

        let expired = report
            .interactions
            .iter()
            .find(|i| i.agent_id == "gamma" && i.error.is_some())
            .unwrap();
        assert_eq!(expired.source, COORDINATOR_ID);
        assert_eq!(expired.target, "gamma");
        assert_eq!(expired.error.as_deref(), Some(DEADLINE_EXCEEDED));
    }

    #[tokio::test]
    async fn test_interaction_edges_and_sequence() {
        let invoker = Arc::new(ScriptedInvoker::default().with("beta", Behavior::Fail("crashed")));
        let coordinator = coordinator(&["alpha", "beta", "gamma"], config(), invoker);

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Parallel))
                .await
                .unwrap(),
        );

        let interactions = &report.interactions;
        assert_eq!(interactions.len(), 6);
        assert!(interactions
            .windows(2)
            .all(|w| w[0].sequence < w[1].sequence));

        // Requests are recorded before any call completes, in participant order
        let requests: Vec<&str> = interactions[..3]
            .iter()
            .map(|i| {
                assert_eq!(i.kind, InteractionKind::Request);
                assert_eq!(i.source, COORDINATOR_ID);
                i.target.as_str()
            })
            .collect();
        assert_eq!(requests, vec!["alpha", "beta", "gamma"]);

        for response in &interactions[3..] {
            assert_eq!(response.kind, InteractionKind::Response);
            if response.agent_id == "beta" {
                assert_eq!(response.source, COORDINATOR_ID);
                assert_eq!(response.target, "beta");
                assert!(response.error.as_deref().unwrap().contains("crashed"));
            } else {
                assert_eq!(response.source, response.agent_id);
                assert_eq!(response.target, COORDINATOR_ID);
                assert!(response.error.is_none());
            }
        }

        assert_eq!(report.response.headings(), vec!["Alpha Insights", "Gamma Insights"]);
    }

    #[tokio::test]
    async fn test_same_input_same_headings() {
        let mut seen = Vec::new();
        for _ in 0..3 {
            let invoker = Arc::new(ScriptedInvoker::default().with("alpha", Behavior::Delay(50)));
            let coordinator = coordinator(&["alpha", "beta", "gamma"], config(), invoker);
            let report = answered(
                coordinator
                    .handle(query(), Some(CoordinationMode::Parallel))
                    .await
                    .unwrap(),
            );
            let headings: Vec<String> = report
                .response
                .headings()
                .iter()
                .map(|h| h.to_string())
                .collect();
            seen.push((report.decision.clone(), headings));
        }

        assert!(seen.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(seen[0].1[0], "Alpha Insights");
    }

    const FOUR_AGENTS: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

    #[tokio::test]
    async fn test_sequential_primary_failure_continues_without_findings() {
        let invoker = Arc::new(ScriptedInvoker::default().with("alpha", Behavior::Fail("crashed")));
        let coordinator = coordinator(&["alpha", "beta", "gamma"], config(), invoker.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Sequential))
                .await
                .unwrap(),
        );

        let order: Vec<String> = invoker.requests().into_iter().map(|r| r.agent_id).collect();
        assert_eq!(order, vec!["alpha", "beta", "gamma"]);

        let beta_prompt = invoker.prompt_for("beta");
        assert!(!beta_prompt.contains("## Previous Findings"));
        let gamma_prompt = invoker.prompt_for("gamma");
        assert!(gamma_prompt.contains("beta findings"));
        assert!(!gamma_prompt.contains("alpha findings"));

        let response = &report.response;
        assert!(response.partial);
        assert_eq!(response.gaps[0].agent_id, "alpha");
        assert!(response.gaps[0].reason.contains("crashed"));
        assert_eq!(response.headings(), vec!["Beta Insights", "Gamma Insights"]);
    }

    #[tokio::test]
    async fn test_collaborative_runs_one_call_at_a_time() {
        let invoker = Arc::new(ScriptedInvoker::default().with_all(&FOUR_AGENTS, Behavior::Delay(50)));
        let coordinator = coordinator(&FOUR_AGENTS, config(), invoker.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Collaborative))
                .await
                .unwrap(),
        );

        assert_eq!(report.decision.supporting, vec!["beta", "gamma", "delta"]);
        assert_eq!(invoker.peak_in_flight(), 1);

        let calls: Vec<(String, InteractionKind)> = invoker
            .requests()
            .into_iter()
            .map(|r| (r.agent_id, r.kind))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("alpha".to_string(), InteractionKind::Request),
                ("beta".to_string(), InteractionKind::Consultation),
                ("gamma".to_string(), InteractionKind::Consultation),
                ("delta".to_string(), InteractionKind::Consultation),
                ("alpha".to_string(), InteractionKind::Delegation),
            ]
        );
    }

    #[tokio::test]
    async fn test_parallel_respects_max_concurrency() {
        let invoker = Arc::new(ScriptedInvoker::default().with_all(&FOUR_AGENTS, Behavior::Delay(50)));
        let config = CoordinatorConfig {
            max_concurrency: 2,
            ..config()
        };
        let coordinator = coordinator(&FOUR_AGENTS, config, invoker.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Parallel))
                .await
                .unwrap(),
        );

        assert_eq!(invoker.requests().len(), 4);
        assert_eq!(invoker.peak_in_flight(), 2);
        assert_eq!(report.response.headings().len(), 4);
        assert!(!report.response.partial);
    }

    #[tokio::test]
    async fn test_debate_respects_max_concurrency() {
        let invoker = Arc::new(ScriptedInvoker::default().with_all(&FOUR_AGENTS, Behavior::Delay(50)));
        let config = CoordinatorConfig {
            max_concurrency: 2,
            ..config()
        };
        let coordinator = coordinator(&FOUR_AGENTS, config, invoker.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Debate))
                .await
                .unwrap(),
        );

        // Four openings, four rebuttals, one synthesis
        assert_eq!(invoker.requests().len(), 9);
        assert!(invoker.peak_in_flight() <= 2);
        assert!(!report.response.degraded);
    }

    /// Store that remembers which thread performed each append
    #[derive(Default)]
    struct ThreadTrackingStore {
        appends: Mutex<Vec<(TurnRecord, ThreadId)>>,
    }

    impl RecordStore for ThreadTrackingStore {
        fn append(&self, record: &TurnRecord) -> anyhow::Result<()> {
            self.appends
                .lock()
                .unwrap()
                .push((record.clone(), std::thread::current().id()));
            Ok(())
        }

        fn records(&self) -> anyhow::Result<Vec<TurnRecord>> {
            Ok(self
                .appends
                .lock()
                .unwrap()
                .iter()
                .map(|(record, _)| record.clone())
                .collect())
        }
    }

    #[tokio::test]
    async fn test_records_are_written_off_the_turn_thread() {
        let store = Arc::new(ThreadTrackingStore::default());
        let invoker = Arc::new(ScriptedInvoker::default());
        let coordinator =
            coordinator(&["alpha", "beta"], config(), invoker).with_store(store.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Parallel))
                .await
                .unwrap(),
        );

        let turn_thread = std::thread::current().id();
        let appends = store.appends.lock().unwrap().clone();
        assert_eq!(appends.len(), report.interactions.len() + 1);
        assert!(appends.iter().all(|(_, thread)| *thread != turn_thread));

        // Interactions land in sequence order, the response last
        let sequences: Vec<u64> = appends
            .iter()
            .filter_map(|(record, _)| match record {
                TurnRecord::Interaction(i) => Some(i.sequence),
                TurnRecord::Response(_) => None,
            })
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert!(matches!(appends.last(), Some((TurnRecord::Response(_), _))));
    }

    #[tokio::test]
    async fn test_turn_records_persist_to_jsonl() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("logs").join("interactions.jsonl");

        let store = Arc::new(JsonlStore::open(&log_path).unwrap());
        let invoker = Arc::new(ScriptedInvoker::default());
        let coordinator =
            coordinator(&["alpha", "beta"], config(), invoker).with_store(store.clone());

        let report = answered(
            coordinator
                .handle(query(), Some(CoordinationMode::Parallel))
                .await
                .unwrap(),
        );

        let reopened = JsonlStore::open(&log_path).unwrap();
        let interactions = reopened.interactions_for(&report.turn_id).unwrap();
        assert_eq!(interactions, report.interactions);

        let response = reopened.response_for(&report.turn_id).unwrap().unwrap();
        assert_eq!(response, report.response);
    }

    #[tokio::test]
    async fn test_markdown_ends_with_summary() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let coordinator = coordinator(&["alpha", "beta"], config(), invoker);

        let report = answered(
            coordinator
                .handle(
                    query().with_phase("Market Research"),
                    Some(CoordinationMode::Parallel),
                )
                .await
                .unwrap(),
        );

        let markdown = report.response.to_markdown();
        let alpha = markdown.find("## Alpha Insights").unwrap();
        let summary = markdown.find("## Summary & Next Steps").unwrap();
        assert!(alpha < summary);
        assert!(markdown.contains("Average stated confidence: 80%."));
        assert!(markdown.contains("Market Research"));
    }
}
