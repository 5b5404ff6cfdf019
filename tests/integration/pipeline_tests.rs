//! Integration tests for the orchestrated tool call and hook round trip

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tool_guardrails::cache::clock::ManualClock;
use tool_guardrails::cache::store::MemoryStore;
use tool_guardrails::{
    CommandAuditEntry, Config, Decision, GuardrailPipeline, HookInput, HookOutput, ToolCall,
    ToolCallOutcome, ToolExecutor, ToolResult,
};

/// Executor that echoes a canned response per tool
struct ScriptedExecutor {
    calls: AtomicUsize,
}

impl ScriptedExecutor {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ScriptedExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match call.tool_name.as_str() {
            "bash" => ToolResult::ok("deployed by ops@example.com").with_exit_code(0),
            "read_file" => ToolResult::ok(format!(
                "contents of {}",
                call.args["path"].as_str().unwrap_or_default()
            )),
            _ => ToolResult::ok("ok"),
        }
    }
}

fn decide(pipeline: &GuardrailPipeline, json: &str) -> Decision {
    let input = HookInput::from_json(json).unwrap();
    let command = input.tool_input.command().unwrap();
    Decision::from_validation(&pipeline.classify(command))
}

#[tokio::test]
async fn test_audit_file_receives_masked_entries() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit/commands.jsonl");

    let mut config = Config::default();
    config.general.audit_log = true;
    config.general.audit_path = Some(audit_path.to_string_lossy().into_owned());
    let pipeline = GuardrailPipeline::new(&config).unwrap();
    let executor = ScriptedExecutor::new();

    let call = ToolCall::new(
        "bash",
        json!({"command": "DEPLOY_TOKEN=abc123secret ./deploy.sh"}),
    )
    .with_session("s-1");
    let outcome = pipeline.run_tool(&call, &executor).await;

    let ToolCallOutcome::Completed { result, mask_count, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(result.content, "deployed by o***@example.com");
    assert_eq!(mask_count, 1);

    let blocked = ToolCall::new("bash", json!({"command": "rm -rf /"}));
    assert!(pipeline.run_tool(&blocked, &executor).await.is_blocked());
    assert_eq!(executor.calls(), 1);

    let content = std::fs::read_to_string(&audit_path).unwrap();
    let entries: Vec<CommandAuditEntry> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].command, "DEPLOY_TOKEN=[REDACTED] ./deploy.sh");
    assert_eq!(entries[0].session_id.as_deref(), Some("s-1"));
    assert!(entries[0].execution.unwrap().success);
    assert!(!entries[1].validation.allowed);
    assert!(entries[1].execution.is_none());
    assert!(!content.contains("abc123secret"));
}

#[tokio::test]
async fn test_session_scoped_durable_cache() {
    let mut config = Config::default();
    config.cache.session_scoped = true;

    let clock = Arc::new(ManualClock::new(0));
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let pipeline = GuardrailPipeline::new(&config)
        .unwrap()
        .with_durable(store.clone())
        .with_clock(clock.clone());
    let executor = ScriptedExecutor::new();

    let a = ToolCall::new("read_file", json!({"path": "/etc/hostname"})).with_session("a");
    let b = ToolCall::new("read_file", json!({"path": "/etc/hostname"})).with_session("b");

    pipeline.run_tool(&a, &executor).await;
    pipeline.run_tool(&a, &executor).await;
    pipeline.run_tool(&b, &executor).await;
    assert_eq!(executor.calls(), 2);
    assert_eq!(store.len(), 2);

    // read_file keeps results for five minutes
    clock.advance(5 * 60_000);
    pipeline.run_tool(&a, &executor).await;
    assert_eq!(executor.calls(), 3);
    assert_eq!(pipeline.clean_expired().await, 2);
}

#[tokio::test]
async fn test_explicit_cache_operations() {
    let pipeline = GuardrailPipeline::new(&Config::default()).unwrap();
    let args = json!({"directory": "/repo/src", "pattern": "*.rs"});

    pipeline
        .cache_store("glob", &args, &ToolResult::ok("lib.rs\nmain.rs"), None, None)
        .await;
    assert!(pipeline.cache_lookup("glob", &args, None).await.is_some());

    assert_eq!(pipeline.invalidate_path("/repo/src/lib.rs"), 1);
    assert!(pipeline.cache_lookup("glob", &args, None).await.is_none());

    // Non-cacheable tools bypass the cache entirely
    pipeline
        .cache_store("bash", &json!({"command": "ls"}), &ToolResult::ok("x"), None, None)
        .await;
    assert!(pipeline.cache_lookup("bash", &json!({"command": "ls"}), None).await.is_none());

    let stats = pipeline.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tool_calls_share_one_pipeline() {
    const TASKS: usize = 8;
    const ROUNDS: usize = 12;
    const CAPACITY: usize = 16;

    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let mut config = Config::default();
    config.general.audit_log = true;
    config.general.audit_path = Some(audit_path.to_string_lossy().into_owned());
    config.cache.max_memory_entries = CAPACITY;

    let pipeline = Arc::new(GuardrailPipeline::new(&config).unwrap());
    let executor = Arc::new(ScriptedExecutor::new());

    let mut handles = Vec::new();
    for task in 0..TASKS {
        let pipeline = Arc::clone(&pipeline);
        let executor = Arc::clone(&executor);
        handles.push(tokio::spawn(async move {
            let session = format!("task-{task}");
            for round in 0..ROUNDS {
                let path = format!("/data/{task}/{}.txt", round % 3);

                let read = ToolCall::new("read_file", json!({"path": &path})).with_session(&session);
                pipeline.run_tool(&read, executor.as_ref()).await;

                let write = ToolCall::new("write_file", json!({"file_path": &path, "content": "x"}));
                pipeline.run_tool(&write, executor.as_ref()).await;
                pipeline.invalidate_path(&path);

                let shell = ToolCall::new("bash", json!({"command": "echo ok"})).with_session(&session);
                pipeline.run_tool(&shell, executor.as_ref()).await;

                let validation = pipeline.classify("git status");
                pipeline.record_outcome("git status", &validation, None, Some(session.as_str()));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // One audited shell call and one explicit record per round
    let expected_audit = TASKS * ROUNDS * 2;
    assert_eq!(pipeline.classifier().audit_log().len(), expected_audit);
    let content = std::fs::read_to_string(&audit_path).unwrap();
    assert_eq!(content.lines().count(), expected_audit);
    for line in content.lines() {
        serde_json::from_str::<CommandAuditEntry>(line).unwrap();
    }

    // Only read_file lookups reach the cache counters
    let stats = pipeline.cache_stats();
    assert_eq!(stats.hits + stats.misses, (TASKS * ROUNDS) as u64);
    assert!(stats.entries <= CAPACITY);
}

#[test]
fn test_hook_decisions() {
    let pipeline = GuardrailPipeline::new(&Config::default()).unwrap();

    let deny = decide(
        &pipeline,
        r#"{"tool_name":"bash","tool_input":{"command":"rm -rf /"}}"#,
    );
    assert!(deny.is_deny());
    assert!(HookOutput::from_decision(&deny).to_json().contains("root_delete"));

    let ask = decide(
        &pipeline,
        r#"{"tool_name":"bash","tool_input":{"command":"terraform destroy -auto-approve"}}"#,
    );
    assert!(matches!(ask, Decision::Ask { .. }));

    let allow = decide(
        &pipeline,
        r#"{"tool_name":"bash","tool_input":{"command":"cargo test --workspace"}}"#,
    );
    assert!(allow.is_allow());
    assert_eq!(HookOutput::from_decision(&allow).to_json(), "{}");
}

#[test]
fn test_config_tools_respected() {
    let mut config = Config::default();
    config.tools.shell = vec!["run_terminal".to_string()];
    let pipeline = GuardrailPipeline::new(&config).unwrap();

    assert!(pipeline.is_shell_tool("run_terminal"));
    assert!(!pipeline.is_shell_tool("bash"));
    assert!(pipeline.is_mutating_tool("write_file"));
}
