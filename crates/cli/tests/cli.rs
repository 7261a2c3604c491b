use serde_json::Value;
use std::process::Output;
use swagger_mcp_test_support::MockBackend;
use tokio::process::Command;

const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../swagger-tools/tests/fixtures/orgs_api.json"
);

async fn run(args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_swagger-mcp"));
    for var in [
        "RUST_LOG",
        "SWAGGER_MCP_CONFIG",
        "SWAGGER_MCP_SPEC",
        "SWAGGER_MCP_API_URL",
        "SWAGGER_MCP_ALLOWED_TAGS",
        "SWAGGER_MCP_ORG_ID",
        "SWAGGER_MCP_TOKEN",
    ] {
        cmd.env_remove(var);
    }
    cmd.args(args).output().await.expect("spawn swagger-mcp")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[tokio::test]
async fn check_reports_tool_count() {
    let out = run(&["--spec", FIXTURE, "check"]).await;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("OK: 5 tools from 'Orgs API'"), "stdout: {stdout}");
}

#[tokio::test]
async fn check_fails_on_broken_spec() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"{\"swagger\":\"2.0\"}").unwrap();
    let path = file.path().display().to_string();

    let out = run(&["--spec", &path, "check"]).await;
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("paths"));
}

#[tokio::test]
async fn tools_prints_json_with_annotations() {
    let out = run(&["--spec", FIXTURE, "--log-format", "json", "tools"]).await;
    assert!(out.status.success());

    let tools = stdout_json(&out);
    let list = tools.as_array().unwrap();
    assert_eq!(list.len(), 5);
    let first = &list[0];
    assert_eq!(first["name"], "listConfs");
    assert_eq!(first["inputSchema"]["type"], "object");
    assert_eq!(first["annotations"]["readOnlyHint"], true);
}

#[tokio::test]
async fn all_tags_exposes_untagged_operations() {
    let out = run(&["--spec", FIXTURE, "--all-tags", "tools"]).await;
    assert!(out.status.success());
    let tools = stdout_json(&out);
    assert!(
        tools
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["name"] == "deleteConf")
    );
}

#[tokio::test]
async fn call_success_and_backend_error_exit_codes() {
    let backend = MockBackend::start(|req| {
        if req.path.ends_with("/missing") {
            swagger_mcp_test_support::MockResponse::new(404, r#"{"error":"not found"}"#)
        } else {
            swagger_mcp_test_support::MockResponse::new(200, r#"{"id":"c1"}"#)
        }
    })
    .await
    .unwrap();

    let out = run(&[
        "--spec",
        FIXTURE,
        "--api-url",
        backend.base_url(),
        "call",
        "get_v1_orgs_org_id_confs_conf_id",
        "--args",
        r#"{"conf_id":"c1"}"#,
        "--org-id",
        "org-9",
        "--token",
        "tok",
    ])
    .await;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let result = stdout_json(&out);
    assert_eq!(result["content"][0]["text"], r#"{"id":"c1"}"#);

    let requests = backend.requests();
    assert_eq!(requests[0].path, "/v1/orgs/org-9/confs/c1");
    assert_eq!(requests[0].header("x-ed-api-token"), Some("tok"));

    let out = run(&[
        "--spec",
        FIXTURE,
        "--api-url",
        backend.base_url(),
        "call",
        "get_v1_orgs_org_id_confs_conf_id",
        "--args",
        r#"{"conf_id":"missing"}"#,
        "--org-id",
        "org-9",
        "--token",
        "tok",
    ])
    .await;
    assert_eq!(out.status.code(), Some(1));
    let result = stdout_json(&out);
    assert_eq!(result["isError"], true);
    assert_eq!(result["content"][0]["text"], r#"API error 404: {"error":"not found"}"#);
}

#[tokio::test]
async fn call_without_token_is_an_error_result() {
    let backend = MockBackend::fixed(200, "{}").await.unwrap();
    let out = run(&[
        "--spec",
        FIXTURE,
        "--api-url",
        backend.base_url(),
        "call",
        "status",
    ])
    .await;
    assert_eq!(out.status.code(), Some(1));
    let result = stdout_json(&out);
    assert_eq!(result["isError"], true);
    assert!(backend.requests().is_empty());
}
