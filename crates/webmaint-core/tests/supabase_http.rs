//! Integration tests for the Supabase client, the SQL runner and category
//! activation against a loopback server.

mod support;

use std::fs;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use ureq::Agent;
use webmaint_core::categories::{activate_categories, CategoryStore};
use webmaint_core::config::SupabaseCredentials;
use webmaint_core::error::MaintError;
use webmaint_core::sql::{execute_sql_file, RpcSqlExecutor};
use webmaint_core::supabase::SupabaseClient;

use support::http::ScriptedServer;

const KEY: &str = "service-role-test-key";

/// Client pointed at `server`, bypassing any proxy from the environment.
fn client(server: &ScriptedServer) -> SupabaseClient {
    let agent: Agent = Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(10)))
        .http_status_as_error(false)
        .proxy(None)
        .build()
        .into();
    SupabaseClient::with_agent(
        SupabaseCredentials {
            url: server.url().to_string(),
            key: KEY.to_string(),
        },
        agent,
    )
}

mod rpc {
    use super::*;

    #[test]
    fn sends_auth_headers_and_json_body() {
        let server = ScriptedServer::once(200, "null");
        let result = client(&server)
            .rpc("exec_sql", &json!({ "query": "select 1;" }))
            .unwrap();
        assert!(result.is_null());

        let requests = server.finish();
        let req = &requests[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.target, "/rest/v1/rpc/exec_sql");
        assert_eq!(req.header("apikey"), Some(KEY));
        assert_eq!(
            req.header("authorization").map(str::to_string),
            Some(format!("Bearer {}", KEY))
        );
        assert!(req
            .header("content-type")
            .is_some_and(|v| v.starts_with("application/json")));
        assert_eq!(req.json(), json!({ "query": "select 1;" }));
    }

    #[test]
    fn returns_parsed_result() {
        let server = ScriptedServer::once(200, r#"[{"applied":true}]"#);
        let result = client(&server).rpc("exec_sql", &json!({})).unwrap();
        assert_eq!(result, json!([{ "applied": true }]));
        server.finish();
    }

    #[test]
    fn empty_body_is_null() {
        let server = ScriptedServer::once(204, "");
        let result = client(&server).rpc("exec_sql", &json!({})).unwrap();
        assert!(result.is_null());
        server.finish();
    }

    #[test]
    fn http_error_carries_status_and_message() {
        let server = ScriptedServer::once(
            404,
            r#"{"code":"PGRST202","message":"Could not find the function public.exec_sql(query)"}"#,
        );
        let err = client(&server).rpc("exec_sql", &json!({})).unwrap_err();
        match &err {
            MaintError::Remote { message, status } => {
                assert_eq!(*status, Some(404));
                assert!(message.contains("HTTP 404"));
                assert!(message.contains("Could not find the function"));
            }
            other => panic!("expected Remote, got {:?}", other),
        }
        assert_eq!(err.error_code().code(), 5);
        server.finish();
    }

    #[test]
    fn connection_refused_is_remote_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(5)))
            .http_status_as_error(false)
            .proxy(None)
            .build()
            .into();
        let client = SupabaseClient::with_agent(
            SupabaseCredentials {
                url: format!("http://127.0.0.1:{}", port),
                key: KEY.to_string(),
            },
            agent,
        );
        let err = client.rpc("exec_sql", &json!({})).unwrap_err();
        assert!(matches!(err, MaintError::Remote { status: None, .. }));
    }
}

mod sql_file {
    use super::*;

    #[test]
    fn file_contents_sent_as_query_param() {
        let temp = TempDir::new().unwrap();
        let sql = "drop policy if exists \"read\" on categories;\ncreate policy \"read\" on categories for select using (true);\n";
        let path = temp.path().join("fix_categories_rls.sql");
        fs::write(&path, sql).unwrap();

        let server = ScriptedServer::once(200, "null");
        let client = client(&server);
        let executor = RpcSqlExecutor::new(&client, "exec_sql", "query");
        let mut out = Vec::new();
        assert!(execute_sql_file(&executor, &path, &mut out));

        let requests = server.finish();
        assert_eq!(requests[0].json(), json!({ "query": sql }));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Executed"));
    }

    #[test]
    fn rejected_sql_returns_false() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.sql");
        fs::write(&path, "select from;").unwrap();

        let server = ScriptedServer::once(400, r#"{"message":"syntax error at or near \"from\""}"#);
        let client = client(&server);
        let executor = RpcSqlExecutor::new(&client, "exec_sql", "sql_query");
        let mut out = Vec::new();
        assert!(!execute_sql_file(&executor, &path, &mut out));

        let requests = server.finish();
        assert_eq!(requests[0].json(), json!({ "sql_query": "select from;" }));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("syntax error"));
    }
}

mod categories {
    use super::*;

    #[test]
    fn activation_round_trip() {
        let before = r#"[
            {"id":"c1","name":"Fashion","name_ar":"أزياء","is_active":true,"parent_id":null},
            {"id":"c2","name":"Shoes","name_ar":null,"is_active":false,"parent_id":"c1"},
            {"id":"c3","name":"Toys","name_ar":null,"is_active":null,"parent_id":null}
        ]"#;
        let updated = r#"[
            {"id":"c2","name":"Shoes","name_ar":null,"is_active":true,"parent_id":"c1"},
            {"id":"c3","name":"Toys","name_ar":null,"is_active":true,"parent_id":null}
        ]"#;
        let after = before
            .replace(r#""is_active":false"#, r#""is_active":true"#)
            .replace(r#""is_active":null"#, r#""is_active":true"#);

        let server = ScriptedServer::start(vec![
            (200, before.to_string()),
            (200, updated.to_string()),
            (200, after),
        ]);
        let report = activate_categories(&client(&server), false).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.inactive_before, 2);
        assert_eq!(report.activated, 2);
        assert_eq!(report.active_count(), 3);

        let requests = server.finish();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, "GET");
        assert!(requests[0].target.starts_with("/rest/v1/categories?select="));
        assert!(requests[0].target.contains("order=created_at"));
        assert_eq!(requests[1].method, "PATCH");
        assert!(requests[1].target.contains("is_active.eq.false"));
        assert_eq!(requests[1].header("prefer"), Some("return=representation"));
        assert_eq!(requests[1].json(), json!({ "is_active": true }));
        assert_eq!(requests[2].method, "GET");
    }

    #[test]
    fn list_rejects_unexpected_payload() {
        let server = ScriptedServer::once(200, r#"{"not":"rows"}"#);
        let err = client(&server).list_categories().unwrap_err();
        assert!(err.to_string().contains("unexpected categories payload"));
        server.finish();
    }
}
