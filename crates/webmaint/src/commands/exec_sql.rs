//! Implementation of the exec-sql command

use std::io::Write;
use std::path::PathBuf;

use webmaint_core::config::SupabaseConfig;
use webmaint_core::error::{MaintError, MaintResult};
use webmaint_core::output::{emit_response, ExecSqlResponse};
use webmaint_core::sql::{report_sql_file, run_sql_file, RpcSqlExecutor, SqlExecutor};
use webmaint_core::supabase::SupabaseClient;

use super::{write_failed, Context};
use crate::cli::OutputFormat;

/// Arguments for the exec-sql command.
#[derive(Debug, Clone)]
pub struct ExecSqlArgs {
    pub files: Vec<PathBuf>,
    pub function: Option<String>,
    pub param: Option<String>,
    pub fail_fast: bool,
    pub format: OutputFormat,
}

impl ExecSqlArgs {
    fn config(&self, base: &SupabaseConfig) -> SupabaseConfig {
        let mut config = base.clone();
        if let Some(function) = &self.function {
            config.sql_function = function.clone();
        }
        if let Some(param) = &self.param {
            config.sql_param = param.clone();
        }
        config
    }
}

/// Run the exec-sql command against the configured project.
pub fn run_exec_sql(ctx: &Context, args: &ExecSqlArgs, out: &mut impl Write) -> MaintResult<()> {
    let config = args.config(&ctx.config.supabase);
    let client = SupabaseClient::from_config(&config)?;
    let executor = RpcSqlExecutor::from_config(&client, &config);
    run_with_executor(ctx, args, &executor, executor.function(), out)
}

/// Run every file through `executor`, in order.
///
/// Each file's outcome is reported as it finishes in text mode. Any failure
/// becomes [`MaintError::SqlFailed`] (exit code 5) carrying every attempted
/// file's report; the JSON success response is written only when all files
/// succeeded.
pub fn run_with_executor<E>(
    ctx: &Context,
    args: &ExecSqlArgs,
    executor: &E,
    function: &str,
    out: &mut impl Write,
) -> MaintResult<()>
where
    E: SqlExecutor + ?Sized,
{
    let mut results = Vec::new();
    let mut failed = 0usize;
    for file in &args.files {
        let path = ctx.path(file);
        let report = match args.format {
            OutputFormat::Text => report_sql_file(executor, &path, out),
            OutputFormat::Json => run_sql_file(executor, &path),
        };
        let success = report.success;
        results.push(report);
        if !success {
            failed += 1;
            if args.fail_fast {
                break;
            }
        }
    }

    if failed > 0 {
        return Err(MaintError::SqlFailed {
            function: function.to_string(),
            failed,
            results,
        });
    }

    if args.format == OutputFormat::Json {
        emit_response(&ExecSqlResponse::new(function, results), out).map_err(write_failed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;
    use webmaint_core::config::Config;

    /// Fails any SQL containing `boom`.
    struct FakeExecutor {
        seen: RefCell<Vec<String>>,
    }

    impl SqlExecutor for FakeExecutor {
        fn execute_sql(&self, sql: &str) -> MaintResult<Value> {
            self.seen.borrow_mut().push(sql.to_string());
            if sql.contains("boom") {
                Err(MaintError::remote("HTTP 400: syntax error", Some(400)))
            } else {
                Ok(Value::Null)
            }
        }
    }

    fn setup(files: &[(&str, &str)]) -> (TempDir, Context) {
        let temp = TempDir::new().unwrap();
        for (name, sql) in files {
            fs::write(temp.path().join(name), sql).unwrap();
        }
        let ctx = Context {
            workspace: temp.path().to_path_buf(),
            config: Config::default(),
        };
        (temp, ctx)
    }

    fn args(files: &[&str], fail_fast: bool, format: OutputFormat) -> ExecSqlArgs {
        ExecSqlArgs {
            files: files.iter().map(PathBuf::from).collect(),
            function: None,
            param: None,
            fail_fast,
            format,
        }
    }

    fn executor() -> FakeExecutor {
        FakeExecutor {
            seen: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn all_files_succeed() {
        let (_temp, ctx) = setup(&[("a.sql", "select 1;"), ("b.sql", "select 2;")]);
        let exec = executor();
        let mut out = Vec::new();
        run_with_executor(
            &ctx,
            &args(&["a.sql", "b.sql"], false, OutputFormat::Text),
            &exec,
            "exec_sql",
            &mut out,
        )
        .unwrap();
        assert_eq!(exec.seen.borrow().len(), 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("successfully").count(), 2);
    }

    #[test]
    fn failure_continues_then_errors() {
        let (_temp, ctx) = setup(&[("a.sql", "boom"), ("b.sql", "select 2;")]);
        let exec = executor();
        let err = run_with_executor(
            &ctx,
            &args(&["a.sql", "b.sql"], false, OutputFormat::Text),
            &exec,
            "exec_sql",
            &mut Vec::new(),
        )
        .unwrap_err();
        assert_eq!(exec.seen.borrow().len(), 2);
        assert_eq!(err.error_code().code(), 5);
        assert!(err.to_string().contains("1 of 2 SQL files failed"));
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let (_temp, ctx) = setup(&[("a.sql", "boom"), ("b.sql", "select 2;")]);
        let exec = executor();
        let result = run_with_executor(
            &ctx,
            &args(&["a.sql", "b.sql"], true, OutputFormat::Text),
            &exec,
            "exec_sql",
            &mut Vec::new(),
        );
        assert!(result.is_err());
        assert_eq!(exec.seen.borrow().len(), 1);
    }

    #[test]
    fn json_failure_is_a_single_error() {
        let (_temp, ctx) = setup(&[("b.sql", "select 2;")]);
        let exec = executor();
        let mut out = Vec::new();
        let err = run_with_executor(
            &ctx,
            &args(&["missing.sql", "b.sql"], false, OutputFormat::Json),
            &exec,
            "exec_sql",
            &mut out,
        )
        .unwrap_err();
        assert!(out.is_empty());
        assert_eq!(exec.seen.borrow().len(), 1);
        match err {
            MaintError::SqlFailed {
                function,
                failed,
                results,
            } => {
                assert_eq!(function, "exec_sql");
                assert_eq!(failed, 1);
                assert_eq!(results.len(), 2);
                assert!(!results[0].success);
                assert!(results[0]
                    .error
                    .as_deref()
                    .unwrap()
                    .contains("file not found"));
                assert!(results[1].success);
            }
            other => panic!("expected SqlFailed, got {:?}", other),
        }
    }

    #[test]
    fn json_success_emits_response() {
        let (_temp, ctx) = setup(&[("a.sql", "select 1;")]);
        let mut out = Vec::new();
        run_with_executor(
            &ctx,
            &args(&["a.sql"], false, OutputFormat::Json),
            &executor(),
            "exec_sql",
            &mut out,
        )
        .unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["function"], "exec_sql");
        assert_eq!(value["results"][0]["success"], true);
    }

    #[test]
    fn flags_override_function_and_param() {
        let a = ExecSqlArgs {
            function: Some("run_sql".to_string()),
            param: Some("sql_query".to_string()),
            ..args(&["a.sql"], false, OutputFormat::Text)
        };
        let config = a.config(&SupabaseConfig::default());
        assert_eq!(config.sql_function, "run_sql");
        assert_eq!(config.sql_param, "sql_query");
    }
}
