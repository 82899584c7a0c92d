//! Built-in workflow stacks
//!
//! The repository's own CI definition expressed with the construct API.

use serde_json::json;
use tracing::debug;

use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{data_from_json, App, ScopeId};

pub const MAIN_WORKFLOW: &str = "main";
pub const CI_JOB: &str = "ci";

/// Add the scheduled `main` workflow under a stack called `name`.
///
/// The job runs the program with its secrets and then stores the refreshed
/// token it prints back into the repository secrets.
pub fn main_stack(app: &mut App, scope: ScopeId, name: &str) -> ApplicationResult<ScopeId> {
    let stack = app.add_stack(scope, name)?;

    let workflow = app.add_workflow(
        stack,
        MAIN_WORKFLOW,
        data_from_json(json!({
            "name": MAIN_WORKFLOW,
            "on": {
                "schedule": [
                    { "cron": "5 20,21,22,23 * * *" }
                ]
            }
        }))?,
    )?;

    app.add_job(
        workflow,
        CI_JOB,
        data_from_json(json!({
            "runsOn": "ubuntu-latest",
            "timeoutMinutes": 60,
            "steps": [
                { "uses": "actions/checkout@v3" },
                {
                    "name": "Install rust toolchain",
                    "uses": "actions-rs/toolchain@v1"
                },
                {
                    "name": "Execute!",
                    "id": "main",
                    "run": "cargo run",
                    "env": {
                        "RUST_LOG": "trace",
                        "TOKEN": "${{ secrets.TOKEN }}",
                        "RSPOTIFY_CLIENT_ID": "${{ secrets.RSPOTIFY_CLIENT_ID }}",
                        "RSPOTIFY_CLIENT_SECRET": "${{ secrets.RSPOTIFY_CLIENT_SECRET }}"
                    }
                },
                {
                    "name": "Update token",
                    "uses": "hmanzur/actions-set-secret@v1.0.0",
                    "with": {
                        "name": "TOKEN",
                        "value": "${{ steps.main.outputs.TOKEN }}",
                        "token": "${{ secrets.PAT }}"
                    }
                }
            ]
        }))?,
    )?;

    debug!("main_stack: added '{}' with workflow '{}'", name, MAIN_WORKFLOW);
    Ok(stack)
}

/// Build the app with the configured stack.
pub fn build_app(settings: &Settings) -> ApplicationResult<App> {
    let mut app = App::new();
    let root = app.root();
    main_stack(&mut app, root, &settings.stack)?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthesize;

    #[test]
    fn main_stack_hoists_workflow_to_root() {
        let mut app = App::new();
        let root = app.root();
        main_stack(&mut app, root, "cdk").unwrap();

        let document = synthesize(&app).unwrap();

        assert_eq!(document.keys(), vec!["main"]);
        assert_eq!(
            document.pointer("/main/jobs/ci/runs-on").and_then(|v| v.as_str()),
            Some("ubuntu-latest")
        );
        assert_eq!(
            document
                .pointer("/main/jobs/ci/timeout-minutes")
                .and_then(|v| v.as_i64()),
            Some(60)
        );
        assert_eq!(
            document
                .pointer("/main/jobs/ci/steps/2/env/RUST_LOG")
                .and_then(|v| v.as_str()),
            Some("trace")
        );
    }
}
