//! Default command: send notifications for changed content files.

use tracing::info;

use crate::changeset;
use crate::dispatch::{DispatchReport, Dispatcher, Planner};
use crate::error::Error;
use crate::notify::DeliveryClient;

use super::RunArgs;

/// Run the send command.
///
/// Missing credentials, site URL or revisions are fatal. Once those are in
/// place, nothing that happens to a single file fails the run.
pub async fn run(args: &RunArgs) -> Result<DispatchReport, Error> {
    let config = args.load_config()?;
    let site = args.site()?;
    let credentials = args.credentials()?;
    let range = args.revisions()?;
    let client = DeliveryClient::new(&config.delivery, credentials, args.dry_run)?;

    info!(
        site = %site,
        before = range.before.as_deref().unwrap_or("<none>"),
        after = %range.after,
        dry_run = args.dry_run,
        "Checking for changed content"
    );

    let changes = changeset::resolve(&args.repo, &range);
    let root = changeset::workdir(&args.repo);

    let planner = Planner::new(&root, &site, &config);
    let report = Dispatcher::new(planner, &client).dispatch(&changes).await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Oid, Repository, Signature};
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn commit_all(repo: &Repository, message: &str) -> Oid {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();

        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    fn args(repo: &Path) -> RunArgs {
        RunArgs {
            repo: repo.to_path_buf(),
            site_url: Some("https://example.org/".to_string()),
            api_key: Some("key".to_string()),
            auth_token: Some("token".to_string()),
            ..RunArgs::default()
        }
    }

    #[tokio::test]
    async fn test_send_for_changed_files() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        write(dir.path(), "index.md", "home");
        let first = commit_all(&repo, "initial");

        write(
            dir.path(),
            "_notifications/welcome.md",
            "---\ntitle: Welcome\nmessage: Hello there\n---\n",
        );
        write(dir.path(), "_news/draft.md", "---\ntitle: Draft\n---\n");
        write(dir.path(), "about.md", "about");
        let second = commit_all(&repo, "content");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notification/send/all"))
            .and(body_partial_json(json!({
                "title": "Welcome",
                "message": "Hello there",
                "target_url": "https://example.org/"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config_path = dir.path().join("frontpush.toml");
        fs::write(
            &config_path,
            format!(
                "[delivery]\napi_base = \"{}\"\npacing_ms = 0\nbackoff_base_ms = 1\n",
                server.uri()
            ),
        )
        .unwrap();

        let mut args = args(dir.path());
        args.config = Some(config_path);
        args.before = Some(first.to_string());
        args.after = Some(second.to_string());

        let report = run(&args).await.unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut args = args(dir.path());
        args.auth_token = None;
        args.after = Some("HEAD".to_string());

        let result = run(&args).await;
        assert!(matches!(
            result,
            Err(Error::MissingSetting {
                env: "WEBPUSHR_AUTH",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unresolvable_range_sends_nothing() {
        let dir = TempDir::new().unwrap();
        let mut args = args(dir.path());
        args.after = Some("HEAD".to_string());
        args.dry_run = true;

        let report = run(&args).await.unwrap();
        assert_eq!(report, DispatchReport::default());
    }
}
