//! Routing changed files to notifications.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::changeset::{ChangeSet, ChangedFile};
use crate::config::{Config, SiteUrl};
use crate::content::{normalize_url, parse_frontmatter, Category, TargetBuilder};
use crate::notify::{
    send_gate, Audience, DeliveryClient, DeliveryOutcome, NotificationPayload, SkipReason,
};

/// Everything a file will send, resolved without touching the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryPlan {
    pub path: String,
    pub category: Category,
    pub audience: Audience,
    pub payload: NotificationPayload,
}

impl DeliveryPlan {
    /// Number of send calls this plan makes.
    pub fn call_count(&self) -> usize {
        match &self.audience {
            Audience::All | Audience::Segment(_) => 1,
            Audience::Specific(ids) => ids.len(),
        }
    }
}

/// Turns a changed file into a [`DeliveryPlan`].
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    root: &'a Path,
    site: &'a SiteUrl,
    config: &'a Config,
}

impl<'a> Planner<'a> {
    /// `root` is the working tree that change-set paths are relative to.
    pub fn new(root: &'a Path, site: &'a SiteUrl, config: &'a Config) -> Self {
        Self { root, site, config }
    }

    pub fn plan(&self, file: &ChangedFile) -> Result<DeliveryPlan, SkipReason> {
        let frontmatter = parse_frontmatter(&self.root.join(&file.path));
        debug!(
            path = %file.path,
            frontmatter = %serde_json::to_string(&frontmatter).unwrap_or_default(),
            "Parsed frontmatter"
        );

        send_gate(file.category, &frontmatter)?;
        let audience = Audience::from_frontmatter(&frontmatter)?;

        let target = TargetBuilder::new(self.site, &self.config.targets).build(
            &frontmatter,
            Path::new(&file.path),
            file.category,
        );
        let icon = normalize_url(frontmatter.image.as_deref(), self.site);
        let payload =
            NotificationPayload::assemble(&frontmatter, &self.config.default_title, target, icon);

        Ok(DeliveryPlan {
            path: file.path.clone(),
            category: file.category,
            audience,
            payload,
        })
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Files looked at.
    pub files: usize,
    /// Files that made at least one send call.
    pub sent: usize,
    pub skipped: usize,
    /// Send calls made.
    pub calls: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl std::fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} file(s): {} sent, {} skipped; {} call(s): {} delivered, {} failed",
            self.files, self.sent, self.skipped, self.calls, self.delivered, self.failed
        )
    }
}

/// Processes a change set file by file. Per-file problems are logged and
/// counted; nothing aborts the loop.
pub struct Dispatcher<'a> {
    planner: Planner<'a>,
    client: &'a DeliveryClient,
}

impl<'a> Dispatcher<'a> {
    pub fn new(planner: Planner<'a>, client: &'a DeliveryClient) -> Self {
        Self { planner, client }
    }

    pub async fn dispatch(&self, changes: &ChangeSet) -> DispatchReport {
        let mut report = DispatchReport::default();

        if changes.is_empty() {
            info!("No changed files to process");
            return report;
        }

        for file in changes.files() {
            report.files += 1;

            let plan = match self.planner.plan(file) {
                Ok(plan) => plan,
                Err(reason) => {
                    info!(path = %file.path, category = %file.category, reason = %reason, "Skipping file");
                    report.skipped += 1;
                    continue;
                }
            };

            info!(
                path = %plan.path,
                category = %plan.category,
                calls = plan.call_count(),
                "Dispatching notification"
            );

            let outcomes = self.client.deliver(&plan.payload, &plan.audience).await;
            report.sent += 1;
            for outcome in &outcomes {
                report.calls += 1;
                if outcome.is_success() {
                    report.delivered += 1;
                } else {
                    report.failed += 1;
                }
            }

            let failures: Vec<&DeliveryOutcome> =
                outcomes.iter().filter(|o| !o.is_success()).collect();
            if !failures.is_empty() {
                warn!(path = %plan.path, failures = ?failures, "Some pushes failed");
            }
        }

        info!(
            dry_run = self.client.is_dry_run(),
            "Finished processing notifications: {}", report
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, DeliveryConfig};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn site() -> SiteUrl {
        SiteUrl::parse("https://example.org").unwrap()
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn client(api_base: &str) -> DeliveryClient {
        let config = DeliveryConfig {
            api_base: api_base.to_string(),
            max_attempts: 2,
            backoff_base_ms: 1,
            pacing_ms: 0,
            timeout_secs: 5,
        };
        let credentials = Credentials::new(Some("key"), Some("token")).unwrap();
        DeliveryClient::new(&config, credentials, false).unwrap()
    }

    async fn run(dir: &Path, server: &MockServer, paths: &[&str]) -> DispatchReport {
        let site = site();
        let config = Config::default();
        let client = client(&server.uri());
        let dispatcher = Dispatcher::new(Planner::new(dir, &site, &config), &client);
        dispatcher
            .dispatch(&ChangeSet::from_paths(paths.iter().copied()))
            .await
    }

    async fn expect_no_calls(server: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_news_broadcast() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "_news/2024-spring.md",
            "---\ntitle: \"Spring Fest\"\nid: \"spring-fest\"\naudience: all\nsend_notification: true\n---\nBody\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notification/send/all"))
            .and(body_partial_json(json!({
                "title": "Spring Fest",
                "message": "Spring Fest",
                "target_url": "https://example.org/news/#news-spring-fest/"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let report = run(dir.path(), &server, &["_news/2024-spring.md"]).await;
        assert_eq!(report.sent, 1);
        assert_eq!(report.calls, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn test_notification_send_now_false() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "_notifications/paused.md",
            "---\ntitle: Paused\nsend_now: false\n---\n",
        );

        let server = MockServer::start().await;
        expect_no_calls(&server).await;

        let report = run(dir.path(), &server, &["_notifications/paused.md"]).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.calls, 0);
    }

    #[tokio::test]
    async fn test_content_without_flag_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "_news/quiet.md", "---\ntitle: Quiet\n---\n");
        write(dir.path(), "_places/park.md", "---\ntitle: Park\naudience: all\n---\n");

        let server = MockServer::start().await;
        expect_no_calls(&server).await;

        let report = run(dir.path(), &server, &["_news/quiet.md", "_places/park.md"]).await;
        assert_eq!(report.files, 2);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_specific_subscribers_fan_out() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "_places/temple.md",
            "---\ntitle: Temple\npush_message: Open today\nsend_notification: true\naudience: specific\nspecific_subscribers:\n  - 101\n  - subscriber: 202\n  - \"303\"\n---\n",
        );

        let server = MockServer::start().await;
        for sid in ["101", "202", "303"] {
            Mock::given(method("POST"))
                .and(path("/notification/send/sid"))
                .and(body_partial_json(json!({
                    "sid": sid,
                    "title": "Temple",
                    "message": "Open today",
                    "target_url": "https://example.org/places/#/places/temple"
                })))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server)
                .await;
        }

        let report = run(dir.path(), &server, &["_places/temple.md"]).await;
        assert_eq!(report.calls, 3);
        assert_eq!(report.delivered, 3);
    }

    #[tokio::test]
    async fn test_segment_without_tag_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "_news/vip.md",
            "---\ntitle: VIP\nsend_notification: true\naudience: segment\n---\n",
        );

        let server = MockServer::start().await;
        expect_no_calls(&server).await;

        let report = run(dir.path(), &server, &["_news/vip.md"]).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.calls, 0);
    }

    #[tokio::test]
    async fn test_bad_files_do_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "_news/broken.md", "---\ntitle: [oops\n---\n");
        write(
            dir.path(),
            "_notifications/hello.md",
            "---\ntitle: Hello\nimage: /img/hello.png\n---\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notification/send/all"))
            .and(body_partial_json(json!({
                "title": "Hello",
                "target_url": "https://example.org/",
                "icon": "https://example.org/img/hello.png",
                "image": "https://example.org/img/hello.png",
                "thumbnail": "https://example.org/img/hello.png"
            })))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let report = run(
            dir.path(),
            &server,
            &["_news/broken.md", "_news/missing.md", "_notifications/hello.md"],
        )
        .await;
        assert_eq!(report.files, 3);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_plan_without_network() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "_news/2024-spring.md",
            "---\ntitle: Spring Fest\nsend_now: true\naudience: segment\nsegment_tag: locals\nimage: img/spring.jpg\n---\n",
        );

        let site = site();
        let config = Config::default();
        let planner = Planner::new(dir.path(), &site, &config);
        let plan = planner
            .plan(&ChangedFile::new("_news/2024-spring.md"))
            .unwrap();

        assert_eq!(plan.category, Category::News);
        assert_eq!(plan.audience, Audience::Segment("locals".to_string()));
        assert_eq!(plan.call_count(), 1);
        assert_eq!(
            plan.payload.target_url,
            "https://example.org/news/#news-2024-spring/"
        );
        assert_eq!(
            plan.payload.icon.as_deref(),
            Some("https://example.org/img/spring.jpg")
        );
    }
}
