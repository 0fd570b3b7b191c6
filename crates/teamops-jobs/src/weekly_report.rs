//! Weekly report job: copy last week's page into next week's.

use chrono::{Datelike, NaiveDate};
use tracing::{error, info};

use teamops_config::{AppConfig, ConfluenceConfig};
use teamops_types::{JobOutcome, WikiPage};

use crate::JobError;
use crate::chat::{ChatApi, report_failure};
use crate::report::{NextReport, next_report_title};
use crate::wiki::{WikiApi, find_latest_report, resolve_root_folder};

/// A freshly created report page.
#[derive(Debug, Clone)]
pub struct CreatedReport {
    pub page: WikiPage,
    pub next: NextReport,
    pub url: String,
}

/// Run the weekly report job for `today`.
pub async fn run(
    wiki: &dyn WikiApi,
    chat: &dyn ChatApi,
    config: &AppConfig,
    today: NaiveDate,
) -> JobOutcome {
    let confluence = &config.confluence_config;
    if !confluence.weekly_report_enabled {
        let reason = "Confluence page copying is disabled.";
        info!("{reason}");
        return JobOutcome::Skipped {
            reason: reason.into(),
        };
    }

    let channel = confluence.report_channel();
    let result = async {
        let created = create_next_weekly_report(wiki, confluence, today).await?;
        chat.post_message(channel, &announcement(confluence, &created))
            .await
            .map_err(JobError::Chat)?;
        Ok::<_, JobError>(created)
    }
    .await;

    match result {
        Ok(created) => {
            info!(title = %created.next.title, url = %created.url, "Weekly report created");
            JobOutcome::Succeeded {
                detail: format!(
                    "Confluence weekly report created: {} ({})",
                    created.next.title, created.url
                ),
            }
        }
        Err(e) => {
            let message = format!("Error copying Confluence page: {e}");
            error!("{message}");
            report_failure(chat, channel, &message).await;
            JobOutcome::Failed { error: message }
        }
    }
}

/// Copy the latest report and rename the copy for the following week.
pub async fn create_next_weekly_report(
    wiki: &dyn WikiApi,
    confluence: &ConfluenceConfig,
    today: NaiveDate,
) -> Result<CreatedReport, JobError> {
    let (root, _) = resolve_root_folder(wiki, confluence, today.year())
        .await
        .map_err(JobError::Wiki)?;

    let mut latest = find_latest_report(wiki, &root.id)
        .await
        .map_err(JobError::Wiki)?;

    // Early in January the current folder is empty (whether created by this
    // run or left behind by a failed one); last week's report is still in the
    // previous year's folder.
    if latest.is_none() {
        let previous_title = confluence.root_folder_title(today.year() - 1);
        if let Some(previous) = wiki
            .find_page_by_title(&previous_title)
            .await
            .map_err(JobError::Wiki)?
        {
            latest = find_latest_report(wiki, &previous.id)
                .await
                .map_err(JobError::Wiki)?;
        }
    }

    let (latest, _) = latest.ok_or_else(|| {
        JobError::NoReports(format!(
            "No weekly reports found under root page {}",
            root.title
        ))
    })?;

    let next = next_report_title(&latest.title, today.year())?;
    info!(from = %latest.title, to = %next.title, "Rolling weekly report forward");

    let destination = if next.crosses_year {
        let (folder, _) = resolve_root_folder(wiki, confluence, next.year)
            .await
            .map_err(JobError::Wiki)?;
        folder
    } else {
        root
    };

    let copy = wiki
        .copy_page(&latest.id, &destination.id)
        .await
        .map_err(JobError::Wiki)?;
    let page = wiki
        .update_page(&copy.id, &next.title, copy.version + 1)
        .await
        .map_err(JobError::Wiki)?;
    let url = wiki.page_url(&page);

    Ok(CreatedReport { page, next, url })
}

fn announcement(confluence: &ConfluenceConfig, created: &CreatedReport) -> String {
    let greeting = match confluence.mention.as_deref().map(str::trim) {
        Some(mention) if !mention.is_empty() => format!(":uia_cat: Hi {mention}"),
        _ => ":uia_cat: Hi".to_string(),
    };
    format!(
        "{greeting} 本週週報已長出來: <{}|{}>，請記得週五前完成！",
        created.url, created.next.title
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeChat, FakeWiki};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.confluence_config.weekly_report_enabled = true;
        config.confluence_config.weekly_report_slack_channel = "C-REPORT".into();
        config.confluence_config.mention = Some("<!subteam^S03GP72G62J>".into());
        config
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_disabled_is_skipped() {
        let wiki = FakeWiki::new();
        let chat = FakeChat::new();
        let outcome = run(&wiki, &chat, &AppConfig::default(), date(2025, 6, 9)).await;
        assert!(matches!(outcome, JobOutcome::Skipped { .. }));
        assert!(wiki.pages().is_empty());
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn test_copies_latest_report_and_announces() {
        let wiki = FakeWiki::new();
        let chat = FakeChat::new();
        let root = wiki.add_page(None, "團隊週會 2025");
        wiki.add_page(Some(&root.id), "2025 W22 RD4 Team Report (0526-0530)");
        wiki.add_page(Some(&root.id), "2025 W23 RD4 Team Report (0602-0606)");

        let outcome = run(&wiki, &chat, &config(), date(2025, 6, 9)).await;
        assert!(matches!(outcome, JobOutcome::Succeeded { .. }), "{outcome:?}");

        let titles = wiki.child_titles(&root.id);
        assert!(titles.contains(&"2025 W24 RD4 Team Report (0609-0613)".to_string()));
        assert_eq!(titles.len(), 3);

        let messages = chat.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "C-REPORT");
        assert!(messages[0].1.starts_with(":uia_cat: Hi <!subteam^S03GP72G62J>"));
        assert!(messages[0].1.contains("https://team.example.net/wiki/spaces/TEAM/pages/"));
    }

    #[tokio::test]
    async fn test_renamed_copy_bumps_version() {
        let wiki = FakeWiki::new();
        let root = wiki.add_page(None, "團隊週會 2025");
        wiki.add_page(Some(&root.id), "2025 W23 RD4 Team Report (0602-0606)");

        let created = create_next_weekly_report(
            &wiki,
            &config().confluence_config,
            date(2025, 6, 9),
        )
        .await
        .unwrap();
        assert_eq!(created.page.version, 2);
        assert_eq!(created.page.title, "2025 W24 RD4 Team Report (0609-0613)");
    }

    #[tokio::test]
    async fn test_year_rollover_files_into_next_year_folder() {
        let wiki = FakeWiki::new();
        let root = wiki.add_page(None, "團隊週會 2025");
        wiki.add_page(Some(&root.id), "2025 W52 RD4 Team Report (1222-1226)");
        wiki.add_page(Some(&root.id), "2025 W01 RD4 Team Report (1229-0102)");

        // Job runs on the last day of 2025 to prepare the first full week of 2026.
        let created = create_next_weekly_report(
            &wiki,
            &config().confluence_config,
            date(2025, 12, 31),
        )
        .await
        .unwrap();
        assert_eq!(created.next.title, "2026 W02 RD4 Team Report (0105-0109)");

        let folder = wiki
            .pages()
            .into_iter()
            .find(|p| p.page.title == "團隊週會 2026")
            .expect("2026 folder created");
        let stored = wiki.page(&created.page.id).unwrap();
        assert_eq!(stored.parent.as_deref(), Some(folder.page.id.as_str()));
    }

    #[tokio::test]
    async fn test_new_year_falls_back_to_previous_folder() {
        let wiki = FakeWiki::new();
        let old_root = wiki.add_page(None, "團隊週會 2025");
        wiki.add_page(Some(&old_root.id), "2025 W01 RD4 Team Report (1229-0102)");

        let created = create_next_weekly_report(
            &wiki,
            &config().confluence_config,
            date(2026, 1, 3),
        )
        .await
        .unwrap();
        assert_eq!(created.next.title, "2026 W02 RD4 Team Report (0105-0109)");

        let new_root = wiki
            .pages()
            .into_iter()
            .find(|p| p.page.title == "團隊週會 2026")
            .unwrap();
        assert_eq!(
            wiki.child_titles(&new_root.page.id),
            vec!["2026 W02 RD4 Team Report (0105-0109)".to_string()]
        );
    }

    #[tokio::test]
    async fn test_retry_after_failed_copy_in_new_year() {
        let wiki = FakeWiki::new();
        let chat = FakeChat::new();
        let old_root = wiki.add_page(None, "團隊週會 2025");
        wiki.add_page(Some(&old_root.id), "2025 W01 RD4 Team Report (1229-0102)");

        wiki.set_fail_copy(true);
        let outcome = run(&wiki, &chat, &config(), date(2026, 1, 5)).await;
        assert!(outcome.is_failed(), "{outcome:?}");
        let new_root = wiki
            .pages()
            .into_iter()
            .find(|p| p.page.title == "團隊週會 2026")
            .expect("2026 folder created by the failed run");
        assert!(wiki.child_titles(&new_root.page.id).is_empty());

        // The empty folder left behind must not block the next attempt.
        wiki.set_fail_copy(false);
        let outcome = run(&wiki, &chat, &config(), date(2026, 1, 5)).await;
        assert!(matches!(outcome, JobOutcome::Succeeded { .. }), "{outcome:?}");
        assert_eq!(
            wiki.child_titles(&new_root.page.id),
            vec!["2026 W02 RD4 Team Report (0105-0109)".to_string()]
        );
        let folders = wiki
            .pages()
            .into_iter()
            .filter(|p| p.page.title == "團隊週會 2026")
            .count();
        assert_eq!(folders, 1);
    }

    #[tokio::test]
    async fn test_no_reports_fails_and_reports() {
        let wiki = FakeWiki::new();
        let chat = FakeChat::new();
        wiki.add_page(None, "團隊週會 2025");

        let outcome = run(&wiki, &chat, &config(), date(2025, 6, 9)).await;
        match outcome {
            JobOutcome::Failed { error } => {
                assert!(error.contains("No weekly reports found"), "{error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        let messages = chat.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.starts_with("Error copying Confluence page"));
    }

    #[tokio::test]
    async fn test_copy_failure_with_unreachable_chat() {
        let wiki = FakeWiki::new();
        let chat = FakeChat::new();
        let root = wiki.add_page(None, "團隊週會 2025");
        wiki.add_page(Some(&root.id), "2025 W23 RD4 Team Report (0602-0606)");
        wiki.set_fail_copy(true);
        chat.set_fail_messages(true);

        let outcome = run(&wiki, &chat, &config(), date(2025, 6, 9)).await;
        assert!(outcome.is_failed());
        assert_eq!(wiki.child_titles(&root.id).len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_latest_title_is_not_guessed() {
        let wiki = FakeWiki::new();
        let root = wiki.add_page(None, "團隊週會 2025");
        // Has a range but no leading year, so it is not treated as a report.
        wiki.add_page(Some(&root.id), "Report (0602-0606)");

        let result =
            create_next_weekly_report(&wiki, &config().confluence_config, date(2025, 6, 9)).await;
        assert!(matches!(result, Err(JobError::NoReports(_))));
    }
}
