#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{garep_cmd, write_mock_config};

async fn mount_discovery(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/discovery/v4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "analyticsreporting",
            "version": "v4",
            "rootUrl": format!("{}/", server.uri()),
            "servicePath": "",
            "resources": {"reports": {"methods": {
                "batchGet": {"path": "v4/reports:batchGet", "httpMethod": "POST"}
            }}}
        })))
        .mount(server)
        .await;
}

fn page(day: &str, users: &str, next: Option<&str>) -> Value {
    let mut report = json!({
        "columnHeader": {
            "dimensions": ["ga:date"],
            "metricHeader": {"metricHeaderEntries": [{"name": "ga:users", "type": "INTEGER"}]}
        },
        "data": {
            "rows": [{"dimensions": [day], "metrics": [{"values": [users]}]}],
            "isDataGolden": true
        }
    });
    if let Some(next) = next {
        report["nextPageToken"] = json!(next);
    }
    json!({"reports": [report]})
}

#[tokio::test]
async fn report_prints_every_page() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    write_mock_config(dir.path(), &server.uri());

    Mock::given(method("POST"))
        .and(path("/v4/reports:batchGet"))
        .and(body_string_contains("\"pageToken\":\"next\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("20200102", "4", None)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/reports:batchGet"))
        .and(header("authorization", "Bearer cli-token"))
        .and(body_string_contains("\"viewId\":\"222\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("20200101", "3", Some("next"))))
        .mount(&server)
        .await;

    garep_cmd(dir.path())
        .env("GAREP_ACCESS_TOKEN", "cli-token")
        .args([
            "report", "-m", "ga:users", "-d", "ga:date", "--start", "2020-01-01", "--end",
            "2020-01-02", "--app",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ga:date: 20200101\nDate range: 0\nga:users: 3\nga:date: 20200102",
        ));
    Ok(())
}

#[tokio::test]
async fn report_json_is_cached_by_prefix() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    write_mock_config(dir.path(), &server.uri());

    Mock::given(method("POST"))
        .and(path("/v4/reports:batchGet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("20200101", "3", None)))
        .expect(1)
        .mount(&server)
        .await;

    for _ in 0..2 {
        let output = garep_cmd(dir.path())
            .env("GAREP_ACCESS_TOKEN", "cli-token")
            .args([
                "report", "-m", "ga:users", "-d", "ga:date", "--start", "2020-01-01",
                "--cache-prefix", "users", "--format", "json",
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let value: Value = serde_json::from_slice(&output)?;
        assert_eq!(value["rowCount"], 1);
        assert_eq!(value["dateRange"], "2020-01-01 - 2020-01-01");
    }

    let stored: Vec<String> = std::fs::read_dir(dir.path().join("cache/dump"))?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    assert_eq!(stored.len(), 1, "{stored:?}");
    assert!(stored[0].starts_with("ga_users_111_2020-01-01_"), "{stored:?}");
    assert!(stored[0].ends_with("_2020-01-01.json"), "{stored:?}");
    Ok(())
}

#[tokio::test]
async fn report_cache_prefix_is_per_view() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    write_mock_config(dir.path(), &server.uri());

    Mock::given(method("POST"))
        .and(path("/v4/reports:batchGet"))
        .and(body_string_contains("\"viewId\":\"111\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("SITE", "1", None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/reports:batchGet"))
        .and(body_string_contains("\"viewId\":\"222\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(page("APP", "2", None)))
        .expect(1)
        .mount(&server)
        .await;

    let run = |app: bool| -> anyhow::Result<Value> {
        let mut args = vec![
            "report", "-m", "ga:users", "-d", "ga:date", "--start", "2020-01-01", "--end",
            "2020-01-31", "--cache-prefix", "users", "--format", "json",
        ];
        if app {
            args.push("--app");
        }
        let output = garep_cmd(dir.path())
            .env("GAREP_ACCESS_TOKEN", "cli-token")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        Ok(serde_json::from_slice(&output)?)
    };

    let site = run(false)?;
    let app = run(true)?;
    assert_eq!(site["rows"][0]["dimensions"][0], "SITE");
    assert_eq!(app["rows"][0]["dimensions"][0], "APP");

    assert_eq!(run(false)?["rows"][0]["dimensions"][0], "SITE");
    assert_eq!(run(true)?["rows"][0]["dimensions"][0], "APP");
    Ok(())
}

#[tokio::test]
async fn report_golden_only_without_rows_is_not_cached() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    write_mock_config(dir.path(), &server.uri());

    let mut stale = page("20200101", "3", None);
    stale["reports"][0]["data"]["isDataGolden"] = json!(false);
    Mock::given(method("POST"))
        .and(path("/v4/reports:batchGet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stale))
        .expect(2)
        .mount(&server)
        .await;

    for _ in 0..2 {
        garep_cmd(dir.path())
            .env("GAREP_ACCESS_TOKEN", "cli-token")
            .args([
                "report", "-m", "ga:users", "--start", "2020-01-01", "--golden-only",
                "--cache-prefix", "users", "--format", "json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"rowCount\": 0"));
    }

    let stored = std::fs::read_dir(dir.path().join("cache/dump"))
        .map(Iterator::count)
        .unwrap_or(0);
    assert_eq!(stored, 0);
    Ok(())
}

#[tokio::test]
async fn report_api_error_fails() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    write_mock_config(dir.path(), &server.uri());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "User does not have sufficient permissions for this profile."}
        })))
        .mount(&server)
        .await;

    garep_cmd(dir.path())
        .env("GAREP_ACCESS_TOKEN", "cli-token")
        .args(["report", "-m", "ga:users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sufficient permissions"));
    Ok(())
}

#[test]
fn report_without_credentials_fails() -> anyhow::Result<()> {
    let dir = tempdir()?;

    garep_cmd(dir.path())
        .args(["report", "-m", "ga:users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No credentials configured"));
    Ok(())
}

#[test]
fn report_rejects_bad_dates() -> anyhow::Result<()> {
    let dir = tempdir()?;

    garep_cmd(dir.path())
        .env("GAREP_ACCESS_TOKEN", "cli-token")
        .args(["report", "-m", "ga:users", "--start", "31/01/2020"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
    Ok(())
}

#[tokio::test]
async fn discovery_prints_batch_get_url() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    write_mock_config(dir.path(), &server.uri());

    garep_cmd(dir.path())
        .args(["discovery"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "batchGet: {}/v4/reports:batchGet",
            server.uri()
        )));

    let cached = std::fs::read_dir(dir.path().join("cache/discovery"))?.count();
    assert_eq!(cached, 1);
    Ok(())
}
