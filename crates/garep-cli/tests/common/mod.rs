#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::time::Duration;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Create a `garep` command isolated from the user's configuration.
///
/// Every path the binary could touch points into `dir`.
#[allow(dead_code)]
pub fn garep_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("garep"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("GAREP_CONFIG", dir.join("config.toml"));
    cmd.env("GAREP_CACHE_DIR", dir.join("cache"));
    cmd.env_remove("GAREP_KEY_PATH");
    cmd.env_remove("GAREP_ACCESS_TOKEN");
    cmd.env_remove("GAREP_SITE_VIEW_ID");
    cmd.env_remove("GAREP_APP_VIEW_ID");
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Write a config pointing discovery at `server_uri`.
#[allow(dead_code)]
pub fn write_mock_config(dir: &Path, server_uri: &str) {
    let config = format!(
        r#"[views]
site_view_id = "111"
app_view_id = "222"

[retry]
attempts = 0
delay_secs = 1

[api]
discovery_url_v4 = "{server_uri}/discovery/v4"
discovery_url_v3 = "{server_uri}/discovery/v3"
timeout_secs = 10
"#
    );
    std::fs::write(dir.join("config.toml"), config).expect("write config");
}
