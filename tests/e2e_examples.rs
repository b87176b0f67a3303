mod common;

use common::{CommandOutput, TestContext};

#[cfg(feature = "e2e")]
fn live(ctx: &TestContext, args: &[&str]) -> CommandOutput {
    ctx.cmd()
        .env_remove("FLUTTERVER_FEED_URL")
        .args(args)
        .output()
        .expect("Failed to run flutterver")
        .into()
}

#[test]
#[cfg(feature = "e2e")]
fn e2e_list_stable_releases() {
    let ctx = TestContext::new();

    // Example: flutterver releases -n 5
    live(&ctx, &["releases", "-n", "5"])
        .assert_success()
        .assert_stdout_contains("stable releases")
        .assert_stdout_contains("(current)");
}

#[test]
#[cfg(feature = "e2e")]
fn e2e_list_beta_releases_with_details() {
    let ctx = TestContext::new();

    // Example: flutterver releases --beta --details
    live(&ctx, &["releases", "--beta", "--details", "-n", "3"])
        .assert_success()
        .assert_stdout_contains("beta releases")
        .assert_stdout_contains("SHA-256");
}

#[test]
#[cfg(feature = "e2e")]
fn e2e_install_and_use_partial_version() {
    let ctx = TestContext::new();

    // Example: flutterver install 3.10
    live(&ctx, &["install", "3.10"])
        .assert_success()
        .assert_stdout_contains("Flutter SDK 3.10.6 is installed");

    // Example: flutterver use 3.10
    live(&ctx, &["use", "3.10"])
        .assert_success()
        .assert_stdout_contains("Now using Flutter SDK 3.10.6");

    #[cfg(unix)]
    assert!(ctx
        .alias
        .join("flutter")
        .join("bin")
        .join("flutter")
        .is_file());
}

#[test]
#[cfg(feature = "e2e")]
fn e2e_unknown_minor_has_no_matching_release() {
    let ctx = TestContext::new();

    // Example: flutterver install 3.99
    live(&ctx, &["install", "3.99"])
        .assert_failure()
        .assert_stderr_contains("No release matches '3.99'");
}

#[test]
#[cfg(feature = "e2e")]
fn e2e_config_lifecycle() {
    let ctx = TestContext::new();

    // Example: flutterver config set feed-url=https://example.invalid/releases.json
    live(
        &ctx,
        &["config", "set", "feed-url=https://example.invalid/releases.json"],
    )
    .assert_success();

    // Example: flutterver config get feed-url
    live(&ctx, &["config", "get", "feed-url"])
        .assert_success()
        .assert_stdout_contains("example.invalid");

    // Example: flutterver config unset feed-url
    live(&ctx, &["config", "unset", "feed-url"]).assert_success();
    live(&ctx, &["config", "get", "feed-url"])
        .assert_success()
        .assert_stdout_contains("flutter_infra_release");
}
