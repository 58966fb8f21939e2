//! Tests for CLI parsing and default paths.

use super::*;
use clap::CommandFactory;
use rstest::rstest;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn generate_defaults_to_the_manifest_filename() {
    let cli = Cli::parse_from(["repo-trust", "generate-manifest"]);
    assert_eq!(
        cli.command,
        Command::GenerateManifest(GenerateArgs {
            output: Utf8PathBuf::from("repo-trust-manifest.json"),
            sign: false,
        })
    );
}

#[test]
fn sign_derives_the_signature_path() {
    let cli = Cli::parse_from(["repo-trust", "sign", "dist/manifest.json"]);
    let Command::Sign(args) = cli.command else {
        panic!("expected sign");
    };
    assert_eq!(args.signature_path(), Utf8PathBuf::from("dist/manifest.json.sig"));
}

#[rstest]
#[case::implicit(&["repo-trust", "verify"], "repo-trust-manifest.json.sig")]
#[case::explicit(&["repo-trust", "verify", "--signature", "x.sig"], "x.sig")]
#[case::moved(&["repo-trust", "verify", "-m", "out/m.json"], "out/m.json.sig")]
fn verify_resolves_the_signature(#[case] argv: &[&str], #[case] expected: &str) {
    let cli = Cli::parse_from(argv);
    let Command::Verify(args) = cli.command else {
        panic!("expected verify");
    };
    assert_eq!(args.signature_path(), Utf8PathBuf::from(expected));
}

#[test]
fn verify_accepts_from_release() {
    let cli = Cli::parse_from(["repo-trust", "verify", "--from-release"]);
    assert!(matches!(cli.command, Command::Verify(VerifyArgs { from_release: true, .. })));
}

#[rstest]
#[case("verified", BadgeStatus::Verified)]
#[case("unverified", BadgeStatus::Unverified)]
#[case("error", BadgeStatus::Error)]
fn publish_parses_badge_status(#[case] value: &str, #[case] expected: BadgeStatus) {
    let cli = Cli::parse_from(["repo-trust", "publish", "--status", value]);
    assert_eq!(cli.command, Command::Publish(PublishArgs { status: expected }));
}

#[test]
fn publish_rejects_unknown_status() {
    assert!(Cli::try_parse_from(["repo-trust", "publish", "--status", "maybe"]).is_err());
}

#[test]
fn check_referrer_takes_an_optional_url() {
    let cli = Cli::parse_from([
        "repo-trust",
        "check-referrer",
        "--referrer",
        "https://github.com/octo/widgets",
    ]);
    assert_eq!(
        cli.command,
        Command::CheckReferrer(CheckReferrerArgs {
            referrer: Some("https://github.com/octo/widgets".to_owned()),
            countdown: false,
        })
    );
}

#[test]
fn a_subcommand_is_required() {
    assert!(Cli::try_parse_from(["repo-trust"]).is_err());
}
