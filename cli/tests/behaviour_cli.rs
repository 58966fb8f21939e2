//! End-to-end behaviour tests for the `repo-trust` binary.
//!
//! Each scenario runs the binary in a scratch directory with a clean
//! environment. No scenario reaches the network.

use repo_trust::test_utils::{KeyFixture, TestKey, sample_manifest};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::fs;
use std::process::{Command, Output};

#[derive(Default)]
struct CliWorld {
    keys: RefCell<Option<KeyFixture>>,
    env: RefCell<Vec<(String, String)>>,
    output: RefCell<Option<Output>>,
}

#[fixture]
fn cli_world() -> CliWorld {
    CliWorld::default()
}

impl CliWorld {
    fn set_env(&self, name: &str, value: &str) {
        let mut env = self.env.borrow_mut();
        env.retain(|(key, _)| key != name);
        env.push((name.to_owned(), value.to_owned()));
    }

    fn with_keys<T>(&self, body: impl FnOnce(&KeyFixture) -> T) -> T {
        let keys = self.keys.borrow();
        body(keys.as_ref().expect("workspace prepared"))
    }

    fn output(&self) -> std::cell::Ref<'_, Output> {
        std::cell::Ref::map(self.output.borrow(), |output| {
            output.as_ref().expect("command has run")
        })
    }
}

#[given("a workspace with a manifest for \"{repository}\"")]
fn given_workspace(cli_world: &CliWorld, repository: String) {
    let keys = KeyFixture::new(TestKey::Release);
    let json = sample_manifest(&repository)
        .to_canonical_json()
        .expect("serialize");
    fs::write(keys.root().join("repo-trust-manifest.json"), json).expect("write manifest");
    cli_world.keys.replace(Some(keys));
}

#[given("the repository is \"{repository}\"")]
fn given_repository(cli_world: &CliWorld, repository: String) {
    cli_world.set_env("GITHUB_REPOSITORY", &repository);
}

#[given("the signing key is configured")]
fn given_key(cli_world: &CliWorld) {
    let path = cli_world.with_keys(|keys| keys.key_path());
    cli_world.set_env("REPO_TRUST_KEY_PATH", path.as_str());
}

#[given("the allowed signers list is configured")]
fn given_allowed_signers(cli_world: &CliWorld) {
    let path = cli_world.with_keys(|keys| keys.allowed_signers_path());
    cli_world.set_env("REPO_TRUST_ALLOWED_SIGNERS", path.as_str());
}

#[given("the environment variable \"{name}\" is \"{value}\"")]
fn given_env(cli_world: &CliWorld, name: String, value: String) {
    cli_world.set_env(&name, &value);
}

#[when("I run repo-trust \"{args}\"")]
fn when_run(cli_world: &CliWorld, args: String) {
    let root = cli_world.with_keys(|keys| keys.root().to_owned());
    let output = Command::new(env!("CARGO_BIN_EXE_repo-trust"))
        .args(args.split_whitespace())
        .current_dir(root.as_std_path())
        .env_clear()
        .envs(cli_world.env.borrow().iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .output()
        .expect("failed to run repo-trust");
    cli_world.output.replace(Some(output));
}

#[then("the exit code is {code:i32}")]
fn then_exit_code(cli_world: &CliWorld, code: i32) {
    let output = cli_world.output();
    assert_eq!(
        output.status.code(),
        Some(code),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[then("stderr mentions \"{text}\"")]
fn then_stderr(cli_world: &CliWorld, text: String) {
    let stderr = String::from_utf8_lossy(&cli_world.output().stderr).into_owned();
    assert!(stderr.contains(&text), "stderr was: {stderr}");
}

#[then("stdout mentions \"{text}\"")]
fn then_stdout(cli_world: &CliWorld, text: String) {
    let stdout = String::from_utf8_lossy(&cli_world.output().stdout).into_owned();
    assert!(stdout.contains(&text), "stdout was: {stdout}");
}

#[then("the decision level is \"{level}\"")]
fn then_level(cli_world: &CliWorld, level: String) {
    let stdout = String::from_utf8_lossy(&cli_world.output().stdout).into_owned();
    assert!(
        stdout.contains(&format!("\"level\": \"{level}\"")),
        "stdout was: {stdout}"
    );
}

#[scenario(path = "tests/features/cli.feature", index = 0)]
fn sign_without_key(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 1)]
fn sign_then_verify(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 2)]
fn replayed_manifest(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 3)]
fn unknown_signer(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 4)]
fn no_referrer(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", index = 5)]
fn other_repository_referrer(cli_world: CliWorld) {
    let _ = cli_world;
}
