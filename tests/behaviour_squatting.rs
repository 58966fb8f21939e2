//! Behaviour-driven tests for referrer-based squatting detection.

use repo_trust::identity::RepositoryIdentity;
use repo_trust::squatting::{
    AncestryOracle, CancellationToken, ComparisonStatus, ExpectedRepository, RedirectCountdown,
    SquattingDetector, Tick, TrustDecision, TrustLevel,
};
use repo_trust::transfer::TransferError;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::collections::HashSet;

/// Answers comparisons from a fixed set of commits in official history.
#[derive(Default)]
struct History {
    branch: RefCell<String>,
    official: RefCell<HashSet<String>>,
}

impl AncestryOracle for History {
    fn default_branch(&self, _repository: &RepositoryIdentity) -> Result<String, TransferError> {
        Ok(self.branch.borrow().clone())
    }

    fn compare(
        &self,
        _repository: &RepositoryIdentity,
        base: &str,
        head: &str,
    ) -> Result<ComparisonStatus, TransferError> {
        assert_eq!(head, self.branch.borrow().as_str());
        if self.official.borrow().contains(base) {
            Ok(ComparisonStatus::Identical)
        } else {
            Err(TransferError::NotFound {
                url: format!("compare/{base}...{head}"),
            })
        }
    }
}

#[derive(Default)]
struct SquattingWorld {
    expected: RefCell<Option<ExpectedRepository>>,
    history: History,
    decision: RefCell<Option<TrustDecision>>,
    outcome: RefCell<Option<Tick>>,
}

#[fixture]
fn squatting_world() -> SquattingWorld {
    SquattingWorld::default()
}

fn evaluate(squatting_world: &SquattingWorld, referrer: Option<&str>) {
    let expected = squatting_world.expected.borrow();
    let expected = expected.as_ref().expect("expected repository set");
    let decision = SquattingDetector::new(expected, &squatting_world.history).evaluate(referrer);
    squatting_world.decision.replace(Some(decision));
}

#[given("the expected repository \"{repository}\" with default branch \"{branch}\"")]
fn given_expected(squatting_world: &SquattingWorld, repository: String, branch: String) {
    let identity = RepositoryIdentity::parse(&repository).expect("identity");
    let expected =
        ExpectedRepository::new(identity, "https://github.com", "github.io").expect("expected");
    squatting_world.expected.replace(Some(expected));
    squatting_world.history.branch.replace(branch);
}

#[given("commit \"{sha}\" is the default branch tip")]
fn given_tip(squatting_world: &SquattingWorld, sha: String) {
    squatting_world.history.official.borrow_mut().insert(sha);
}

#[when("a visitor arrives from \"{referrer}\"")]
fn when_arrives(squatting_world: &SquattingWorld, referrer: String) {
    evaluate(squatting_world, Some(&referrer));
}

#[when("a visitor arrives without a referrer")]
fn when_arrives_directly(squatting_world: &SquattingWorld) {
    evaluate(squatting_world, None);
}

#[when("the visitor cancels the redirect after {ticks:usize} ticks")]
fn when_cancelled(squatting_world: &SquattingWorld, ticks: usize) {
    let decision = squatting_world.decision.borrow();
    let plan = decision
        .as_ref()
        .and_then(|d| d.redirect.clone())
        .expect("redirect scheduled");
    let token = CancellationToken::new();
    let handle = token.clone();
    let mut seen = 0;
    let outcome = RedirectCountdown::new(plan, token).run(
        |_| {},
        |_| {
            seen += 1;
            if seen == ticks {
                handle.cancel();
            }
        },
    );
    squatting_world.outcome.replace(Some(outcome));
}

fn level_named(name: &str) -> TrustLevel {
    match name {
        "verified" => TrustLevel::Verified,
        "warning" => TrustLevel::Warning,
        "indeterminate" => TrustLevel::Indeterminate,
        other => panic!("unknown level {other}"),
    }
}

#[then("the decision is {level}")]
fn then_level(squatting_world: &SquattingWorld, level: String) {
    let decision = squatting_world.decision.borrow();
    assert_eq!(
        decision.as_ref().expect("decided").level,
        level_named(&level)
    );
}

#[then("a redirect is scheduled to \"{target}\"")]
fn then_redirect(squatting_world: &SquattingWorld, target: String) {
    let decision = squatting_world.decision.borrow();
    let redirect = decision
        .as_ref()
        .and_then(|d| d.redirect.as_ref())
        .expect("redirect scheduled");
    assert_eq!(redirect.target, target);
}

#[then("no redirect is scheduled")]
fn then_no_redirect(squatting_world: &SquattingWorld) {
    let decision = squatting_world.decision.borrow();
    assert!(decision.as_ref().expect("decided").redirect.is_none());
}

#[then("the redirect never navigates")]
fn then_never_navigates(squatting_world: &SquattingWorld) {
    assert_eq!(*squatting_world.outcome.borrow(), Some(Tick::Cancelled));
}

#[scenario(path = "tests/features/squatting.feature", index = 0)]
fn scenario_default_branch_tip(squatting_world: SquattingWorld) {
    let _ = squatting_world;
}

#[scenario(path = "tests/features/squatting.feature", index = 1)]
fn scenario_fork_only_commit(squatting_world: SquattingWorld) {
    let _ = squatting_world;
}

#[scenario(path = "tests/features/squatting.feature", index = 2)]
fn scenario_no_referrer(squatting_world: SquattingWorld) {
    let _ = squatting_world;
}

#[scenario(path = "tests/features/squatting.feature", index = 3)]
fn scenario_unrelated_site(squatting_world: SquattingWorld) {
    let _ = squatting_world;
}

#[scenario(path = "tests/features/squatting.feature", index = 4)]
fn scenario_cancelled_redirect(squatting_world: SquattingWorld) {
    let _ = squatting_world;
}
