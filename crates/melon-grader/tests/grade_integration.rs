//! End-to-end grading runs against real servers on loopback.

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use melon_grader::{
    CandidateDescriptor, CandidateStatus, CaseOutcome, CaseStatus, GradeReport, Grader,
    GraderConfig, LoadedCandidate, ScenarioCase, MELON_LOOKUP,
};
use tokio::net::TcpListener;
use ubermelon::pages::homepage;

const BUILTIN: &str = "[server]\nbuiltin = true\n";

fn quick_config() -> GraderConfig {
    GraderConfig {
        startup_timeout_secs: 2,
        poll_interval_ms: 20,
        ..GraderConfig::default()
    }
}

fn write_candidate(root: &Path, name: &str, manifest: Option<&str>, gitignore: Option<&str>) {
    let dir = root.join(name);
    fs::create_dir(&dir).unwrap();
    if let Some(manifest) = manifest {
        fs::write(dir.join("candidate.toml"), manifest).unwrap();
    }
    if let Some(gitignore) = gitignore {
        fs::write(dir.join(".gitignore"), gitignore).unwrap();
    }
}

async fn grade(root: &Path) -> GradeReport {
    Grader::new(quick_config()).grade_root(root).await.unwrap()
}

#[tokio::test]
async fn test_reference_candidate_passes_every_case() {
    let root = tempfile::tempdir().unwrap();
    write_candidate(root.path(), "alice", Some(BUILTIN), Some("target/\n"));

    let report = grade(root.path()).await;
    let alice = report.candidate("alice").unwrap();

    assert_eq!(alice.status, CandidateStatus::Graded);
    let names: Vec<&str> = alice.cases.iter().map(|c| c.case.as_str()).collect();
    let expected: Vec<&str> = ScenarioCase::ALL.iter().map(|c| c.name()).collect();
    assert_eq!(names, expected);

    for case in &alice.cases {
        assert!(case.passed(), "{} failed: {:?}", case.case, case);
    }
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_each_candidate_starts_from_fresh_state() {
    let root = tempfile::tempdir().unwrap();
    write_candidate(root.path(), "alice", Some(BUILTIN), Some("target/\n"));
    write_candidate(root.path(), "bob", Some(BUILTIN), Some("target/\n"));

    let report = grade(root.path()).await;

    // love_melon expects 585 loves; it would see 586 for bob if state leaked.
    for name in ["alice", "bob"] {
        let candidate = report.candidate(name).unwrap();
        assert!(candidate.case("love_melon").unwrap().passed(), "{}", name);
        assert!(candidate.case("melon_info").unwrap().passed(), "{}", name);
    }
}

#[tokio::test]
async fn test_unloadable_candidate_does_not_stop_the_run() {
    let root = tempfile::tempdir().unwrap();
    write_candidate(root.path(), "alice", None, Some("target/\n"));
    write_candidate(root.path(), "bob", Some(BUILTIN), Some("target/\n"));
    write_candidate(root.path(), "carol", Some("[server]\ncommand = [\"false\"]\n"), Some("x"));

    let report = grade(root.path()).await;

    let alice = report.candidate("alice").unwrap();
    assert!(matches!(
        &alice.status,
        CandidateStatus::Skipped { reason } if reason.contains("manifest not found")
    ));

    let carol = report.candidate("carol").unwrap();
    assert!(carol.is_skipped());

    let bob = report.candidate("bob").unwrap();
    assert_eq!(bob.cases.len(), ScenarioCase::ALL.len());
    assert_eq!(bob.failed_count(), 0);

    assert_eq!(report.summary.skipped_candidates, 2);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_missing_gitignore_fails_hard_check_only() {
    let root = tempfile::tempdir().unwrap();
    write_candidate(root.path(), "alice", Some(BUILTIN), None);

    let report = grade(root.path()).await;
    let alice = report.candidate("alice").unwrap();

    let gitignore = alice.case("gitignore_exists").unwrap();
    assert_eq!(gitignore.status, CaseStatus::Failed);
    assert!(gitignore.checks[0].hard);
    assert!(gitignore.aborted.is_some());

    assert_eq!(alice.failed_count(), 1);
}

#[tokio::test]
async fn test_empty_gitignore_fails() {
    let root = tempfile::tempdir().unwrap();
    write_candidate(root.path(), "alice", Some(BUILTIN), Some(""));

    let report = grade(root.path()).await;
    let case = report.candidate("alice").unwrap().case("gitignore_exists").unwrap();
    assert!(!case.passed());
    assert!(case.checks[0].message.contains("empty"));
}

const BROKEN_HOMEPAGE: &str = r#"<html><body>
<h1>Melons</h1>
<form action="/name" method="post"><input name="who"></form>
</body></html>"#;

async fn serve(router: Router) -> reqwest::Url {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move { axum::serve(listener, router).await });
    reqwest::Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap()
}

async fn serve_broken() -> reqwest::Url {
    serve(Router::new().route("/", get(|| async { Html(BROKEN_HOMEPAGE) }))).await
}

/// Grade an already running fixture server from a directory with a `.gitignore`.
async fn grade_fixture(name: &str, base: reqwest::Url) -> Vec<CaseOutcome> {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();
    let descriptor = CandidateDescriptor::new(name, dir.path());
    let candidate = LoadedCandidate::attach(descriptor, base).unwrap();

    let outcomes = Grader::new(quick_config()).run_scenario(&candidate).await;
    candidate.shutdown().await;
    outcomes
}

fn outcome<'a>(outcomes: &'a [CaseOutcome], case: &str) -> &'a CaseOutcome {
    outcomes.iter().find(|o| o.case == case).unwrap()
}

fn failed_labels(outcome: &CaseOutcome) -> Vec<&str> {
    outcome.failures().map(|c| c.label.as_str()).collect()
}

fn melon_block(greeting: &str, name: &str, loves: u64, image_url: &str) -> String {
    format!(
        concat!(
            "<text><div><h3>{}, this is a {}</h3>",
            "<h2>Loved by {} people</h2><img src=\"{}\"></div></text>\n",
        ),
        greeting, name, loves, image_url
    )
}

/// A candidate whose session handling works but whose melon list is wrong.
fn wrong_melons_router(top_melons: String) -> Router {
    Router::new()
        .route(
            "/",
            get(|headers: HeaderMap| async move {
                if headers.contains_key(COOKIE) {
                    Redirect::to("/top-melons").into_response()
                } else {
                    Html(homepage()).into_response()
                }
            }),
        )
        .route(
            "/get-name",
            get(|| async {
                (
                    [(SET_COOKIE, "session=named; Path=/")],
                    Redirect::to("/top-melons"),
                )
            }),
        )
        .route("/top-melons", get(move || async move { Html(top_melons) }))
}

#[tokio::test]
async fn test_soft_failures_are_all_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();
    let descriptor = CandidateDescriptor::new("broken", dir.path());
    let candidate = LoadedCandidate::attach(descriptor, serve_broken().await).unwrap();

    let grader = Grader::new(quick_config());
    let outcomes = grader.run_scenario(&candidate).await;
    candidate.shutdown().await;

    let by_name = |name: &str| outcomes.iter().find(|o| o.case == name).unwrap();

    assert!(by_name("gitignore_exists").passed());
    assert!(!by_name("homepage_h1").passed());
    assert!(!by_name("homepage_img").passed());

    let form = by_name("homepage_form");
    assert_eq!(form.status, CaseStatus::Failed);
    assert!(form.aborted.is_none());
    let failed: Vec<&str> = form.failures().map(|c| c.label.as_str()).collect();
    assert_eq!(
        failed,
        vec![
            "form action is /get-name",
            "form method is get",
            "form input is marked as required"
        ]
    );

    // /get-name is a 404 here, so the hard redirect check ends the case.
    let get_name = by_name("get_name");
    assert!(get_name.aborted.as_deref().unwrap().contains("redirects to /top-melons"));
    assert!(!by_name("redirect_when_logged_in").passed());
}

#[tokio::test]
async fn test_report_json_written() {
    let root = tempfile::tempdir().unwrap();
    write_candidate(root.path(), "alice", Some(BUILTIN), Some("target/\n"));

    let report = grade(root.path()).await;
    let out = tempfile::NamedTempFile::new().unwrap();
    report.write_json(out.path()).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path()).unwrap()).unwrap();
    assert_eq!(raw["schema_version"], "1.0");
    assert_eq!(raw["test_user"], "Test User");
    assert_eq!(raw["summary"]["passed_cases"], ScenarioCase::ALL.len());
    assert_eq!(raw["candidates"][0]["status"]["state"], "graded");
}

#[tokio::test]
async fn test_wrong_melon_list_reports_every_mismatch() {
    let [cren, jubi, sugb, _] = MELON_LOOKUP;
    let mut page = String::from("<html><body><h1>Our Most Loved Melons</h1>\n");
    page.push_str(&melon_block("Test User", cren.name, 1, cren.image_url));
    let wrong_image = "http://example.com/jubilee.jpg";
    page.push_str(&melon_block("Test User", jubi.name, jubi.loves, wrong_image));
    page.push_str(&melon_block("Somebody", "Kiwi", 3, sugb.image_url));
    page.push_str(&melon_block("Test User", cren.name, cren.loves, cren.image_url));
    page.push_str("</body></html>");

    let outcomes = grade_fixture("wrong", serve(wrong_melons_router(page)).await).await;

    assert!(outcome(&outcomes, "get_name").passed());
    assert!(outcome(&outcomes, "redirect_when_logged_in").passed());
    assert!(outcome(&outcomes, "melon_images").passed());
    assert_eq!(
        failed_labels(outcome(&outcomes, "top_melon_greeting")),
        vec!["/top-melons heading greets Test User"]
    );
    assert_eq!(
        failed_labels(outcome(&outcomes, "melon_greetings")),
        vec!["melon block 3 greets Test User"]
    );

    let info = outcome(&outcomes, "melon_info");
    assert_eq!(info.status, CaseStatus::Failed);
    assert!(info.aborted.is_none());
    assert_eq!(
        failed_labels(info),
        vec![
            "Crenshaw has the right love count",
            "Jubilee Watermelon uses the correct image",
            "Kiwi is one of our melons",
            "listed melons are exactly our four melons",
        ]
    );
    // The duplicated Crenshaw block on its own is fine; only the set check catches it.
    let crenshaw_checks = info
        .checks
        .iter()
        .filter(|c| c.label == "Crenshaw is one of our melons")
        .count();
    assert_eq!(crenshaw_checks, 2);

    // No /love-melon route: the post fails and the count does not move.
    assert_eq!(
        failed_labels(outcome(&outcomes, "love_melon")),
        vec!["loving Crenshaw succeeds", "Crenshaw gained one love"]
    );
}

#[tokio::test]
async fn test_melon_block_without_h2_aborts_melon_info() {
    let cren = MELON_LOOKUP[0];
    let page = format!(
        "<html><body><h1>Test User's Most Loved Melons</h1>\
         <text><div><h3>Test User, this is a {}</h3><img src=\"{}\"></div></text></body></html>",
        cren.name, cren.image_url
    );

    let outcomes = grade_fixture("no-h2", serve(wrong_melons_router(page)).await).await;

    assert!(outcome(&outcomes, "top_melon_greeting").passed());
    assert!(outcome(&outcomes, "melon_greetings").passed());

    let info = outcome(&outcomes, "melon_info");
    assert_eq!(info.status, CaseStatus::Failed);
    assert!(info.checks.is_empty());
    assert_eq!(info.aborted.as_deref(), Some("missing element: h2 in melon block 1"));
}

#[tokio::test]
async fn test_cookie_from_homepage_does_not_count_as_session() {
    let router = Router::new()
        .route(
            "/",
            get(|| async { ([(SET_COOKIE, "visited=1; Path=/")], Html(homepage())) }),
        )
        .route("/get-name", get(|| async { Redirect::to("/top-melons") }));

    let outcomes = grade_fixture("forgetful", serve(router).await).await;

    let get_name = outcome(&outcomes, "get_name");
    assert_eq!(get_name.status, CaseStatus::Failed);
    assert!(get_name.aborted.is_none());
    assert_eq!(failed_labels(get_name), vec!["visitor name stored in a session cookie"]);
    assert_eq!(get_name.checks[0].message, "/get-name issued no cookie");
}
