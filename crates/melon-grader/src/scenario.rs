//! The fixed UberMelon grading scenario.
//!
//! Cases run in [`ScenarioCase::ALL`] order against one client. They share the
//! candidate's session: `get_name` logs the test user in and every later case
//! relies on that, so running a later case alone gives different results.

use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::check::{CaseError, CaseOutcome, CheckContext};
use crate::client::Page;
use crate::config::GraderConfig;
use crate::html::{attr, capture, child, text, Document};
use crate::launcher::LoadedCandidate;

/// Headings accepted on the homepage.
pub const HOMEPAGE_TITLES: [&str; 2] = [
    "UberMelon's Most Loved Melons",
    "UberMelon\u{2019}s Most Loved Melons",
];

/// Pulls the melon name out of a block's `h3`.
pub const MELON_NAME_PATTERN: &str = r"this is a\s+(?P<melon_name>.*)";

/// Pulls the love count out of a block's `h2`.
pub const LOVE_COUNT_PATTERN: &str = r"\s+(?P<num_loves>\d+)\s+";

/// A melon every candidate must list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedMelon {
    pub name: &'static str,
    pub image_url: &'static str,
    pub loves: u64,
}

/// The catalogue candidates must serve, in display order.
pub const MELON_LOOKUP: [ExpectedMelon; 4] = [
    ExpectedMelon {
        name: "Crenshaw",
        image_url: "http://www.rareseeds.com/assets/1/14/DimRegular/crenshaw.jpg",
        loves: 584,
    },
    ExpectedMelon {
        name: "Jubilee Watermelon",
        image_url: "http://www.rareseeds.com/assets/1/14/DimThumbnail/Jubilee-Watermelon-web.jpg",
        loves: 601,
    },
    ExpectedMelon {
        name: "Sugar Baby Watermelon",
        image_url: "http://www.rareseeds.com/assets/1/14/DimThumbnail/Sugar-Baby-Watermelon-web.jpg",
        loves: 587,
    },
    ExpectedMelon {
        name: "Texas Golden Watermelon",
        image_url: "http://www.rareseeds.com/assets/1/14/DimThumbnail/Texas-Golden-2-Watermelon-web.jpg",
        loves: 598,
    },
];

/// Melon id posted by `love_melon` when the page has no love form to read it from.
const FALLBACK_LOVE_ID: &str = "cren";

/// Scenario cases, in run order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCase {
    GitignoreExists,
    HomepageH1,
    HomepageImg,
    HomepageForm,
    GetName,
    RedirectWhenLoggedIn,
    TopMelonGreeting,
    MelonImages,
    MelonGreetings,
    MelonInfo,
    LoveMelon,
}

impl ScenarioCase {
    pub const ALL: [ScenarioCase; 11] = [
        ScenarioCase::GitignoreExists,
        ScenarioCase::HomepageH1,
        ScenarioCase::HomepageImg,
        ScenarioCase::HomepageForm,
        ScenarioCase::GetName,
        ScenarioCase::RedirectWhenLoggedIn,
        ScenarioCase::TopMelonGreeting,
        ScenarioCase::MelonImages,
        ScenarioCase::MelonGreetings,
        ScenarioCase::MelonInfo,
        ScenarioCase::LoveMelon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioCase::GitignoreExists => "gitignore_exists",
            ScenarioCase::HomepageH1 => "homepage_h1",
            ScenarioCase::HomepageImg => "homepage_img",
            ScenarioCase::HomepageForm => "homepage_form",
            ScenarioCase::GetName => "get_name",
            ScenarioCase::RedirectWhenLoggedIn => "redirect_when_logged_in",
            ScenarioCase::TopMelonGreeting => "top_melon_greeting",
            ScenarioCase::MelonImages => "melon_images",
            ScenarioCase::MelonGreetings => "melon_greetings",
            ScenarioCase::MelonInfo => "melon_info",
            ScenarioCase::LoveMelon => "love_melon",
        }
    }

    /// Run this case against a loaded candidate.
    pub async fn run(self, candidate: &LoadedCandidate, config: &GraderConfig) -> CaseOutcome {
        let env = ScenarioEnv { candidate, config };
        let mut checks = CheckContext::new(self.name());
        let result = match self {
            ScenarioCase::GitignoreExists => gitignore_exists(&env, &mut checks).await,
            ScenarioCase::HomepageH1 => homepage_h1(&env, &mut checks).await,
            ScenarioCase::HomepageImg => homepage_img(&env, &mut checks).await,
            ScenarioCase::HomepageForm => homepage_form(&env, &mut checks).await,
            ScenarioCase::GetName => get_name(&env, &mut checks).await,
            ScenarioCase::RedirectWhenLoggedIn => redirect_when_logged_in(&env, &mut checks).await,
            ScenarioCase::TopMelonGreeting => top_melon_greeting(&env, &mut checks).await,
            ScenarioCase::MelonImages => melon_images(&env, &mut checks).await,
            ScenarioCase::MelonGreetings => melon_greetings(&env, &mut checks).await,
            ScenarioCase::MelonInfo => melon_info(&env, &mut checks).await,
            ScenarioCase::LoveMelon => love_melon(&env, &mut checks).await,
        };
        checks.finish(result)
    }
}

/// Deterministic digest of the ordered case names.
pub fn scenario_digest(cases: &[ScenarioCase]) -> String {
    let mut hasher = Sha256::new();
    for case in cases {
        hasher.update(case.name().as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

struct ScenarioEnv<'a> {
    candidate: &'a LoadedCandidate,
    config: &'a GraderConfig,
}

impl ScenarioEnv<'_> {
    async fn get(&self, path: &str) -> Result<Page, CaseError> {
        self.candidate.client().get(path).await
    }

    fn test_user(&self) -> &str {
        &self.config.test_user
    }
}

fn describe(page: &Page) -> String {
    match &page.location {
        Some(location) => format!("status {}, location {}", page.status, location),
        None => format!("status {}, no location", page.status),
    }
}

async fn gitignore_exists(
    env: &ScenarioEnv<'_>,
    checks: &mut CheckContext,
) -> Result<(), CaseError> {
    let file = &env.config.ignore_file;
    let path = env.candidate.descriptor().join(file);
    let (ok, message) = match tokio::fs::metadata(&path).await {
        Ok(meta) if !meta.is_file() => (false, format!("{} is not a file", path.display())),
        Ok(meta) if meta.len() == 0 => (false, format!("{} is empty", path.display())),
        Ok(meta) => (true, format!("{} bytes", meta.len())),
        Err(_) => (false, format!("{} not found", path.display())),
    };
    checks.hard(format!("{} exists and is not empty", file), ok, message)
}

async fn homepage_h1(env: &ScenarioEnv<'_>, checks: &mut CheckContext) -> Result<(), CaseError> {
    let page = env.get("/").await?;
    let doc = Document::parse(&page.body);

    if let Some(h1) = checks.soft_some("homepage has an h1", doc.first("h1")?) {
        let heading = text(h1);
        checks.soft(
            "homepage heading is UberMelon's Most Loved Melons",
            HOMEPAGE_TITLES.contains(&heading.trim()),
            format!("found {:?}", heading),
        );
    }
    Ok(())
}

async fn homepage_img(env: &ScenarioEnv<'_>, checks: &mut CheckContext) -> Result<(), CaseError> {
    let page = env.get("/").await?;
    let images = Document::parse(&page.body).count("img")?;
    checks.soft(
        "homepage has at least one image",
        images >= 1,
        format!("{} image(s)", images),
    );
    Ok(())
}

async fn homepage_form(env: &ScenarioEnv<'_>, checks: &mut CheckContext) -> Result<(), CaseError> {
    let page = env.get("/").await?;
    let doc = Document::parse(&page.body);

    let Some(form) = checks.soft_some("homepage has a get-name form", doc.first("form")?) else {
        return Ok(());
    };
    checks.soft_eq("form action is /get-name", attr(form, "action"), Some("/get-name"));
    let method = attr(form, "method").unwrap_or("get").to_lowercase();
    checks.soft_eq("form method is get", method.as_str(), "get");

    if let Some(input) = checks.soft_some("form has an input", child(form, "input")?) {
        checks.soft_some("form input is marked as required", attr(input, "required"));
    }
    Ok(())
}

/// Name of the homepage form's first input.
fn form_input_name(body: &str) -> Result<String, CaseError> {
    let doc = Document::parse(body);
    let form = doc.require("form")?;
    let input = child(form, "input")?
        .ok_or_else(|| CaseError::MissingElement("form input".to_string()))?;
    attr(input, "name")
        .map(str::to_string)
        .ok_or_else(|| CaseError::MissingElement("form input name attribute".to_string()))
}

async fn get_name(env: &ScenarioEnv<'_>, checks: &mut CheckContext) -> Result<(), CaseError> {
    let homepage = env.get("/").await?;
    let input_name = form_input_name(&homepage.body)?;

    let client = env.candidate.client();
    let before = client.cookie_header();
    let page = client
        .get_with_query("/get-name", &[(input_name.as_str(), env.test_user())])
        .await?;
    let after = client.cookie_header();

    let jar_changed = after.is_some() && after != before;
    let message = if page.sets_cookie {
        "/get-name set a cookie"
    } else if jar_changed {
        "cookie jar changed"
    } else {
        "/get-name issued no cookie"
    };
    checks.soft(
        "visitor name stored in a session cookie",
        page.sets_cookie || jar_changed,
        message,
    );
    checks.hard(
        "setting the name redirects to /top-melons",
        page.redirects_to("/top-melons"),
        describe(&page),
    )
}

async fn redirect_when_logged_in(
    env: &ScenarioEnv<'_>,
    checks: &mut CheckContext,
) -> Result<(), CaseError> {
    let page = env.get("/").await?;
    checks.hard(
        "homepage redirects to /top-melons once the name is set",
        page.redirects_to("/top-melons"),
        describe(&page),
    )
}

async fn top_melon_greeting(
    env: &ScenarioEnv<'_>,
    checks: &mut CheckContext,
) -> Result<(), CaseError> {
    let page = env.get("/top-melons").await?;
    let doc = Document::parse(&page.body);

    if let Some(h1) = checks.soft_some("/top-melons has an h1", doc.first("h1")?) {
        let heading = text(h1);
        checks.soft(
            format!("/top-melons heading greets {}", env.test_user()),
            heading.contains(env.test_user()),
            format!("found {:?}", heading),
        );
    }
    Ok(())
}

async fn melon_images(env: &ScenarioEnv<'_>, checks: &mut CheckContext) -> Result<(), CaseError> {
    let page = env.get("/top-melons").await?;
    let images = Document::parse(&page.body).count("img")?;
    checks.soft_eq("/top-melons has four images", images, MELON_LOOKUP.len());
    Ok(())
}

async fn melon_greetings(
    env: &ScenarioEnv<'_>,
    checks: &mut CheckContext,
) -> Result<(), CaseError> {
    let page = env.get("/top-melons").await?;
    let doc = Document::parse(&page.body);

    for (index, block) in doc.all("text")?.into_iter().enumerate() {
        let label = format!("melon block {} greets {}", index + 1, env.test_user());
        match child(block, "h3")? {
            Some(h3) => {
                let heading = text(h3);
                checks.soft(
                    label,
                    heading.starts_with(env.test_user()),
                    format!("found {:?}", heading),
                );
            }
            None => {
                checks.soft(label, false, "block has no h3");
            }
        }
    }
    Ok(())
}

/// What one melon block on `/top-melons` says.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScrapedMelon {
    name: String,
    loves: u64,
    image_url: Option<String>,
    love_id: Option<String>,
}

fn read_block(index: usize, block: ElementRef<'_>) -> Result<ScrapedMelon, CaseError> {
    let missing =
        |what: &str| CaseError::MissingElement(format!("{} in melon block {}", what, index));

    let heading = text(child(block, "h3")?.ok_or_else(|| missing("h3"))?);
    let name = capture(MELON_NAME_PATTERN, &heading, "melon_name")?
        .map(|name| name.trim().to_string())
        .ok_or_else(|| CaseError::Extract(format!("melon name from {:?}", heading)))?;

    let subheading = text(child(block, "h2")?.ok_or_else(|| missing("h2"))?);
    let loves = capture(LOVE_COUNT_PATTERN, &subheading, "num_loves")?
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(|| CaseError::Extract(format!("love count from {:?}", subheading)))?;

    let image = child(block, "img")?.ok_or_else(|| missing("img"))?;
    let love_id = child(block, "input[name=\"melon\"]")?
        .and_then(|input| attr(input, "value"))
        .map(str::to_string);

    Ok(ScrapedMelon {
        name,
        loves,
        image_url: attr(image, "src").map(str::to_string),
        love_id,
    })
}

/// Read every `div` block on `/top-melons`. Any block that is not a melon ends the case.
fn scrape_melons(body: &str) -> Result<Vec<ScrapedMelon>, CaseError> {
    let doc = Document::parse(body);
    doc.all("div")?
        .into_iter()
        .enumerate()
        .map(|(index, block)| read_block(index + 1, block))
        .collect()
}

async fn melon_info(env: &ScenarioEnv<'_>, checks: &mut CheckContext) -> Result<(), CaseError> {
    let page = env.get("/top-melons").await?;
    let scraped = scrape_melons(&page.body)?;

    let mut seen = Vec::new();
    for melon in &scraped {
        let expected = MELON_LOOKUP.iter().find(|m| m.name == melon.name);
        checks.soft(
            format!("{} is one of our melons", melon.name),
            expected.is_some(),
            if expected.is_some() { "known melon" } else { "unknown melon" },
        );
        if let Some(expected) = expected {
            checks.soft_eq(
                format!("{} has the right love count", melon.name),
                melon.loves,
                expected.loves,
            );
            checks.soft_eq(
                format!("{} uses the correct image", melon.name),
                melon.image_url.as_deref(),
                Some(expected.image_url),
            );
        }
        seen.push(melon.name.clone());
    }

    seen.sort();
    let mut expected: Vec<String> = MELON_LOOKUP.iter().map(|m| m.name.to_string()).collect();
    expected.sort();
    checks.soft_eq("listed melons are exactly our four melons", seen, expected);
    Ok(())
}

async fn love_melon(env: &ScenarioEnv<'_>, checks: &mut CheckContext) -> Result<(), CaseError> {
    let target = MELON_LOOKUP[0];

    let before = env.get("/top-melons").await?;
    let love_id = scrape_melons(&before.body)?
        .into_iter()
        .find(|m| m.name == target.name)
        .and_then(|m| m.love_id)
        .unwrap_or_else(|| FALLBACK_LOVE_ID.to_string());

    let thanks = env
        .candidate
        .client()
        .post_form("/love-melon", &[("melon", love_id.as_str())])
        .await?;
    checks.soft(
        format!("loving {} succeeds", target.name),
        thanks.is_success(),
        describe(&thanks),
    );

    let after = env.get("/top-melons").await?;
    let loves = scrape_melons(&after.body)?
        .into_iter()
        .find(|m| m.name == target.name)
        .map(|m| m.loves);
    checks.soft_eq(
        format!("{} gained one love", target.name),
        loves,
        Some(target.loves + 1),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use ubermelon::{pages, MelonStore};

    #[test]
    fn test_case_names_unique_and_ordered() {
        let names: Vec<&str> = ScenarioCase::ALL.iter().map(|c| c.name()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.first(), Some(&"gitignore_exists"));
        assert_eq!(names.last(), Some(&"love_melon"));
    }

    #[test]
    fn test_scenario_digest_deterministic_and_order_sensitive() {
        let forward = scenario_digest(&ScenarioCase::ALL);
        assert_eq!(forward, scenario_digest(&ScenarioCase::ALL));

        let mut reversed = ScenarioCase::ALL;
        reversed.reverse();
        assert_ne!(forward, scenario_digest(&reversed));
    }

    #[test]
    fn test_lookup_matches_reference_catalogue() {
        let store = MelonStore::most_loved();
        let reference: Vec<(&str, &str, u64)> = store
            .iter()
            .map(|m| (m.name.as_str(), m.image_url.as_str(), m.loves))
            .collect();
        let lookup: Vec<(&str, &str, u64)> = MELON_LOOKUP
            .iter()
            .map(|m| (m.name, m.image_url, m.loves))
            .collect();
        assert_eq!(reference, lookup);
    }

    #[test]
    fn test_scrape_reference_page() {
        let html = pages::top_melons("Test User", &MelonStore::most_loved());
        let scraped = scrape_melons(&html).unwrap();

        assert_eq!(scraped.len(), 4);
        assert_eq!(scraped[0].name, "Crenshaw");
        assert_eq!(scraped[0].loves, 584);
        assert_eq!(scraped[0].love_id.as_deref(), Some("cren"));
        assert_eq!(scraped[3].image_url.as_deref(), Some(MELON_LOOKUP[3].image_url));
    }

    #[test]
    fn test_scrape_block_without_h2_is_an_error() {
        let html = "<div><h3>Test User, this is a Crenshaw</h3><img src=\"x\"></div>";
        let err = scrape_melons(html).unwrap_err();
        assert!(matches!(err, CaseError::MissingElement(what) if what == "h2 in melon block 1"));
    }

    #[test]
    fn test_scrape_block_without_number_is_an_error() {
        let html = concat!(
            "<div><h3>Test User, this is a Crenshaw</h3>",
            "<h2>Loved by many</h2><img src=\"x\"></div>",
        );
        let err = scrape_melons(html).unwrap_err();
        assert!(matches!(err, CaseError::Extract(_)));
    }

    #[test]
    fn test_form_input_name() {
        assert_eq!(form_input_name(&pages::homepage()).unwrap(), "name");
        assert!(matches!(
            form_input_name("<p>no form</p>"),
            Err(CaseError::MissingElement(_))
        ));
    }

    #[test]
    fn test_describe_page() {
        let page = Page {
            status: 303,
            location: Some("/top-melons".to_string()),
            sets_cookie: true,
            body: String::new(),
        };
        assert_eq!(describe(&page), "status 303, location /top-melons");
    }
}
