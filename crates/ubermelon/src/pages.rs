//! HTML pages.
//!
//! Each melon on `/top-melons` is rendered as
//!
//! ```text
//! <text><div class="melon">
//!   <h3>{visitor}, this is a {melon name}</h3>
//!   <h2>Loved by {loves} people</h2>
//!   <img src="{image url}">
//!   <form action="/love-melon" method="post">...</form>
//! </div></text>
//! ```

use std::fmt::Write;

use crate::store::MelonStore;

/// Heading shown on the homepage.
pub const HOMEPAGE_TITLE: &str = "UberMelon\u{2019}s Most Loved Melons";

const LOGO_URL: &str = "http://www.rareseeds.com/assets/1/14/DimRegular/crenshaw.jpg";

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        concat!(
            "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n",
            "<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        ),
        escape(title),
        body
    )
}

/// The name form.
pub fn homepage() -> String {
    let body = format!(
        concat!(
            "<h1>{title}</h1>\n",
            "<img src=\"{logo}\" alt=\"UberMelon\">\n",
            "<form action=\"/get-name\" method=\"get\">\n",
            "  <label for=\"name\">What is your name?</label>\n",
            "  <input type=\"text\" id=\"name\" name=\"name\" required>\n",
            "  <button type=\"submit\">Show me melons</button>\n",
            "</form>\n",
        ),
        title = escape(HOMEPAGE_TITLE),
        logo = LOGO_URL,
    );
    layout(HOMEPAGE_TITLE, &body)
}

/// The personalised melon list.
pub fn top_melons(visitor: &str, melons: &MelonStore) -> String {
    let visitor = escape(visitor);
    let mut body = format!("<h1>{}\u{2019}s Most Loved Melons</h1>\n", visitor);

    for melon in melons.iter() {
        // Writing into a String cannot fail.
        let _ = write!(
            body,
            concat!(
                "<text><div class=\"melon\">\n",
                "  <h3>{visitor}, this is a {name}</h3>\n",
                "  <h2>Loved by {loves} people</h2>\n",
                "  <img src=\"{img}\" alt=\"{name}\">\n",
                "  <form action=\"/love-melon\" method=\"post\">\n",
                "    <input type=\"hidden\" name=\"melon\" value=\"{id}\">\n",
                "    <button type=\"submit\">Love it</button>\n",
                "  </form>\n",
                "</div></text>\n",
            ),
            visitor = visitor,
            name = escape(&melon.name),
            loves = melon.loves,
            img = escape(&melon.image_url),
            id = escape(&melon.id),
        );
    }

    layout("Top Melons", &body)
}

/// Shown after a melon got loved.
pub fn thank_you(melon_name: &str, loves: u64) -> String {
    let body = format!(
        concat!(
            "<h1>Thank you!</h1>\n",
            "<p>{} is now loved by {} people.</p>\n",
            "<a href=\"/top-melons\">Back to the melons</a>\n",
        ),
        escape(melon_name),
        loves
    );
    layout("Thank you", &body)
}

/// Error page. `detail` is only shown in testing mode.
pub fn error_page(status: u16, detail: Option<&str>) -> String {
    let mut body = format!("<h1>Something went wrong ({})</h1>\n", status);
    if let Some(detail) = detail {
        let _ = writeln!(body, "<pre>{}</pre>", escape(detail));
    }
    layout("Error", &body)
}
