//! Thin helpers over `scraper` for the structural checks.
//!
//! Lookups mirror how a grader reads a page: "the first `h1`", "every `div`",
//! "the `h3` inside this block". Text is the concatenation of all descendant
//! text nodes.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::check::CaseError;

fn selector(css: &str) -> Result<Selector, CaseError> {
    Selector::parse(css).map_err(|e| CaseError::Selector(format!("{}: {:?}", css, e)))
}

/// A parsed HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// First element matching `css` in document order.
    pub fn first(&self, css: &str) -> Result<Option<ElementRef<'_>>, CaseError> {
        let selector = selector(css)?;
        let found = self.html.select(&selector).next();
        Ok(found)
    }

    /// Like [`Document::first`], but absence is an error.
    pub fn require(&self, css: &str) -> Result<ElementRef<'_>, CaseError> {
        self.first(css)?
            .ok_or_else(|| CaseError::MissingElement(css.to_string()))
    }

    /// All elements matching `css` in document order.
    pub fn all(&self, css: &str) -> Result<Vec<ElementRef<'_>>, CaseError> {
        let selector = selector(css)?;
        let found = self.html.select(&selector).collect();
        Ok(found)
    }

    pub fn count(&self, css: &str) -> Result<usize, CaseError> {
        Ok(self.all(css)?.len())
    }
}

/// First descendant of `element` matching `css`.
pub fn child<'a>(element: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>, CaseError> {
    let selector = selector(css)?;
    let found = element.select(&selector).next();
    Ok(found)
}

pub fn text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Named capture `group` of the first match of `pattern` in `haystack`.
pub fn capture(pattern: &str, haystack: &str, group: &str) -> Result<Option<String>, CaseError> {
    let re = Regex::new(pattern)?;
    Ok(re
        .captures(haystack)
        .and_then(|caps| caps.name(group))
        .map(|m| m.as_str().to_string()))
}
