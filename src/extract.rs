//! Extraction strategies for catalog pages.
//!
//! Each strategy is a plain descriptor evaluated against a parsed document.
//! Resolvers walk the lists below in order and stop at the first strategy
//! that yields a usable candidate; nothing is merged across strategies.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::error::{EngineError, Result};

/// Paths that look like an individual app page, e.g. `/android/sample-app`.
static APP_PAGE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(android|ios|windows|mac|linux)/[A-Za-z0-9][A-Za-z0-9\-]*/?$")
        .expect("app page pattern compiles")
});

/// A name/link pair found in a search page, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub href: String,
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy)]
pub enum SearchRule {
    /// First `a[href]` inside each container; name from the link text.
    ContainerAnchor { container: &'static str },
    /// URL read from an attribute; name from a child element, else own text.
    AttributeLink {
        element: &'static str,
        attr: &'static str,
        name: &'static str,
    },
    /// The matched anchors themselves; name from `title`, else link text.
    Anchor { selector: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct SearchStrategy {
    pub name: &'static str,
    pub rule: SearchRule,
}

pub const SEARCH_STRATEGIES: &[SearchStrategy] = &[
    SearchStrategy {
        name: "name-block",
        rule: SearchRule::ContainerAnchor {
            container: "div.name",
        },
    },
    SearchStrategy {
        name: "data-url-card",
        rule: SearchRule::AttributeLink {
            element: "div.item[data-url], li[data-url], article[data-url]",
            attr: "data-url",
            name: ".name, .title",
        },
    },
    SearchStrategy {
        name: "card-title-link",
        rule: SearchRule::Anchor {
            selector: "article a[href], .app-card a[href], li.app a[href]",
        },
    },
];

impl SearchStrategy {
    /// Candidates from at most the first `limit` matching nodes.
    pub fn candidates(&self, document: &Html, limit: usize) -> Vec<Candidate> {
        match self.rule {
            SearchRule::ContainerAnchor { container } => {
                let (Some(container_sel), Some(anchor_sel)) = (selector(container), selector("a[href]")) else {
                    return Vec::new();
                };
                document
                    .select(&container_sel)
                    .take(limit)
                    .filter_map(|block| block.select(&anchor_sel).next())
                    .filter_map(|a| {
                        let href = a.value().attr("href")?;
                        Some(candidate(href, element_text(&a)))
                    })
                    .collect()
            }
            SearchRule::AttributeLink { element, attr, name } => {
                let (Some(element_sel), Some(name_sel)) = (selector(element), selector(name)) else {
                    return Vec::new();
                };
                document
                    .select(&element_sel)
                    .take(limit)
                    .filter_map(|el| {
                        let href = el.value().attr(attr)?;
                        let text = el
                            .select(&name_sel)
                            .next()
                            .map(|n| element_text(&n))
                            .unwrap_or_else(|| element_text(&el));
                        Some(candidate(href, text))
                    })
                    .collect()
            }
            SearchRule::Anchor { selector: anchors } => {
                let Some(anchor_sel) = selector(anchors) else {
                    return Vec::new();
                };
                document
                    .select(&anchor_sel)
                    .take(limit)
                    .filter_map(|a| {
                        let href = a.value().attr("href")?;
                        let text = element_text(&a);
                        let mut c = candidate(href, text);
                        if let Some(title) = a.value().attr("title").map(str::trim).filter(|t| !t.is_empty()) {
                            c.name = collapse_whitespace(title);
                        }
                        Some(c)
                    })
                    .collect()
            }
        }
    }
}

/// Every hyperlink in the document, for the last-resort pass.
pub fn all_links(document: &Html) -> Vec<Candidate> {
    let Some(anchor_sel) = selector("a[href]") else {
        return Vec::new();
    };
    document
        .select(&anchor_sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some(candidate(href, element_text(&a)))
        })
        .collect()
}

pub fn is_app_page(url: &Url) -> bool {
    APP_PAGE_PATH.is_match(url.path())
}

#[derive(Debug, Clone, Copy)]
pub enum LinkRule {
    /// Link stored in an attribute of the matched element.
    Attribute {
        selector: &'static str,
        attr: &'static str,
    },
    /// `href` of the matched element.
    Href { selector: &'static str },
    /// Any anchor whose `href` contains one of the needles, case-insensitively.
    HrefContains { needles: &'static [&'static str] },
}

#[derive(Debug, Clone, Copy)]
pub struct DownloadStrategy {
    pub name: &'static str,
    pub rule: LinkRule,
}

pub const DOWNLOAD_STRATEGIES: &[DownloadStrategy] = &[
    DownloadStrategy {
        name: "download-url-attribute",
        rule: LinkRule::Attribute {
            selector: "[data-download-url]",
            attr: "data-download-url",
        },
    },
    DownloadStrategy {
        name: "button-data-url",
        rule: LinkRule::Attribute {
            selector: "#detail-download-button[data-url], button.download[data-url], a.download[data-url]",
            attr: "data-url",
        },
    },
    DownloadStrategy {
        name: "download-class",
        rule: LinkRule::Href {
            selector: "a.button.download[href], a.download-link[href], .download-link a[href]",
        },
    },
    DownloadStrategy {
        name: "loose-href",
        rule: LinkRule::HrefContains {
            needles: &["download", "apk"],
        },
    },
];

impl DownloadStrategy {
    /// Raw link targets in document order.
    pub fn candidates(&self, document: &Html) -> Vec<String> {
        match self.rule {
            LinkRule::Attribute { selector: sel, attr } => attr_values(document, sel, attr),
            LinkRule::Href { selector: sel } => attr_values(document, sel, "href"),
            LinkRule::HrefContains { needles } => attr_values(document, "a[href]", "href")
                .into_iter()
                .filter(|href| {
                    let lower = href.to_ascii_lowercase();
                    needles.iter().any(|n| lower.contains(n))
                })
                .collect(),
        }
    }
}

/// Parses a fetched body, refusing bodies that are not markup at all.
/// An empty page is still a document; it simply matches nothing.
pub fn parse_document(url: &Url, body: &str) -> Result<Html> {
    if body.contains('\0') {
        return Err(EngineError::Parse {
            url: url.to_string(),
            reason: "binary response body".to_string(),
        });
    }
    Ok(Html::parse_document(body))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn candidate(href: &str, text: String) -> Candidate {
    Candidate {
        href: href.trim().to_string(),
        name: collapse_whitespace(&text),
        label: text.trim().to_string(),
    }
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

fn attr_values(document: &Html, sel: &str, attr: &str) -> Vec<String> {
    let Some(selector) = selector(sel) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Skipping invalid selector '{}': {}", css, e);
            None
        }
    }
}
