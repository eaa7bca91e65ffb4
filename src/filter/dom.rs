//! Shared DOM helpers for the content filters
//!
//! Everything here works on a parsed `scraper::Html` and identifies nodes by
//! their `NodeId`, so a filter can decide what to drop without mutating the
//! tree and then serialize only what survived.

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;

/// Elements that never carry documentation content
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "nav", "header", "footer", "aside",
    "form", "button", "select", "input", "svg", "link", "meta",
];

/// ARIA landmark roles used for page chrome
const BOILERPLATE_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "search",
];

/// class/id tokens that mark page chrome
const NEGATIVE_PATTERNS: &[&str] = &[
    "nav",
    "menu",
    "sidebar",
    "footer",
    "header",
    "breadcrumb",
    "toc",
    "cookie",
    "banner",
    "advert",
    "promo",
    "share",
    "social",
    "comment",
    "pagination",
    "pager",
    "skip",
    "announcement",
    "feedback",
    "newsletter",
];

/// class/id tokens that mark the main content
const POSITIVE_PATTERNS: &[&str] = &[
    "content",
    "article",
    "main",
    "markdown",
    "prose",
    "documentation",
    "docs",
    "body",
    "post",
];

/// Above this link density a content-looking wrapper with a chrome class
/// (`main-nav`) still counts as chrome
const CHROME_LINK_DENSITY: f64 = 0.5;

/// Elements exempt from class/id based removal
const STRUCTURAL_TAGS: &[&str] = &["html", "body", "main", "article"];

/// Elements that hold other blocks rather than text of their own
const CONTAINER_TAGS: &[&str] = &[
    "div", "section", "main", "article", "ul", "ol", "dl", "details", "center",
];

/// Leaf blocks and their base weight
const BLOCK_WEIGHTS: &[(&str, f64)] = &[
    ("p", 1.0),
    ("h1", 1.0),
    ("h2", 1.0),
    ("h3", 1.0),
    ("h4", 1.0),
    ("h5", 1.0),
    ("h6", 1.0),
    ("pre", 1.5),
    ("table", 1.2),
    ("blockquote", 1.0),
    ("figure", 1.0),
    ("li", 0.8),
    ("dt", 0.8),
    ("dd", 0.8),
    ("summary", 0.8),
];

const MEDIA_TAGS: &[&str] = &["img", "picture", "video", "audio", "math"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const ALLOWED_ATTRS: &[&str] = &["href", "src", "alt", "title", "colspan", "rowspan"];

/// Text statistics of a subtree
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Metrics {
    pub text_len: usize,
    pub link_text_len: usize,
    pub words: usize,
    pub link_words: usize,
}

impl Metrics {
    /// Share of the visible text that sits inside `<a>` elements
    pub fn link_density(&self) -> f64 {
        if self.text_len == 0 {
            0.0
        } else {
            self.link_text_len as f64 / self.text_len as f64
        }
    }

    pub fn non_link_words(&self) -> usize {
        self.words.saturating_sub(self.link_words)
    }

    /// `text_len * (1 - link_density)`
    pub fn clean_score(&self) -> f64 {
        self.text_len as f64 * (1.0 - self.link_density())
    }
}

/// Measures the visible text under `node`, skipping removed subtrees
pub(crate) fn metrics(node: NodeRef<'_, Node>, removed: &HashSet<NodeId>) -> Metrics {
    let mut m = Metrics::default();
    collect_metrics(node, removed, false, &mut m);
    m
}

fn collect_metrics(
    node: NodeRef<'_, Node>,
    removed: &HashSet<NodeId>,
    in_link: bool,
    m: &mut Metrics,
) {
    if removed.contains(&node.id()) {
        return;
    }

    match node.value() {
        Node::Text(text) => {
            for word in text.split_whitespace() {
                let len = word.chars().count();
                m.text_len += len;
                m.words += 1;
                if in_link {
                    m.link_text_len += len;
                    m.link_words += 1;
                }
            }
        }
        Node::Element(el) => {
            // In-page anchors (`#section`) are headings' permalinks, not navigation
            let in_link = in_link
                || (el.name() == "a" && el.attr("href").is_some_and(|h| !h.starts_with('#')));
            for child in node.children() {
                collect_metrics(child, removed, in_link, m);
            }
        }
        _ => {}
    }
}

/// Splits a class/id value into lowercase tokens on whitespace, `-` and `_`
fn tokens(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

fn matches_patterns(el: &scraper::node::Element, patterns: &[&str]) -> bool {
    let class = el.attr("class").unwrap_or("");
    let id = el.attr("id").unwrap_or("");
    tokens(class)
        .chain(tokens(id))
        .any(|t| patterns.iter().any(|p| t.starts_with(p)))
}

pub(crate) fn has_positive_pattern(el: &scraper::node::Element) -> bool {
    matches_patterns(el, POSITIVE_PATTERNS)
}

/// True if a `main`, `article` or `[role=main]` element sits below `node`
fn holds_main_content(node: NodeRef<'_, Node>) -> bool {
    node.descendants().skip(1).any(|d| match d.value() {
        Node::Element(el) => {
            matches!(el.name(), "main" | "article") || el.attr("role") == Some("main")
        }
        _ => false,
    })
}

/// A chrome-looking class only removes an element that is chrome all the way
/// down: layout wrappers such as `wy-nav-content` hold the whole article.
fn is_chrome_by_class(node: NodeRef<'_, Node>, el: &scraper::node::Element) -> bool {
    if !matches_patterns(el, NEGATIVE_PATTERNS) {
        return false;
    }
    if holds_main_content(node) {
        return false;
    }
    if has_positive_pattern(el) {
        return metrics(node, &HashSet::new()).link_density() > CHROME_LINK_DENSITY;
    }
    true
}

fn is_boilerplate(node: NodeRef<'_, Node>, el: &scraper::node::Element, in_content: bool) -> bool {
    let name = el.name();

    if (name == "header" || name == "footer") && in_content {
        return false;
    }
    if BOILERPLATE_TAGS.contains(&name) {
        return true;
    }
    if el.attr("hidden").is_some() || el.attr("aria-hidden") == Some("true") {
        return true;
    }
    if let Some(role) = el.attr("role") {
        if BOILERPLATE_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()) {
            return true;
        }
    }

    !STRUCTURAL_TAGS.contains(&name) && is_chrome_by_class(node, el)
}

/// Marks every boilerplate subtree under `node`
///
/// Only the topmost boilerplate element of a subtree is recorded. `header`
/// and `footer` inside `main`/`article` belong to the content and are kept.
pub(crate) fn mark_boilerplate(node: NodeRef<'_, Node>, removed: &mut HashSet<NodeId>) {
    mark_boilerplate_inner(node, false, removed);
}

fn mark_boilerplate_inner(node: NodeRef<'_, Node>, in_content: bool, removed: &mut HashSet<NodeId>) {
    for child in node.children() {
        match child.value() {
            Node::Element(el) => {
                if is_boilerplate(child, el, in_content) {
                    removed.insert(child.id());
                    continue;
                }
                // Syntax highlighters use classes like `comment` inside code
                if matches!(el.name(), "pre" | "code") {
                    continue;
                }
                let in_content = in_content || matches!(el.name(), "main" | "article");
                mark_boilerplate_inner(child, in_content, removed);
            }
            Node::Comment(_) | Node::ProcessingInstruction(_) => {
                removed.insert(child.id());
            }
            _ => {}
        }
    }
}

pub(crate) fn is_removed(node: NodeRef<'_, Node>, removed: &HashSet<NodeId>) -> bool {
    removed.contains(&node.id()) || node.ancestors().any(|a| removed.contains(&a.id()))
}

/// Picks the element most likely to hold the page's main content
///
/// Candidates are `main`, `article`, `[role=main]` and elements with a
/// positive class/id. The highest clean-text score wins and ties go to the
/// earlier element. Falls back to `<body>`, then to the root element.
pub(crate) fn select_region<'a>(doc: &'a Html, removed: &HashSet<NodeId>) -> ElementRef<'a> {
    let mut best: Option<(ElementRef<'a>, f64)> = None;

    for node in doc.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        let value = el.value();
        let candidate = matches!(value.name(), "main" | "article")
            || value.attr("role") == Some("main")
            || (value.name() != "body" && value.name() != "html" && has_positive_pattern(value));
        if !candidate || is_removed(node, removed) {
            continue;
        }

        let score = metrics(node, removed).clean_score();
        if score <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((el, score));
        }
    }

    if let Some((el, _)) = best {
        return el;
    }

    Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .unwrap_or_else(|| doc.root_element())
}

pub(crate) fn is_container(name: &str) -> bool {
    CONTAINER_TAGS.contains(&name)
}

pub(crate) fn block_weight(name: &str) -> Option<f64> {
    BLOCK_WEIGHTS
        .iter()
        .find(|(tag, _)| *tag == name)
        .map(|(_, weight)| *weight)
}

/// True if the subtree holds an image or other media element
pub(crate) fn has_media(node: NodeRef<'_, Node>, removed: &HashSet<NodeId>) -> bool {
    node.descendants().any(|d| match d.value() {
        Node::Element(el) => MEDIA_TAGS.contains(&el.name()) && !is_removed(d, removed),
        _ => false,
    })
}

/// Serializes the children of `node`, leaving out removed subtrees
pub(crate) fn serialize_children(node: NodeRef<'_, Node>, removed: &HashSet<NodeId>) -> String {
    let mut out = String::new();
    for child in node.children() {
        serialize_node(child, removed, &mut out);
    }
    out
}

/// Serializes `node` itself, leaving out removed subtrees
pub(crate) fn serialize(node: NodeRef<'_, Node>, removed: &HashSet<NodeId>) -> String {
    let mut out = String::new();
    serialize_node(node, removed, &mut out);
    out
}

fn serialize_node(node: NodeRef<'_, Node>, removed: &HashSet<NodeId>, out: &mut String) {
    if removed.contains(&node.id()) {
        return;
    }

    match node.value() {
        Node::Text(text) => escape_into(text, false, out),
        Node::Element(el) => {
            let name = el.name();
            out.push('<');
            out.push_str(name);
            // Fixed attribute order keeps the output deterministic
            let class = matches!(name, "pre" | "code").then_some("class");
            for key in ALLOWED_ATTRS.iter().copied().chain(class) {
                if let Some(value) = el.attr(key) {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
            }
            out.push('>');

            if VOID_TAGS.contains(&name) {
                return;
            }

            for child in node.children() {
                serialize_node(child, removed, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        _ => {}
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Number of visible characters (whitespace excluded) in an HTML fragment
pub(crate) fn visible_text_len(html: &str) -> usize {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .flat_map(|t| t.split_whitespace())
        .map(|w| w.chars().count())
        .sum()
}
