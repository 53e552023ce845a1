use crate::core::config::SearchSettings;
use crate::core::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Comments, or a start/end tag with quoted attribute values kept intact
static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<!--.*?-->|<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("tag pattern is valid")
});

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("class pattern is valid")
});

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity pattern is valid")
});

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern is valid"));

static H1_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("h1 pattern is valid"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Any whitespace except a line break
static HORIZONTAL_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]+").expect("horizontal space pattern is valid"));

/// Elements that never have an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text, not markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements whose end starts a new line of text
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "tr", "th", "td",
    "table", "br", "blockquote", "figcaption", "dt", "dd",
];

/// Searchable text pulled out of a page's main content region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRegion {
    /// Prose with one line per block element, spaces collapsed
    pub text: String,
    /// Non-empty text nodes in document order
    pub leaves: Vec<String>,
}

/// Pulls prose out of a rendered chapter page.
///
/// The main region is the first element named by the content selector; any
/// subtree rooted at an excluded tag or carrying an excluded class (quizzes,
/// audio sections) contributes nothing.
#[derive(Debug, Clone)]
pub struct Extractor {
    container: String,
    excluded_tags: Vec<String>,
    excluded_classes: Vec<String>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::from_settings(&SearchSettings::default())
    }
}

impl Extractor {
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            container: settings.content_selector.to_ascii_lowercase(),
            excluded_tags: settings.excluded_tags.iter().map(|t| t.to_ascii_lowercase()).collect(),
            excluded_classes: settings.excluded_classes.clone(),
        }
    }

    /// Extract the main content region, failing when the page has none
    pub fn extract(&self, html: &str) -> Result<ContentRegion> {
        let mut stack: Vec<String> = Vec::new();
        let mut inside = false;
        let mut excluded_at: Option<usize> = None;
        let mut flat = String::new();
        let mut leaves = Vec::new();
        let mut cursor = 0;

        while let Some(caps) = TAG_RE.captures_at(html, cursor) {
            let whole = caps.get(0).expect("group 0 always matches");

            if inside && excluded_at.is_none() {
                push_text(&html[cursor..whole.start()], &mut flat, &mut leaves);
            }
            cursor = whole.end();

            let Some(name) = caps.get(2) else {
                // comment
                continue;
            };
            let name = name.as_str().to_ascii_lowercase();
            let closing = !caps[1].is_empty();
            let attrs = caps.get(3).map_or("", |m| m.as_str());

            if !inside {
                if !closing && name == self.container {
                    inside = true;
                    stack.push(name);
                }
                continue;
            }

            if closing {
                let Some(pos) = stack.iter().rposition(|open| *open == name) else {
                    continue;
                };
                stack.truncate(pos);
                if excluded_at.is_some_and(|depth| stack.len() < depth) {
                    excluded_at = None;
                }
                if BLOCK_ELEMENTS.contains(&name.as_str()) {
                    flat.push('\n');
                }
                if stack.is_empty() {
                    break;
                }
                continue;
            }

            if name == "br" && excluded_at.is_none() {
                flat.push('\n');
            }

            let self_closing = attrs.trim_end().ends_with('/');
            if VOID_ELEMENTS.contains(&name.as_str()) || self_closing {
                continue;
            }

            let excluded = self.excluded_tags.contains(&name) || self.has_excluded_class(attrs);

            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                let end = find_raw_text_end(html, cursor, &name);
                if !excluded && excluded_at.is_none() {
                    push_text(&html[cursor..end.0], &mut flat, &mut leaves);
                }
                cursor = end.1;
                continue;
            }

            stack.push(name);
            if excluded && excluded_at.is_none() {
                excluded_at = Some(stack.len());
            }
        }

        if !inside {
            return Err(Error::Parsing(format!(
                "No <{}> content region found",
                self.container
            )));
        }

        // Unterminated region: keep whatever trailed the last tag
        if !stack.is_empty() && excluded_at.is_none() && cursor < html.len() {
            push_text(&html[cursor..], &mut flat, &mut leaves);
        }

        Ok(ContentRegion {
            text: normalize_lines(&flat),
            leaves,
        })
    }

    fn has_excluded_class(&self, attrs: &str) -> bool {
        let Some(caps) = CLASS_RE.captures(attrs) else {
            return false;
        };
        let value = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        value
            .split_whitespace()
            .any(|class| self.excluded_classes.iter().any(|excluded| excluded == class))
    }
}

/// Returns (content end, resume offset) for a raw-text element opened at `from`
fn find_raw_text_end(html: &str, from: usize, name: &str) -> (usize, usize) {
    let needle = format!("</{}", name);
    let tail = &html[from..];
    let lowered = tail.to_ascii_lowercase();
    match lowered.find(&needle) {
        Some(rel) => {
            let start = from + rel;
            let resume = html[start..].find('>').map_or(html.len(), |gt| start + gt + 1);
            (start, resume)
        }
        None => (html.len(), html.len()),
    }
}

fn push_text(raw: &str, flat: &mut String, leaves: &mut Vec<String>) {
    if raw.is_empty() {
        return;
    }
    let decoded = decode_entities(raw);
    // Source line breaks are plain whitespace; only block ends break lines
    flat.push_str(&WHITESPACE_RE.replace_all(&decoded, " "));

    let leaf = normalize_whitespace(&decoded);
    if !leaf.is_empty() {
        leaves.push(leaf);
    }
}

/// Collapse whitespace runs to one space and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Collapse spaces within each line, trim every line and drop blank ones
pub fn normalize_lines(text: &str) -> String {
    HORIZONTAL_SPACE_RE
        .replace_all(text, " ")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode the character references that show up in hand-written pages
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "nbsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "aelig" => 'æ',
        "AElig" => 'Æ',
        "oslash" => 'ø',
        "Oslash" => 'Ø',
        "aring" => 'å',
        "Aring" => 'Å',
        "euro" => '€',
        _ => return None,
    };
    Some(c)
}

/// Display title for a page: `<title>`, else the first `<h1>`
pub fn page_title(html: &str) -> Option<String> {
    [&*TITLE_RE, &*H1_RE].iter().find_map(|re| {
        let inner = re.captures(html)?.get(1)?.as_str();
        let text = normalize_whitespace(&decode_entities(&TAG_RE.replace_all(inner, " ")));
        (!text.is_empty()).then_some(text)
    })
}
