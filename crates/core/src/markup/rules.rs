//! Ordered rewrite rules for inline cue markup.
//! Each rule is a plain `&str -> String` pass so it can be exercised alone.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Any tag-shaped token: optional `/`, a name starting with a letter, then attributes.
pub(crate) static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)([^<>]*)>").expect("valid tag regex")
});
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b([a-z][a-z-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});
static SPEAKER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^((?:[^\S\n]*<[^<>\n]*>)*[^\S\n]*)(?:\[[^\[\]\n]*\][^\S\n]*)+")
        .expect("valid speaker tag regex")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Tags that survive sanitization.
pub const ALLOWED_TAGS: [&str; 8] = ["strong", "em", "u", "span", "br", "ruby", "rt", "rp"];

/// A named rewrite step.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

/// The rewrite table, applied in order.
pub const RULES: &[Rule] = &[
    Rule {
        name: "speaker-labels",
        apply: strip_speaker_tags,
    },
    Rule {
        name: "emphasis",
        apply: normalize_emphasis,
    },
    Rule {
        name: "font",
        apply: convert_font,
    },
    Rule {
        name: "span",
        apply: normalize_span,
    },
    Rule {
        name: "line-break",
        apply: normalize_breaks,
    },
    Rule {
        name: "ruby",
        apply: normalize_ruby,
    },
    Rule {
        name: "unknown-tags",
        apply: strip_unknown_tags,
    },
    Rule {
        name: "tidy",
        apply: tidy,
    },
];

/// Look up a rule by name.
pub fn rule(name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.name == name)
}

/// Drop leading `[speaker]` or `[language]` labels from every line.
/// Tags and blanks in front of the label on the same line are kept.
pub fn strip_speaker_tags(text: &str) -> String {
    SPEAKER_TAG
        .replace_all(text, |caps: &Captures| caps[1].to_string())
        .into_owned()
}

/// Whether the text contains anything shaped like a markup tag.
pub fn contains_tag(text: &str) -> bool {
    TAG.is_match(text)
}

fn rewrite_tags(text: &str, f: impl Fn(bool, &str, &str) -> Option<String>) -> String {
    TAG.replace_all(text, |caps: &Captures| {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        f(closing, &name, &caps[3]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

fn slash(closing: bool) -> &'static str {
    if closing {
        "/"
    } else {
        ""
    }
}

/// Read an attribute value, folding double quotes so it can be re-quoted safely.
fn attribute(attrs: &str, wanted: &str) -> Option<String> {
    ATTR.captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(wanted))
        .and_then(|caps| caps.get(2).or(caps.get(3)).or(caps.get(4)))
        .map(|m| m.as_str().replace('"', "'"))
}

fn normalize_emphasis(text: &str) -> String {
    rewrite_tags(text, |closing, name, _| {
        let canonical = match name {
            "b" | "strong" => "strong",
            "i" | "em" => "em",
            "u" => "u",
            _ => return None,
        };
        Some(format!("<{}{canonical}>", slash(closing)))
    })
}

fn font_style(attrs: &str) -> String {
    [("color", "color"), ("size", "font-size"), ("face", "font-family")]
        .iter()
        .filter_map(|(attr, property)| {
            attribute(attrs, attr).map(|value| format!("{property}: {value}"))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

struct FontTag {
    start: usize,
    end: usize,
    closing: bool,
    attrs: String,
}

/// Turn paired `<font>` tags into styled spans, innermost pairs matched first.
/// Unpaired font tags are left for the unknown-tag pass.
fn convert_font(text: &str) -> String {
    let tags: Vec<FontTag> = TAG
        .captures_iter(text)
        .filter(|caps| caps[2].eq_ignore_ascii_case("font"))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(FontTag {
                start: whole.start(),
                end: whole.end(),
                closing: !caps[1].is_empty(),
                attrs: caps[3].to_string(),
            })
        })
        .collect();
    if tags.is_empty() {
        return text.to_string();
    }

    let mut replacements: Vec<Option<String>> = vec![None; tags.len()];
    let mut open = Vec::new();
    for (i, tag) in tags.iter().enumerate() {
        if !tag.closing {
            open.push(i);
            continue;
        }
        let Some(opener) = open.pop() else {
            continue;
        };
        let style = font_style(&tags[opener].attrs);
        if style.is_empty() {
            replacements[opener] = Some(String::new());
            replacements[i] = Some(String::new());
        } else {
            replacements[opener] = Some(format!("<span style=\"{style}\">"));
            replacements[i] = Some("</span>".to_string());
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (tag, replacement) in tags.iter().zip(replacements) {
        if let Some(replacement) = replacement {
            out.push_str(&text[last..tag.start]);
            out.push_str(&replacement);
            last = tag.end;
        }
    }
    out.push_str(&text[last..]);
    out
}

fn normalize_span(text: &str) -> String {
    rewrite_tags(text, |closing, name, attrs| {
        if name != "span" {
            return None;
        }
        if closing {
            return Some("</span>".to_string());
        }
        Some(match attribute(attrs, "style") {
            Some(style) => format!("<span style=\"{style}\">"),
            None => "<span>".to_string(),
        })
    })
}

fn normalize_breaks(text: &str) -> String {
    rewrite_tags(text, |closing, name, _| match (name, closing) {
        ("br", false) => Some("<br>".to_string()),
        ("br", true) => Some(String::new()),
        _ => None,
    })
}

fn normalize_ruby(text: &str) -> String {
    rewrite_tags(text, |closing, name, _| {
        matches!(name, "ruby" | "rt" | "rp").then(|| format!("<{}{name}>", slash(closing)))
    })
}

/// Remove every tag outside the allowed set, keeping its content.
/// Removing a tag can join the text around it into a new tag, so each `<`
/// stays pending until a `>` settles it.
fn strip_unknown_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending: Vec<usize> = Vec::new();
    for c in text.chars() {
        match c {
            '<' => {
                pending.push(out.len());
                out.push(c);
            }
            '>' => {
                if let Some(start) = pending.pop() {
                    let unknown = tag_name(&out[start + 1..])
                        .is_some_and(|name| !ALLOWED_TAGS.contains(&name.as_str()));
                    if unknown {
                        out.truncate(start);
                        continue;
                    }
                }
                pending.clear();
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Lowercased name of a tag body such as `/b class=x`, if it is tag-shaped.
fn tag_name(body: &str) -> Option<String> {
    let body = body.strip_prefix('/').unwrap_or(body);
    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let end = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    Some(body[..end].to_ascii_lowercase())
}

/// An element opened in the tidy output and not yet closed.
struct Element {
    name: String,
    /// Offset of the opening tag in the output.
    start: usize,
    /// Offset just past the opening tag.
    body: usize,
    /// The opening tag is exactly `<name>`.
    canonical: bool,
    /// Holds text or markup that survives.
    filled: bool,
    /// Output length right after a canonical `<strong>` first child closed.
    strong_end: Option<usize>,
}

/// Single-pass builder for `tidy`: drops empty pairs and hoists `<strong>`
/// out of an `<em>` whose only child it is.
#[derive(Default)]
struct Tidy {
    out: String,
    open: Vec<Element>,
}

impl Tidy {
    fn fill(&mut self) {
        if let Some(top) = self.open.last_mut() {
            top.filled = true;
        }
    }

    fn text(&mut self, text: &str) {
        self.out.push_str(text);
        if text.chars().any(|c| !c.is_whitespace()) {
            self.fill();
        }
    }

    fn void(&mut self, tag: &str) {
        self.out.push_str(tag);
        self.fill();
    }

    fn open(&mut self, name: String, tag: &str) {
        let start = self.out.len();
        self.open.push(Element {
            canonical: tag.len() == name.len() + 2 && tag[1..].starts_with(name.as_str()),
            name,
            start,
            body: start + tag.len(),
            filled: false,
            strong_end: None,
        });
        self.out.push_str(tag);
    }

    fn close(&mut self, name: &str, tag: &str) {
        if !self.open.last().is_some_and(|top| top.name == name) {
            self.void(tag);
            return;
        }
        let Some(element) = self.open.pop() else {
            return;
        };
        if !element.filled {
            let spaced = self.out.len() > element.body;
            self.out.truncate(element.start);
            if spaced {
                self.out.push(' ');
            }
            return;
        }
        let hoist = name == "em"
            && element.canonical
            && tag == "</em>"
            && element.strong_end == Some(self.out.len());
        if hoist {
            // `<em><strong>` and `<strong><em>` have the same length.
            self.out
                .replace_range(element.start..element.body + "<strong>".len(), "<strong><em>");
            self.out.truncate(self.out.len() - "</strong>".len());
            self.out.push_str("</em></strong>");
        } else {
            self.out.push_str(tag);
        }
        let strong = hoist || (name == "strong" && element.canonical && tag == "</strong>");
        let end = self.out.len();
        if let Some(parent) = self.open.last_mut() {
            parent.filled = true;
            if element.start == parent.body {
                parent.strong_end = strong.then_some(end);
            }
        }
    }
}

/// Canonical nesting, empty element removal and whitespace collapse.
fn tidy(text: &str) -> String {
    let mut tree = Tidy::default();
    let mut last = 0;
    for caps in TAG.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        tree.text(&text[last..whole.start()]);
        last = whole.end();
        let name = caps[2].to_ascii_lowercase();
        match (caps[1].is_empty(), name.as_str()) {
            (true, "br") => tree.void(whole.as_str()),
            (true, _) => tree.open(name, whole.as_str()),
            (false, _) => tree.close(&name, whole.as_str()),
        }
    }
    tree.text(&text[last..]);
    WHITESPACE.replace_all(&tree.out, " ").trim().to_string()
}

/// Replace `<br>` with a blank, drop other tags, then stray angle brackets.
pub fn strip_all_tags(html: &str) -> String {
    let text = rewrite_tags(html, |_, name, _| {
        Some(if name == "br" { " ".to_string() } else { String::new() })
    });
    let text = text.replace(['<', '>'], "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}
