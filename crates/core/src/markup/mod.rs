//! Inline markup sanitizer for cue text.
//! Produces renderable html from a small safe tag set plus a plain-text form.

pub mod rules;

use rules::{contains_tag, strip_all_tags, strip_speaker_tags, RULES};
use tracing::trace;

/// Result of sanitizing one cue's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub plain_text: String,
    pub html: String,
    pub has_formatting: bool,
}

/// Sanitize raw cue text into `(plain_text, html, has_formatting)`.
/// Speaker labels do not count as formatting. The rule table runs until the
/// html stops changing, so sanitizing twice is a no-op.
pub fn sanitize(raw: &str) -> Sanitized {
    let has_formatting = contains_tag(&strip_speaker_tags(raw));
    let mut html = raw.to_string();
    let mut passes = 0;
    loop {
        let next = RULES.iter().fold(html.clone(), |acc, rule| (rule.apply)(&acc));
        passes += 1;
        if next == html {
            break;
        }
        html = next;
    }
    trace!(passes, "sanitized cue text");
    Sanitized {
        plain_text: strip_all_tags(&html),
        html,
        has_formatting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn plain_text_passes_through() {
        let out = sanitize("Hello world");
        assert_eq!(out.html, "Hello world");
        assert_eq!(out.plain_text, "Hello world");
        assert!(!out.has_formatting);
    }

    #[test]
    fn language_label_inside_font_collapses_away() {
        let out = sanitize("<font color=\"red\">[spanish]</font> Kim: I have a case.");
        assert_eq!(out.html, "Kim: I have a case.");
        assert_eq!(out.plain_text, "Kim: I have a case.");
        assert!(out.has_formatting);
    }

    #[test]
    fn bracket_only_label_is_not_formatting() {
        let out = sanitize("[spanish] Hola");
        assert_eq!(out.html, "Hola");
        assert!(!out.has_formatting);
    }

    #[test]
    fn mixed_markup_is_normalized() {
        let out = sanitize("<i><b>Run!</b></i>\n<font color=\"yellow\">Now</font>");
        assert_eq!(
            out.html,
            "<strong><em>Run!</em></strong> <span style=\"color: yellow\">Now</span>"
        );
        assert_eq!(out.plain_text, "Run! Now");
        assert!(out.has_formatting);
    }

    #[test]
    fn both_nesting_orders_agree() {
        assert_eq!(
            sanitize("<i><b>X</b></i>").html,
            sanitize("<b><i>X</i></b>").html
        );
        let tagged = sanitize("<i><b>a <u>b</u></b></i>").html;
        assert_eq!(tagged, "<strong><em>a <u>b</u></em></strong>");
        assert_eq!(tagged, sanitize("<b><i>a <u>b</u></i></b>").html);
        assert_eq!(
            sanitize("<I><B>one<br/>two</B></I>").html,
            sanitize("<b><i>one<br>two</i></b>").html
        );
    }

    #[test]
    fn labels_uncovered_by_tag_removal_are_stripped() {
        let out = sanitize("<<x>b>[y] z");
        assert_eq!(out.html, "z");
        assert!(out.has_formatting);
    }

    /// Each layer only turns into a tag once the layer inside it is gone.
    fn layered(depth: usize) -> String {
        let mut text = "<<em></em>b></b>".to_string();
        for _ in 1..depth {
            text = format!("<{text}i></i>");
        }
        text
    }

    #[test]
    fn layered_markup_settles_completely() {
        for depth in [1, 2, 16, 40] {
            let once = sanitize(&layered(depth)).html;
            assert_eq!(once, "", "depth {depth}");
        }
    }

    #[test]
    fn deep_nesting_is_not_quadratic() {
        let depth = 50_000;
        let started = Instant::now();
        let nested = format!("{}{}", "<em>".repeat(depth), "</em>".repeat(depth));
        assert_eq!(sanitize(&nested).html, "");
        let formed = format!("{}{}", "<a".repeat(depth), ">b".repeat(depth));
        assert_eq!(sanitize(&formed).html, "b");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn malformed_markup_never_panics() {
        for input in ["<i>unterminated", "<", "a </b> b", "<font color=\"a>b\">x", "<<<>>>", "5 > 3 <3"] {
            let out = sanitize(input);
            assert!(!out.plain_text.contains('<'));
            assert!(!out.plain_text.contains('>'));
        }
        assert_eq!(sanitize("5 > 3 <3").html, "5 > 3 <3");
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let samples = [
            "<font color=\"red\" size=\"3\">a</font> <i>b</i>",
            "[x] <u>under</u><br/>line",
            "<ruby>漢<rp>(</rp><rt>kan</rt><rp>)</rp></ruby>",
            "<span style='font-family: \"Arial\"'>q</span>",
            "<em><strong>x</strong></em>  <c.blue>y</c>",
            "<<x>em>formed",
            "<<x>b>[y] z",
            "<i><b>a <u>b</u></b></i>",
        ];
        for sample in samples {
            let once = sanitize(sample).html;
            assert_eq!(sanitize(&once).html, once, "sample {sample:?}");
        }
    }
}
