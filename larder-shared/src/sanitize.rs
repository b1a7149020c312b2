/// Text and URL sanitization for untrusted input
///
/// Imported recipe pages are arbitrary HTML. Everything that reaches the
/// database from them goes through this module first. Entities are decoded
/// before markup is stripped, so `&lt;script&gt;` is removed like `<script>`.
/// Whitespace is then normalized; URLs are limited to `http`/`https`.
///
/// All functions are pure.
///
/// # Example
///
/// ```
/// use larder_shared::sanitize::{clean_text, validate_url};
///
/// let title = clean_text("<b>Best</b> &amp; easiest <script>alert(1)</script>pie", 255);
/// assert_eq!(title, "Best & easiest pie");
///
/// assert!(validate_url("javascript:alert(1)").is_err());
/// assert!(validate_url("https://example.com/pie").is_ok());
/// ```

use regex::{Captures, Regex};
use std::sync::OnceLock;
use url::Url;

/// Longest URL accepted anywhere
pub const MAX_URL_LENGTH: usize = 2048;

/// Elements removed together with their content
const DANGEROUS_ELEMENTS: [&str; 6] = ["script", "style", "iframe", "object", "embed", "noscript"];

/// Error type for URL validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("URL is empty")]
    Empty,

    #[error("URL is longer than {max} characters")]
    TooLong { max: usize },

    #[error("URL is not valid: {0}")]
    Invalid(String),

    #[error("URL scheme '{0}' is not allowed; use http or https")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,
}

struct Patterns {
    dangerous: Vec<Regex>,
    comment: Regex,
    tag: Regex,
    block_break: Regex,
    entity: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        dangerous: DANGEROUS_ELEMENTS
            .iter()
            .map(|name| {
                Regex::new(&format!(r"(?is)<{name}\b[^>]*>(?:.*?</{name}\s*>|.*$)"))
                    .expect("Invalid element regex")
            })
            .collect(),
        comment: Regex::new(r"(?s)<!--.*?(?:-->|$)").expect("Invalid comment regex"),
        tag: Regex::new(r"(?s)</?[a-zA-Z!?][^>]*>").expect("Invalid tag regex"),
        block_break: Regex::new(r"(?i)<br\s*/?>|</(?:p|li|div|h[1-6]|tr)\s*>")
            .expect("Invalid block regex"),
        entity: Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});")
            .expect("Invalid entity regex"),
    })
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).filter(|c| *c != '\0');
    }

    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    }
}

/// Decodes HTML entities, leaving unknown ones untouched
pub fn decode_entities(input: &str) -> String {
    patterns()
        .entity
        .replace_all(input, |caps: &Captures| match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Decodes entities, then removes markup
///
/// Script-like elements are dropped with their content, as are comments.
/// A `<` that does not open a tag (`a < b`) is kept.
pub fn strip_tags(input: &str) -> String {
    let p = patterns();

    let mut text = decode_entities(input);
    for element in &p.dangerous {
        text = element.replace_all(&text, "").into_owned();
    }
    let text = p.comment.replace_all(&text, "");
    p.tag.replace_all(&text, "").into_owned()
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

fn collapse_whitespace(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single-line plain text, at most `max_chars` characters
pub fn clean_text(input: &str, max_chars: usize) -> String {
    truncate_chars(&collapse_whitespace(&strip_tags(input)), max_chars)
}

/// Multi-line plain text, at most `max_chars` characters
///
/// Line and paragraph breaks (`<br>`, `</p>`, `</li>`, newlines) survive as
/// single newlines; blank lines are dropped.
pub fn clean_multiline(input: &str, max_chars: usize) -> String {
    let with_breaks = patterns().block_break.replace_all(input, "\n");
    let text = strip_tags(&with_breaks);

    let joined = text
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(&joined, max_chars)
}

/// Cleans optional text, mapping empty results to `None`
pub fn clean_optional(input: Option<&str>, max_chars: usize) -> Option<String> {
    input
        .map(|s| clean_text(s, max_chars))
        .filter(|s| !s.is_empty())
}

/// Checks that a URL is an absolute http(s) URL with a host
///
/// Returns the normalized URL. The length limit applies to that form, since
/// percent-encoding can make it longer than the input.
pub fn validate_url(input: &str) -> Result<String, SanitizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SanitizeError::Empty);
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(SanitizeError::TooLong {
            max: MAX_URL_LENGTH,
        });
    }

    let url = Url::parse(trimmed).map_err(|e| SanitizeError::Invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(SanitizeError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(SanitizeError::MissingHost);
    }

    let normalized = String::from(url);
    if normalized.len() > MAX_URL_LENGTH {
        return Err(SanitizeError::TooLong {
            max: MAX_URL_LENGTH,
        });
    }

    Ok(normalized)
}

/// Lenient URL check: invalid input is dropped instead of reported
pub fn sanitize_url(input: &str) -> Option<String> {
    validate_url(input).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_removes_script_content() {
        let html = r#"<p>Hello <script type="text/javascript">steal()</script>world</p>"#;
        assert_eq!(strip_tags(html), "Hello world");

        let html = "<STYLE>body{}</STYLE>ok<iframe src=x>inner</iframe>";
        assert_eq!(strip_tags(html), "ok");
    }

    #[test]
    fn test_strip_tags_unclosed_script_drops_rest() {
        assert_eq!(strip_tags("safe<script>evil()"), "safe");
    }

    #[test]
    fn test_strip_tags_preserves_plain_text() {
        assert_eq!(strip_tags("Just soup"), "Just soup");
        assert_eq!(strip_tags("3 < 5 and 5 > 3"), "3 < 5 and 5 > 3");
        assert_eq!(strip_tags("a<!-- hidden -->b"), "ab");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Mac &amp; cheese"), "Mac & cheese");
        assert_eq!(decode_entities("&lt;b&gt;"), "<b>");
        assert_eq!(decode_entities("it&#39;s &#x2F; &quot;ok&quot;"), "it's / \"ok\"");
        assert_eq!(decode_entities("caf&#233;"), "café");
        assert_eq!(decode_entities("&bogus; stays"), "&bogus; stays");
    }

    #[test]
    fn test_encoded_markup_is_stripped() {
        assert_eq!(strip_tags("&lt;script&gt;alert(1)&lt;/script&gt;ok"), "ok");
        assert_eq!(strip_tags("&lt;b&gt;bold&lt;/b&gt;"), "bold");
        assert_eq!(strip_tags("3 &lt; 5 &amp; 5 &gt; 3"), "3 < 5 & 5 > 3");
    }

    #[test]
    fn test_clean_text_collapses_and_truncates() {
        assert_eq!(clean_text("  a\n\tb   c \u{0007}", 100), "a b c");
        assert_eq!(clean_text("abcdef", 3), "abc");
        assert_eq!(clean_text("héllo wörld", 5), "héllo");
        assert_eq!(clean_text("one two", 4), "one");
    }

    #[test]
    fn test_clean_multiline_keeps_paragraphs() {
        let html = "<p>Preheat oven.</p>\n\n<p>Mix   flour<br>and sugar.</p>";
        assert_eq!(clean_multiline(html, 1000), "Preheat oven.\nMix flour\nand sugar.");
    }

    #[test]
    fn test_clean_optional() {
        assert_eq!(clean_optional(Some("  "), 10), None);
        assert_eq!(clean_optional(Some("<i></i>"), 10), None);
        assert_eq!(clean_optional(Some(" x "), 10), Some("x".to_string()));
        assert_eq!(clean_optional(None, 10), None);
    }

    #[test]
    fn test_validate_url_schemes() {
        assert_eq!(
            validate_url(" https://example.com/r/1 "),
            Ok("https://example.com/r/1".to_string())
        );
        assert!(validate_url("http://example.com").is_ok());

        for bad in [
            "javascript:alert(1)",
            "data:text/html;base64,AAAA",
            "file:///etc/passwd",
            "vbscript:msgbox",
            "ftp://example.com/file",
        ] {
            assert!(
                matches!(validate_url(bad), Err(SanitizeError::UnsupportedScheme(_))),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn test_validate_url_shape() {
        assert_eq!(validate_url(""), Err(SanitizeError::Empty));
        assert!(matches!(validate_url("not a url"), Err(SanitizeError::Invalid(_))));

        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(
            validate_url(&long),
            Err(SanitizeError::TooLong {
                max: MAX_URL_LENGTH
            })
        );
    }

    #[test]
    fn test_validate_url_limits_encoded_length() {
        // Each space becomes %20 once normalized
        let spaced = format!("https://example.com/{}x", " ".repeat(1000));
        assert!(spaced.len() < MAX_URL_LENGTH);
        assert_eq!(
            validate_url(&spaced),
            Err(SanitizeError::TooLong {
                max: MAX_URL_LENGTH
            })
        );

        assert_eq!(
            validate_url("https://example.com/a b"),
            Ok("https://example.com/a%20b".to_string())
        );
    }

    #[test]
    fn test_sanitize_url_is_lenient() {
        assert_eq!(sanitize_url("javascript:void(0)"), None);
        assert_eq!(
            sanitize_url("https://img.example.com/a.jpg"),
            Some("https://img.example.com/a.jpg".to_string())
        );
    }
}
