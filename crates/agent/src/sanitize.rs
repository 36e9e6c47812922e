//! Neutralises links in final answers.
//!
//! Links are wrapped in backticks so clients render them as inert code
//! instead of clickable links or loaded images. Only two kinds of link pass:
//! `http`/`https` URLs whose host is allow-listed, and relative paths that
//! do not smuggle in another URL. HTML elements carrying event-handler
//! attributes and `<script>` elements are always neutralised. Code blocks
//! and inline code are left untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::{ParseError, Url};

static CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```.*?(?:```|\z)|`[^`\n]+`").expect("code span regex should be valid")
});

static LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)(?P<script><script\b[^>]*>.*?(?:</script\s*>|\z))|(?P<anchor><a\b[^>]*>.*?</a>)|(?P<img><(?:img|source)\b[^>]*>)|(?P<md>!?\[[^\]\n]*\]\((?P<md_url>(?:[^()\s]|\([^()\s]*\))+)(?:\s+"[^"]*")?\))|(?P<bare>\b(?:[a-z][a-z0-9+.\-]*://|(?:data|javascript|vbscript):)[^\s<>`"']+)"#,
    )
    .expect("link regex should be valid")
});

static HREF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("href regex should be valid")
});

static SRC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("src regex should be valid")
});

/// Event handlers and the `alert` pseudo-attribute.
static DANGEROUS_ATTRIBUTE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)[\s/"'](?:on[a-z]+|alert)\s*="#)
        .expect("dangerous attribute regex should be valid")
});

/// URLs hidden inside an otherwise relative path.
static EMBEDDED_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?|ftp|mailto|tel|file|data|ssh|git):?//|www\.")
        .expect("embedded url regex should be valid")
});

#[derive(Debug, Clone)]
pub struct LinkSanitizer {
    allowed_hosts: Vec<String>,
}

impl LinkSanitizer {
    /// Hosts are matched exactly, case-insensitively; subdomains are not
    /// implied.
    pub fn new<I, S>(allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn sanitize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for code in CODE_REGEX.find_iter(text) {
            self.sanitize_prose(&text[last..code.start()], &mut out);
            out.push_str(code.as_str());
            last = code.end();
        }
        self.sanitize_prose(&text[last..], &mut out);

        out
    }

    fn sanitize_prose(&self, prose: &str, out: &mut String) {
        let mut last = 0;

        for caps in LINK_REGEX.captures_iter(prose) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&prose[last..whole.start()]);

            if let Some(bare) = caps.name("bare") {
                let (url, rest) = split_trailing(bare.as_str());
                push_wrapped(url, self.is_blocked(url), out);
                out.push_str(rest);
            } else {
                push_wrapped(whole.as_str(), self.is_element_blocked(&caps), out);
            }

            last = whole.end();
        }

        out.push_str(&prose[last..]);
    }

    fn is_element_blocked(&self, caps: &Captures<'_>) -> bool {
        if caps.name("script").is_some() {
            return true;
        }
        if let Some(tag) = caps.name("anchor").or_else(|| caps.name("img")) {
            let tag = tag.as_str();
            let opening = tag.split_once('>').map_or(tag, |(open, _)| open);
            if DANGEROUS_ATTRIBUTE_REGEX.is_match(opening) {
                return true;
            }
        }
        link_target(caps).is_some_and(|url| self.is_blocked(url))
    }

    /// Whether `url` must be neutralised.
    fn is_blocked(&self, url: &str) -> bool {
        let url = url.trim();
        match Url::parse(url) {
            Ok(parsed) => {
                !matches!(parsed.scheme(), "http" | "https")
                    || !parsed
                        .host_str()
                        .is_some_and(|host| self.is_allowed_host(host))
            }
            Err(ParseError::RelativeUrlWithoutBase) => !is_safe_relative(url),
            Err(_) => true,
        }
    }

    fn is_allowed_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| host == *allowed)
    }
}

/// A relative path that cannot be read as a link to somewhere else.
fn is_safe_relative(url: &str) -> bool {
    !url.starts_with("//") && !url.starts_with("\\\\") && !EMBEDDED_URL_REGEX.is_match(url)
}

fn push_wrapped(markup: &str, blocked: bool, out: &mut String) {
    if blocked {
        out.push('`');
        out.push_str(markup);
        out.push('`');
    } else {
        out.push_str(markup);
    }
}

fn link_target<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    if let Some(anchor) = caps.name("anchor") {
        return attribute(&HREF_REGEX, anchor.as_str());
    }
    if let Some(img) = caps.name("img") {
        return attribute(&SRC_REGEX, img.as_str());
    }
    caps.name("md_url").map(|m| m.as_str())
}

fn attribute<'t>(regex: &Regex, tag: &'t str) -> Option<&'t str> {
    regex
        .captures(tag)
        .and_then(|caps| caps.iter().skip(1).flatten().next())
        .map(|m| m.as_str())
}

/// Split sentence punctuation and unbalanced closing parens off a bare URL.
fn split_trailing(url: &str) -> (&str, &str) {
    let mut end = url.len();
    while let Some(last) = url[..end].chars().last() {
        let candidate = &url[..end];
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => candidate.matches(')').count() > candidate.matches('(').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        end -= last.len_utf8();
    }
    url.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> LinkSanitizer {
        LinkSanitizer::new(["docs.gitlab.com"])
    }

    #[test]
    fn markdown_links() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize("See [this](https://evil.example.com/x) now"),
            "See `[this](https://evil.example.com/x)` now"
        );
        assert_eq!(
            s.sanitize("See [docs](https://docs.gitlab.com/ee/user)"),
            "See [docs](https://docs.gitlab.com/ee/user)"
        );
        assert_eq!(
            s.sanitize("![img](https://tracker.example.com/p.png)"),
            "`![img](https://tracker.example.com/p.png)`"
        );
    }

    #[test]
    fn relative_links_are_left_alone() {
        let s = sanitizer();
        let text = "Open [the file](../app/models/user.rb) and [help](/help)";
        assert_eq!(s.sanitize(text), text);
    }

    #[test]
    fn relative_links_hiding_urls_are_wrapped() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize("[x](/redirect?to=https://evil.example.com)"),
            "`[x](/redirect?to=https://evil.example.com)`"
        );
        assert_eq!(
            s.sanitize("[x](//evil.example.com/a)"),
            "`[x](//evil.example.com/a)`"
        );
        assert_eq!(s.sanitize("[x](/go/www.evil.com)"), "`[x](/go/www.evil.com)`");
    }

    #[test]
    fn script_and_data_schemes_are_wrapped() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize("[click](javascript:alert(1))"),
            "`[click](javascript:alert(1))`"
        );
        assert_eq!(
            s.sanitize("[d](data:text/html;base64,PHNjcmlwdD4=)"),
            "`[d](data:text/html;base64,PHNjcmlwdD4=)`"
        );
        assert_eq!(
            s.sanitize("[m](mailto:someone@example.com)"),
            "`[m](mailto:someone@example.com)`"
        );
        assert_eq!(
            s.sanitize("try javascript:alert(1) now"),
            "try `javascript:alert(1)` now"
        );
        assert_eq!(
            s.sanitize("clone ssh://git.example.com/repo.git"),
            "clone `ssh://git.example.com/repo.git`"
        );
    }

    #[test]
    fn plain_words_with_colons_are_not_links() {
        let s = sanitizer();
        let text = "Note: the metadata:field and javascript: are fine.";
        assert_eq!(s.sanitize(text), text);
    }

    #[test]
    fn html_elements() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize(r#"Click <a href="https://phish.example.com">here</a>!"#),
            r#"Click `<a href="https://phish.example.com">here</a>`!"#
        );
        assert_eq!(
            s.sanitize(r#"<img src="https://tracker.example.com/pixel.gif">"#),
            r#"`<img src="https://tracker.example.com/pixel.gif">`"#
        );
        let allowed = r#"<a href="https://docs.gitlab.com/">docs</a>"#;
        assert_eq!(s.sanitize(allowed), allowed);
    }

    #[test]
    fn dangerous_html_is_wrapped() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize(r#"<a href="javascript:alert(1)">x</a>"#),
            r#"`<a href="javascript:alert(1)">x</a>`"#
        );
        assert_eq!(
            s.sanitize("<img src=x onerror=alert(1)>"),
            "`<img src=x onerror=alert(1)>`"
        );
        assert_eq!(
            s.sanitize(r#"<a href="https://docs.gitlab.com/" onclick="steal()">docs</a>"#),
            r#"`<a href="https://docs.gitlab.com/" onclick="steal()">docs</a>`"#
        );
        assert_eq!(
            s.sanitize("<script>fetch('/x')</script> done"),
            "`<script>fetch('/x')</script>` done"
        );
    }

    #[test]
    fn bare_urls_drop_trailing_punctuation() {
        let s = sanitizer();
        assert_eq!(
            s.sanitize("Visit https://evil.example.com/path."),
            "Visit `https://evil.example.com/path`."
        );
        assert_eq!(
            s.sanitize("(see https://evil.example.com/a)"),
            "(see `https://evil.example.com/a`)"
        );
        assert_eq!(
            s.sanitize("https://en.example.org/wiki/Rust_(language), ok"),
            "`https://en.example.org/wiki/Rust_(language)`, ok"
        );
    }

    #[test]
    fn hosts_match_exactly() {
        let s = LinkSanitizer::new(["gitlab.com"]);
        assert_eq!(s.sanitize("https://gitlab.com/x"), "https://gitlab.com/x");
        assert_eq!(s.sanitize("https://GITLAB.com/x"), "https://GITLAB.com/x");
        assert_eq!(
            s.sanitize("https://docs.gitlab.com/x"),
            "`https://docs.gitlab.com/x`"
        );
        assert_eq!(
            s.sanitize("https://notgitlab.com/x"),
            "`https://notgitlab.com/x`"
        );
    }

    #[test]
    fn code_is_untouched() {
        let s = sanitizer();
        let text = "Run `curl https://evil.example.com`\n```sh\ncurl https://evil.example.com\n```\n";
        assert_eq!(s.sanitize(text), text);
    }

    #[test]
    fn unterminated_fence_protects_the_rest() {
        let s = sanitizer();
        let text = "```\nhttps://evil.example.com";
        assert_eq!(s.sanitize(text), text);
    }

    #[test]
    fn plain_text_is_unchanged() {
        let s = sanitizer();
        assert_eq!(s.sanitize("Issue #123 is closed."), "Issue #123 is closed.");
        assert_eq!(s.sanitize(""), "");
    }
}
