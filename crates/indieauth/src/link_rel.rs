//! Link relation extraction
//!
//! Two sources of link relations are supported:
//!
//! - HTML `<link rel=... href=...>` tags, via an incremental scanner that
//!   tolerates truncated input. Discovery only reads the first chunk of a
//!   page, so the last tag is often cut off; a tag whose closing `>` was never
//!   seen is dropped rather than reported half-parsed.
//! - HTTP `Link` header values (RFC 8288).
//!
//! Only `<link>` extraction is implemented; this is not a general HTML parser.
//! Comments are skipped, as is the raw text of `<script>` and `<style>`
//! elements, so markup quoted inside inline code is never reported.

/// A `<link>` element that carried a `rel` attribute.
///
/// Attributes are kept in document order; names are lower-cased and values
/// have HTML entities decoded. A valueless attribute has `None` as its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRel {
    attributes: Vec<(String, Option<String>)>,
}

impl LinkRel {
    /// Look up an attribute value by (lower-case) name; the first occurrence wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// The raw `rel` attribute value
    pub fn rel(&self) -> Option<&str> {
        self.get("rel")
    }

    /// The `href` attribute value
    pub fn href(&self) -> Option<&str> {
        self.get("href")
    }

    /// Whether the space-separated `rel` list contains `relation` (ASCII case-insensitive)
    pub fn has_rel(&self, relation: &str) -> bool {
        self.rel()
            .is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case(relation)))
    }

    /// All attributes in the order they appeared
    pub fn attributes(&self) -> &[(String, Option<String>)] {
        &self.attributes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Text,
    Tag { quote: Option<char> },
    Comment,
    /// Inside `<script>` or `<style>`, waiting for the lower-case end tag prefix
    RawText { end_tag: &'static str },
}

/// Elements whose content is raw text, with the end tag that closes them
const RAW_TEXT_ELEMENTS: [(&str, &str); 2] = [("script", "</script"), ("style", "</style")];

/// Incremental `<link>` scanner.
///
/// Feed it text in as many pieces as arrive; only the bytes of a single open
/// tag are buffered. [`LinkRelScanner::finish`] discards any tag still open.
#[derive(Debug)]
pub struct LinkRelScanner {
    state: ScanState,
    buffer: String,
    found: Vec<LinkRel>,
}

impl Default for LinkRelScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkRelScanner {
    /// Create an empty scanner
    pub fn new() -> Self {
        Self {
            state: ScanState::Text,
            buffer: String::new(),
            found: Vec::new(),
        }
    }

    /// Scan another piece of the document
    pub fn feed(&mut self, chunk: &str) {
        for c in chunk.chars() {
            match self.state {
                ScanState::Text => {
                    if c == '<' {
                        self.buffer.clear();
                        self.state = ScanState::Tag { quote: None };
                    }
                }
                ScanState::Tag { quote: Some(q) } => {
                    self.buffer.push(c);
                    if c == q {
                        self.state = ScanState::Tag { quote: None };
                    }
                }
                ScanState::Tag { quote: None } => match c {
                    '>' => {
                        self.state = self.complete_tag();
                    }
                    '"' | '\'' if self.buffer.trim_end().ends_with('=') => {
                        self.buffer.push(c);
                        self.state = ScanState::Tag { quote: Some(c) };
                    }
                    _ => {
                        self.buffer.push(c);
                        if self.buffer == "!--" {
                            self.buffer.clear();
                            self.state = ScanState::Comment;
                        }
                    }
                },
                ScanState::Comment => {
                    self.buffer.push(c);
                    if self.buffer.ends_with("-->") {
                        self.buffer.clear();
                        self.state = ScanState::Text;
                    } else {
                        keep_tail(&mut self.buffer, 2);
                    }
                }
                ScanState::RawText { end_tag } => {
                    self.buffer.push(c.to_ascii_lowercase());
                    if self.buffer.ends_with(end_tag) {
                        // The rest of the end tag is scanned as an ordinary tag
                        self.buffer.clear();
                        self.state = ScanState::Tag { quote: None };
                    } else {
                        keep_tail(&mut self.buffer, end_tag.len() - 1);
                    }
                }
            }
        }
    }

    /// Finish scanning, dropping any incomplete trailing tag
    pub fn finish(mut self) -> Vec<LinkRel> {
        self.buffer.clear();
        self.found
    }

    /// Handle the buffered tag whose `>` was just seen and pick the next state
    fn complete_tag(&mut self) -> ScanState {
        let tag = self.buffer.trim_start();
        let name_end = tag
            .find(|c: char| c.is_ascii_whitespace() || c == '/')
            .unwrap_or(tag.len());
        let name = &tag[..name_end];

        if let Some(&(_, end_tag)) = RAW_TEXT_ELEMENTS
            .iter()
            .find(|(element, _)| name.eq_ignore_ascii_case(element))
        {
            self.buffer.clear();
            return ScanState::RawText { end_tag };
        }

        if name.eq_ignore_ascii_case("link") {
            let attributes = parse_attributes(&tag[name_end..]);
            if attributes.iter().any(|(name, _)| name == "rel") {
                self.found.push(LinkRel { attributes });
            }
        }
        ScanState::Text
    }
}

/// Drop all but the last `max` bytes of `buffer`, keeping whole characters
fn keep_tail(buffer: &mut String, max: usize) {
    if buffer.len() <= max {
        return;
    }
    let start = (buffer.len() - max..=buffer.len())
        .find(|i| buffer.is_char_boundary(*i))
        .unwrap_or(buffer.len());
    buffer.drain(..start);
}

fn parse_attributes(input: &str) -> Vec<(String, Option<String>)> {
    let mut attributes = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let name_end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (raw, remaining) = match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    match body.find(q) {
                        Some(end) => (&body[..end], &body[end + 1..]),
                        None => (body, ""),
                    }
                }
                _ => {
                    let end = after_eq
                        .find(|c: char| c.is_ascii_whitespace())
                        .unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            rest = remaining;
            Some(html_escape::decode_html_entities(raw).into_owned())
        } else {
            None
        };

        if !name.is_empty() {
            attributes.push((name, value));
        }
    }

    attributes
}

/// Extract every `<link>` element carrying a `rel` attribute, in document order.
///
/// Accepts a fragment or a truncated prefix of a document; a trailing tag
/// without its closing `>` is omitted.
pub fn parse_link_rels(html: &str) -> Vec<LinkRel> {
    let mut scanner = LinkRelScanner::new();
    scanner.feed(html);
    scanner.finish()
}

/// One entry of an HTTP `Link` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHeaderEntry {
    /// The URI reference between `<` and `>`, unresolved
    pub target: String,
    /// Relation types from the `rel` parameter
    pub rels: Vec<String>,
}

impl LinkHeaderEntry {
    /// Whether this entry carries `relation` (ASCII case-insensitive)
    pub fn has_rel(&self, relation: &str) -> bool {
        self.rels.iter().any(|r| r.eq_ignore_ascii_case(relation))
    }
}

/// Parse a `Link` header value into its entries.
///
/// Handles comma-separated entries, quoted and bare parameter values and
/// space-separated relation lists. Malformed entries are skipped.
///
/// ```
/// use indieauth::link_rel::parse_link_header;
///
/// let entries = parse_link_header(
///     r#"<https://example.com/auth>; rel="authorization_endpoint", </token>; rel=token_endpoint"#,
/// );
/// assert_eq!(entries[0].target, "https://example.com/auth");
/// assert!(entries[1].has_rel("token_endpoint"));
/// ```
pub fn parse_link_header(value: &str) -> Vec<LinkHeaderEntry> {
    let mut entries = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == ',');
        let Some(after_open) = rest.strip_prefix('<') else {
            break;
        };
        let Some(close) = after_open.find('>') else {
            break;
        };
        let target = after_open[..close].trim().to_string();
        rest = &after_open[close + 1..];

        let mut rels = Vec::new();
        loop {
            rest = rest.trim_start();
            let Some(after_semi) = rest.strip_prefix(';') else {
                break;
            };
            let param = after_semi.trim_start();
            let name_end = param.find(['=', ';', ',']).unwrap_or(param.len());
            let name = param[..name_end].trim().to_ascii_lowercase();
            rest = &param[name_end..];

            let mut value = String::new();
            if let Some(after_eq) = rest.strip_prefix('=') {
                let after_eq = after_eq.trim_start();
                if let Some(quoted) = after_eq.strip_prefix('"') {
                    let end = quoted.find('"').unwrap_or(quoted.len());
                    value = quoted[..end].to_string();
                    rest = quoted.get(end + 1..).unwrap_or("");
                } else {
                    let end = after_eq.find([';', ',']).unwrap_or(after_eq.len());
                    value = after_eq[..end].trim().to_string();
                    rest = &after_eq[end..];
                }
            }

            if name == "rel" && rels.is_empty() {
                rels = value.split_ascii_whitespace().map(str::to_string).collect();
            }
        }

        entries.push(LinkHeaderEntry { target, rels });

        // Skip anything unparsed up to the next entry
        match rest.find(',') {
            Some(comma) => rest = &rest[comma..],
            None => break,
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(rels: &[LinkRel]) -> Vec<(Option<&str>, Option<&str>)> {
        rels.iter().map(|r| (r.rel(), r.href())).collect()
    }

    #[test]
    fn test_parse_link_rels_document_order() {
        let html = r#"
    <!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Aaron Parecki</title>
      <link rel="authorization_endpoint" href="https://aaronparecki.com/auth">
  <link rel="token_endpoint" href="https://aaronparecki.com/auth/token">
  <link rel="micropub" href="https://aaronparecki.com/micropub">
    "#;
        assert_eq!(
            pairs(&parse_link_rels(html)),
            vec![
                (Some("authorization_endpoint"), Some("https://aaronparecki.com/auth")),
                (Some("token_endpoint"), Some("https://aaronparecki.com/auth/token")),
                (Some("micropub"), Some("https://aaronparecki.com/micropub")),
            ]
        );
    }

    #[test]
    fn test_parse_link_rels_drops_truncated_tag() {
        let html = r#"
    <title>Aaron Parecki</title>
      <link rel="authorization_endpoint" href="https://aaronparecki.com/auth">
  <link rel="token_endpoint" href="https://aaronparecki."#;
        assert_eq!(
            pairs(&parse_link_rels(html)),
            vec![(Some("authorization_endpoint"), Some("https://aaronparecki.com/auth"))]
        );
    }

    #[test]
    fn test_scanner_across_chunks() {
        let mut scanner = LinkRelScanner::new();
        scanner.feed(r#"<link rel="me" hr"#);
        scanner.feed(r#"ef="https://a.example/">"#);
        scanner.feed(r#"<link rel="authorization_endpoint" "#);
        let rels = scanner.finish();
        assert_eq!(pairs(&rels), vec![(Some("me"), Some("https://a.example/"))]);
    }

    #[test]
    fn test_attribute_forms() {
        let rels = parse_link_rels(
            r#"<LINK REL=authorization_endpoint HREF='/auth?a=1&amp;b=2' crossorigin/>"#,
        );
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].rel(), Some("authorization_endpoint"));
        assert_eq!(rels[0].href(), Some("/auth?a=1&b=2"));
        assert_eq!(
            rels[0].attributes(),
            &[
                ("rel".to_string(), Some("authorization_endpoint".to_string())),
                ("href".to_string(), Some("/auth?a=1&b=2".to_string())),
                ("crossorigin".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_ignores_non_link_and_rel_less_tags() {
        let rels = parse_link_rels(
            r#"<a rel="me" href="https://x.example/"><link href="/style.css"><linked rel="x">"#,
        );
        assert!(rels.is_empty());
    }

    #[test]
    fn test_quoted_gt_does_not_close_tag() {
        let rels = parse_link_rels(r#"<link title="a > b" rel="token_endpoint" href="/t">"#);
        assert_eq!(pairs(&rels), vec![(Some("token_endpoint"), Some("/t"))]);
    }

    #[test]
    fn test_comments_are_skipped() {
        let rels = parse_link_rels(
            r#"<!-- <link rel="authorization_endpoint" href="/old"> --><link rel="authorization_endpoint" href="/new">"#,
        );
        assert_eq!(pairs(&rels), vec![(Some("authorization_endpoint"), Some("/new"))]);
    }

    #[test]
    fn test_script_content_is_not_scanned() {
        let rels = parse_link_rels(
            "<script>document.write('<link rel=\"authorization_endpoint\" href=\"https://evil.test/\">');</script>\n<link rel=\"authorization_endpoint\" href=\"https://real.test/auth\">",
        );
        assert_eq!(
            pairs(&rels),
            vec![(Some("authorization_endpoint"), Some("https://real.test/auth"))]
        );
    }

    #[test]
    fn test_style_content_and_end_tag_case() {
        let rels = parse_link_rels(
            r#"<STYLE type="text/css">/* <link rel="token_endpoint" href="/fake"> */</Style ><link rel="token_endpoint" href="/token">"#,
        );
        assert_eq!(pairs(&rels), vec![(Some("token_endpoint"), Some("/token"))]);
    }

    #[test]
    fn test_script_end_tag_split_across_chunks() {
        // GIVEN a script whose end tag arrives in two pieces
        let mut scanner = LinkRelScanner::new();
        scanner.feed(r#"<script src="/app.js">var s = "<link rel='me' href='/x'>"; </scr"#);
        scanner.feed(r#"ipt><link rel="me" href="https://a.example/">"#);

        // THEN only the tag after the script is found
        let rels = scanner.finish();
        assert_eq!(pairs(&rels), vec![(Some("me"), Some("https://a.example/"))]);
    }

    #[test]
    fn test_unclosed_script_hides_the_rest() {
        let rels = parse_link_rels(r#"<script>if (a <b) {<link rel="me" href="/x">"#);
        assert!(rels.is_empty());
    }

    #[test]
    fn test_has_rel_multi_valued() {
        let rels = parse_link_rels(r#"<link rel="me Authorization_Endpoint" href="/a">"#);
        assert!(rels[0].has_rel("authorization_endpoint"));
        assert!(rels[0].has_rel("me"));
        assert!(!rels[0].has_rel("token_endpoint"));
    }

    #[test]
    fn test_parse_link_header_entries() {
        let entries = parse_link_header(
            r#"<https://aaronparecki.com/auth>; rel="authorization_endpoint", <https://aaronparecki.com/token>; rel="token_endpoint""#,
        );
        assert_eq!(
            entries,
            vec![
                LinkHeaderEntry {
                    target: "https://aaronparecki.com/auth".to_string(),
                    rels: vec!["authorization_endpoint".to_string()],
                },
                LinkHeaderEntry {
                    target: "https://aaronparecki.com/token".to_string(),
                    rels: vec!["token_endpoint".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_parse_link_header_params_and_multi_rel() {
        let entries = parse_link_header(
            r#"</a,b>; title="x, y"; rel="authorization_endpoint token_endpoint"; type=text/html, <https://e.example/>; rel=me"#,
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].target, "/a,b");
        assert!(entries[0].has_rel("authorization_endpoint"));
        assert!(entries[0].has_rel("token_endpoint"));
        assert_eq!(entries[1].rels, vec!["me".to_string()]);
    }

    #[test]
    fn test_parse_link_header_malformed() {
        assert!(parse_link_header("").is_empty());
        assert!(parse_link_header("no angle brackets; rel=x").is_empty());
        assert!(parse_link_header("<unterminated; rel=x").is_empty());
    }
}
