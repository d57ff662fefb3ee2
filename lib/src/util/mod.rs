/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        let ascii = match deunicode::deunicode_char(ch) {
            Some(ascii) if !ch.is_whitespace() && !ascii.is_empty() => ascii,
            _ => "-",
        };

        for b in ascii.bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => {
                    // All sequences of characters that aren't alphanumeric or
                    // `_` collapse into one `-`.
                    need_dash = !output.is_empty();
                }
            }
        }
    }

    output
}

/// Returns `true` if `input` is likely to contain a template.
pub fn is_template(input: &str) -> bool {
    let mut slice = input.as_bytes();
    while let Some(i) = memchr::memchr(b'{', slice) {
        match slice.get(i + 1) {
            Some(b'{') | Some(b'%') => return true,
            Some(_) => slice = &slice[(i + 1)..],
            None => return false,
        }
    }

    false
}

/// `string` escaped for element content or a double-quoted attribute value.
pub fn escape_html(string: &str) -> String {
    let mut output = String::with_capacity(string.len());
    let _ = pulldown_cmark_escape::escape_html(&mut output, string);
    output
}

/// `url` escaped for an `href` or `src` attribute.
pub fn escape_href(url: &str) -> String {
    let mut output = String::with_capacity(url.len());
    let _ = pulldown_cmark_escape::escape_href(&mut output, url);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Test String!!!1!1"), "my-test-string-1-1");
        assert_eq!(slugify("test\nit   now!"), "test-it-now");
        assert_eq!(slugify("tab\tseparated\r\nwords"), "tab-separated-words");
        assert_eq!(slugify("non\u{a0}breaking"), "non-breaking");
        assert_eq!(slugify("  --test_-_cool- -  "), "test_-_cool");
        assert_eq!(slugify("Æúű--cool?"), "aeuu-cool");
        assert_eq!(slugify("You & Me"), "you-me");
        assert_eq!(slugify(&slugify("You & Me")), "you-me");
    }

    #[test]
    fn test_is_template() {
        assert!(is_template("Hello {{ name }}"));
        assert!(is_template("{% if x %}y{% endif %}"));
        assert!(!is_template("a { b } c"));
        assert!(!is_template("trailing {"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">Tom & Jerry</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&lt;/a&gt;");

        assert_eq!(escape_href("/a b/?q=\"x\"&y"), "/a%20b/?q=%22x%22&amp;y");
    }
}
