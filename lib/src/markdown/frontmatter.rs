use std::borrow::Cow;

use crate::error::Result;

const PREFIX: &str = "+++\n";
const SUFFIX: &str = "\n+++\n";

/// Splits `+++`-delimited front matter off `input`, returning the front
/// matter and the remaining body. `None` if `input` has no front matter.
pub fn split(input: &str) -> Option<(&str, &str)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let rest = input.strip_prefix(PREFIX)
        .or_else(|| input.strip_prefix("+++\r\n"))?;

    if let Some(body) = rest.strip_prefix("+++\n") {
        return Some(("", body));
    }

    match rest.split_once(SUFFIX) {
        Some((front_matter, body)) => Some((front_matter, body)),
        None => rest.strip_suffix("\n+++").map(|front_matter| (front_matter, "")),
    }
}

/// Parses the front matter of `input` as TOML. Returns an empty table if
/// there is no front matter.
pub fn parse(input: &str) -> Result<(toml::Table, &str)> {
    match split(input) {
        Some((front_matter, body)) => Ok((toml::from_str(front_matter)?, body)),
        None => Ok((toml::Table::new(), input)),
    }
}

/// Strips front matter from the markdown source.
#[derive(Debug, Default, Clone)]
pub struct FrontMatter;

impl crate::markdown::Plugin for FrontMatter {
    fn name(&self) -> &'static str {
        "front-matter"
    }

    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        match split(input) {
            Some((_, body)) => Ok(Cow::Borrowed(body)),
            None => Ok(Cow::Borrowed(input)),
        }
    }
}
