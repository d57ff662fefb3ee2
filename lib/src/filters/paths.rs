use serde::{Deserialize, Serialize};

use crate::util::slugify;

/// Where the site's sources live, for "edit this page" links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub url: String,
    #[serde(default = "Repository::default_branch")]
    pub branch: String,
    #[serde(default)]
    pub content_path: String,
}

impl Repository {
    fn default_branch() -> String {
        "main".into()
    }
}

/// The slug of the last meaningful segment of `path`: the extension and a
/// trailing `index` segment are dropped before slugifying.
///
/// ```rust
/// use folio::filters::path_slug;
///
/// assert_eq!(path_slug("/en/blog/My Post/index.md"), "my-post");
/// assert_eq!(path_slug("guides/setup.md"), "setup");
/// assert_eq!(path_slug(&path_slug("guides/setup.md")), "setup");
/// ```
pub fn path_slug(path: &str) -> String {
    fn stem(segment: &str) -> &str {
        match segment.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => segment,
        }
    }

    let mut segments = path.split(['/', '\\']).filter(|s| !s.is_empty()).rev();
    let Some(last) = segments.next().map(stem) else {
        return String::new();
    };

    match last {
        "index" => segments.next().map_or_else(|| slugify(last), slugify),
        _ => slugify(last),
    }
}

fn strip_leading<F: Fn(&str) -> bool>(path: &str, strip: F) -> String {
    let absolute = path.starts_with('/');
    let mut rest = path.trim_start_matches('/');
    loop {
        let (segment, tail) = rest.split_once('/').unwrap_or((rest, ""));
        if segment.is_empty() || !strip(segment) {
            break;
        }

        rest = tail.trim_start_matches('/');
    }

    match absolute {
        true => format!("/{rest}"),
        false => rest.to_string(),
    }
}

/// Removes every leading `blog` segment from `path`.
pub fn strip_blog(path: &str) -> String {
    strip_leading(path, |segment| segment == "blog")
}

/// Removes every leading segment of `path` that is one of `languages`.
pub fn strip_language<S: AsRef<str>>(path: &str, languages: &[S]) -> String {
    strip_leading(path, |segment| languages.iter().any(|l| l.as_ref() == segment))
}

/// The source link of `path` in `repository`. Never touches the network.
pub fn github_link(path: &str, repository: &Repository) -> String {
    let url = repository.url.trim_end_matches('/');
    let branch = repository.branch.trim_matches('/');
    let path = path.trim_start_matches('/');
    match repository.content_path.trim_matches('/') {
        "" => format!("{url}/blob/{branch}/{path}"),
        content => format!("{url}/blob/{branch}/{content}/{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATHS: &[&str] = &[
        "", "/", "index.md", "/en/blog/hello-world/", "/en/blog/Hello World/index.md",
        "blog/blog/x", "/fr/en/blog/post.html", "//en//guide/", "a.b.c", ".hidden",
        "/blog", "en", "/es/blog/index/",
    ];

    #[test]
    fn slugs() {
        assert_eq!(path_slug("/en/blog/hello-world/"), "hello-world");
        assert_eq!(path_slug("/en/blog/Hello World/index.md"), "hello-world");
        assert_eq!(path_slug("/es/blog/index/"), "blog");
        assert_eq!(path_slug("index.md"), "index");
        assert_eq!(path_slug("a.b.c"), "a-b");
        assert_eq!(path_slug(".hidden"), "hidden");
        assert_eq!(path_slug(""), "");
    }

    #[test]
    fn strips() {
        assert_eq!(strip_blog("/blog/post/"), "/post/");
        assert_eq!(strip_blog("blog/blog/x"), "x");
        assert_eq!(strip_blog("/en/blog/post/"), "/en/blog/post/");
        assert_eq!(strip_blog("/blog"), "/");

        let languages = ["en", "fr"];
        assert_eq!(strip_language("/en/blog/post/", &languages), "/blog/post/");
        assert_eq!(strip_language("/fr/en/blog/post.html", &languages), "/blog/post.html");
        assert_eq!(strip_language("/es/blog/", &languages), "/es/blog/");
        assert_eq!(strip_blog(&strip_language("/en/blog/post/", &languages)), "/post/");
    }

    #[test]
    fn idempotent() {
        let languages = ["en", "fr", "es"];
        for path in PATHS {
            let slug = path_slug(path);
            assert_eq!(path_slug(&slug), slug, "{path}");

            let stripped = strip_blog(path);
            assert_eq!(strip_blog(&stripped), stripped, "{path}");

            let stripped = strip_language(path, &languages);
            assert_eq!(strip_language(&stripped, &languages), stripped, "{path}");
        }
    }

    #[test]
    fn links() {
        let repository = Repository {
            url: "https://github.com/acme/site/".into(),
            branch: "main".into(),
            content_path: "/content/".into(),
        };

        assert_eq!(github_link("/en/post.md", &repository),
            "https://github.com/acme/site/blob/main/content/en/post.md");

        let repository = Repository { content_path: "".into(), ..repository };
        assert_eq!(github_link("post.md", &repository),
            "https://github.com/acme/site/blob/main/post.md");
    }
}
