//! engine::resolve
//!
//! Maps an article identifier to the stored paths that belong to it.
//!
//! # Matching rules
//!
//! For slug `foo`, article root `posts`, image root `img`, and extensions
//! `md`, `mdx`, the candidates are:
//!
//! ```text
//! posts/foo.md
//! posts/foo.mdx
//! img/foo/**
//! ```
//!
//! All comparisons are on lower-cased paths. A stored path that differs
//! from a candidate only by case is the same article, so every case variant
//! is selected and a warning is logged.
//!
//! # Output order
//!
//! Article files in extension order (listing order within one extension),
//! then image paths in listing order. No path appears twice.

use std::collections::HashSet;

use tracing::warn;

use crate::core::config::Config;
use crate::core::types::ArticleSlug;

/// Resolves identifiers against a path listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    article_root: String,
    image_root: String,
    extensions: Vec<String>,
}

impl PathResolver {
    pub fn new(
        article_root: impl Into<String>,
        image_root: impl Into<String>,
        extensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            article_root: normalize_root(&article_root.into()),
            image_root: normalize_root(&image_root.into()),
            extensions: extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_string())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.article_root(),
            config.image_root(),
            config.article_extensions().iter().cloned(),
        )
    }

    /// Lower-cased article file candidates, one per extension.
    pub fn article_candidates(&self, slug: &ArticleSlug) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| join(&self.article_root, &format!("{}.{}", slug.as_str(), ext)))
            .collect()
    }

    /// Lower-cased image directory candidate, with a trailing `/`.
    pub fn image_dir_candidate(&self, slug: &ArticleSlug) -> String {
        format!("{}/", join(&self.image_root, &slug.folded()))
    }

    /// Select every stored path that belongs to `slug`.
    ///
    /// Returns an empty vector when nothing matches.
    pub fn resolve(&self, slug: &ArticleSlug, existing: &[String]) -> Vec<String> {
        let folded: Vec<String> = existing.iter().map(|p| p.to_lowercase()).collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut matched = Vec::new();

        for candidate in self.article_candidates(slug) {
            let variants: Vec<&String> = existing
                .iter()
                .zip(&folded)
                .filter(|(_, lower)| **lower == candidate)
                .map(|(path, _)| path)
                .collect();
            if variants.len() > 1 {
                warn!(
                    slug = slug.as_str(),
                    variants = ?variants,
                    "article file exists in several case variants, removing all"
                );
            }
            for path in variants {
                if seen.insert(path.as_str()) {
                    matched.push(path.clone());
                }
            }
        }

        let dir = self.image_dir_candidate(slug);
        let depth = self.image_root.split('/').filter(|c| !c.is_empty()).count();
        let mut dir_names: Vec<&str> = Vec::new();
        for (path, lower) in existing.iter().zip(&folded) {
            if !lower.starts_with(&dir) {
                continue;
            }
            if let Some(name) = path.split('/').nth(depth) {
                if !dir_names.contains(&name) {
                    dir_names.push(name);
                }
            }
            if seen.insert(path.as_str()) {
                matched.push(path.clone());
            }
        }
        if dir_names.len() > 1 {
            warn!(
                slug = slug.as_str(),
                variants = ?dir_names,
                "image directory exists in several case variants, removing all"
            );
        }

        matched
    }
}

fn normalize_root(root: &str) -> String {
    root.trim_matches('/').to_string()
}

fn join(root: &str, name: &str) -> String {
    if root.is_empty() {
        name.to_lowercase()
    } else {
        format!("{}/{}", root, name).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new("articles", "images", ["md", "mdx"])
    }

    fn slug(s: &str) -> ArticleSlug {
        ArticleSlug::new(s).unwrap()
    }

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    mod candidates {
        use super::*;

        #[test]
        fn article_candidates_per_extension() {
            assert_eq!(
                resolver().article_candidates(&slug("My-Post")),
                vec!["articles/my-post.md", "articles/my-post.mdx"]
            );
        }

        #[test]
        fn image_dir_has_trailing_slash() {
            assert_eq!(resolver().image_dir_candidate(&slug("Foo")), "images/foo/");
        }

        #[test]
        fn roots_are_normalized() {
            let r = PathResolver::new("/src/content/blog/", "public/images/", [".md"]);
            assert_eq!(
                r.article_candidates(&slug("x")),
                vec!["src/content/blog/x.md"]
            );
            assert_eq!(r.image_dir_candidate(&slug("x")), "public/images/x/");
        }

        #[test]
        fn empty_root_addresses_repo_top_level() {
            let r = PathResolver::new("", "", ["md"]);
            assert_eq!(r.article_candidates(&slug("x")), vec!["x.md"]);
            assert_eq!(r.image_dir_candidate(&slug("x")), "x/");
        }
    }

    mod resolve {
        use super::*;

        #[test]
        fn article_and_image_directory() {
            let existing = paths(&["articles/foo.md", "images/foo/logo.png", "articles/bar.md"]);
            assert_eq!(
                resolver().resolve(&slug("foo"), &existing),
                vec!["articles/foo.md", "images/foo/logo.png"]
            );
        }

        #[test]
        fn case_insensitive_identifier() {
            let existing = paths(&["articles/my-post.md"]);
            assert_eq!(
                resolver().resolve(&slug("My-Post"), &existing),
                vec!["articles/my-post.md"]
            );
        }

        #[test]
        fn case_insensitive_stored_paths() {
            let existing = paths(&["articles/My-Post.MD", "images/MY-POST/a.PNG"]);
            assert_eq!(
                resolver().resolve(&slug("my-post"), &existing),
                vec!["articles/My-Post.MD", "images/MY-POST/a.PNG"]
            );
        }

        #[test]
        fn both_extension_variants() {
            let existing = paths(&["articles/foo.mdx", "articles/foo.md"]);
            assert_eq!(
                resolver().resolve(&slug("foo"), &existing),
                vec!["articles/foo.md", "articles/foo.mdx"]
            );
        }

        #[test]
        fn nested_image_directories() {
            let existing = paths(&["images/foo/a.png", "images/foo/sub/b.png"]);
            assert_eq!(resolver().resolve(&slug("foo"), &existing).len(), 2);
        }

        #[test]
        fn prefix_of_other_slug_does_not_match() {
            let existing = paths(&[
                "articles/foobar.md",
                "articles/foo.md.bak",
                "images/foobar/a.png",
                "images/foo.png",
            ]);
            assert!(resolver().resolve(&slug("foo"), &existing).is_empty());
        }

        #[test]
        fn nothing_matches() {
            let existing = paths(&["articles/bar.md"]);
            assert!(resolver().resolve(&slug("foo"), &existing).is_empty());
        }

        #[test]
        fn case_collisions_remove_all_variants() {
            let existing = paths(&[
                "articles/Foo.md",
                "articles/foo.md",
                "images/Foo/a.png",
                "images/foo/b.png",
            ]);
            assert_eq!(
                resolver().resolve(&slug("FOO"), &existing),
                vec![
                    "articles/Foo.md",
                    "articles/foo.md",
                    "images/Foo/a.png",
                    "images/foo/b.png"
                ]
            );
        }

        #[test]
        fn duplicates_in_listing_are_dropped() {
            let existing = paths(&["articles/foo.md", "articles/foo.md"]);
            assert_eq!(
                resolver().resolve(&slug("foo"), &existing),
                vec!["articles/foo.md"]
            );
        }
    }
}
