//! Category URL normalization and collision handling.

use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;

use crate::error::{AppError, AppResult};

/// Runs of characters that are neither letters nor digits.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex literal"));

/// Lowercase `text` and collapse everything but letters and digits into
/// single hyphens.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    SEPARATORS
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Normalize a category URL, slugifying each `/`-separated segment and
/// dropping empty ones.
pub fn tidy_url(url: &str) -> String {
    url.split('/')
        .map(slugify)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Append `slug` below `parent`.
pub fn child_url(parent: Option<&str>, slug: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{parent}/{slug}"),
        _ => slug.to_string(),
    }
}

/// Return `candidate`, or `candidate` with the next free numeric suffix when
/// it is already taken.
///
/// With `news` and `news4` taken, `news` resolves to `news5`.
pub fn disambiguate<'a, I>(candidate: &str, existing: I) -> AppResult<String>
where
    I: IntoIterator<Item = &'a str>,
{
    if candidate.is_empty() {
        return Err(AppError::MissingOrEmptyValue("url"));
    }

    let pattern = format!("^{}([0-9]*)$", regex::escape(candidate));
    let re = Regex::new(&pattern).context("failed to build url pattern")?;

    let mut taken = false;
    let mut highest: u64 = 0;
    for url in existing {
        let Some(caps) = re.captures(url) else {
            continue;
        };
        let suffix = caps.get(1).map_or("", |m| m.as_str());
        if suffix.is_empty() {
            taken = true;
        } else if let Ok(n) = suffix.parse::<u64>() {
            highest = highest.max(n);
        }
    }

    if !taken {
        return Ok(candidate.to_string());
    }
    Ok(format!("{candidate}{}", highest.saturating_add(1)))
}
