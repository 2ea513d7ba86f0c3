//! Coarse device labels derived from a `User-Agent` header.
//!
//! Labels are informational (shown next to sessions and in login emails),
//! so a small ordered table of patterns is enough. Order matters: Android
//! user agents also mention Linux, and Edge/Opera also mention Chrome.

use std::sync::LazyLock;

use regex::Regex;

static PLATFORMS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)Android", "Android"),
        (r"(?i)Linux", "Linux"),
        (r"(?i)iPhone", "iPhone"),
        (r"(?i)iPad", "iPad"),
        (r"(?i)iPod", "iPod"),
        (r"(?i)Macintosh|Mac OS X", "Mac"),
        (r"(?i)Windows|Win32|Win64", "Windows"),
    ])
});

static BROWSERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)OPR", "Opera"),
        (r"(?i)Edg", "Microsoft Edge"),
        (r"(?i)FxiOS|Firefox", "Mozilla Firefox"),
        (r"(?i)CriOS|Chrome", "Google Chrome"),
        (r"(?i)Version.*Safari|Safari.*Version", "Safari"),
    ])
});

fn compile(table: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .map(|(pattern, name)| (Regex::new(pattern).expect("valid regex"), *name))
        .collect()
}

fn first_match(table: &[(Regex, &'static str)], user_agent: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(re, _)| re.is_match(user_agent))
        .map(|(_, name)| *name)
}

/// Build a `"Platform:Browser"` label, or `None` when either part is unknown.
pub fn device_label(user_agent: &str) -> Option<String> {
    let platform = first_match(&PLATFORMS, user_agent)?;
    let browser = first_match(&BROWSERS, user_agent)?;
    Some(format!("{platform}:{browser}"))
}
