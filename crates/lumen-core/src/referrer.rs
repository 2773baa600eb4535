use url::Url;

/// Ordered table of well-known referrer sources. The first entry whose
/// pattern is a substring of the referrer hostname wins, so more specific
/// patterns must precede the generic ones they contain.
const KNOWN_SOURCES: &[(&str, &str)] = &[
    ("google", "Google"),
    ("bing", "Bing"),
    ("duckduckgo", "DuckDuckGo"),
    ("yahoo", "Yahoo"),
    ("yandex", "Yandex"),
    ("baidu", "Baidu"),
    ("ecosia", "Ecosia"),
    ("facebook", "Facebook"),
    ("instagram", "Instagram"),
    ("t.co", "Twitter"),
    ("twitter", "Twitter"),
    ("x.com", "Twitter"),
    ("linkedin", "LinkedIn"),
    ("reddit", "Reddit"),
    ("youtube", "YouTube"),
    ("tiktok", "TikTok"),
    ("pinterest", "Pinterest"),
    ("news.ycombinator", "Hacker News"),
    ("github", "GitHub"),
    ("gitlab", "GitLab"),
    ("stackoverflow", "Stack Overflow"),
    ("medium", "Medium"),
    ("substack", "Substack"),
];

/// Map a referrer URL to a source label.
///
/// Empty input → "Direct" (the visitor typed the address or followed a
/// stripped-referrer link). Input the URL parser rejects or that has no
/// hostname → "Unknown". Otherwise the known-source table is consulted in
/// declaration order; with no match the bare hostname is returned, minus a
/// leading "www.".
pub fn resolve(referrer: &str) -> String {
    if referrer.is_empty() {
        return "Direct".to_string();
    }

    let host = match Url::parse(referrer) {
        Ok(parsed) => match parsed.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return "Unknown".to_string(),
        },
        Err(_) => return "Unknown".to_string(),
    };

    for (pattern, label) in KNOWN_SOURCES {
        if host.contains(pattern) {
            return (*label).to_string();
        }
    }

    host.trim_start_matches("www.").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_direct() {
        assert_eq!(resolve(""), "Direct");
    }

    #[test]
    fn unparseable_is_unknown() {
        assert_eq!(resolve("not a url"), "Unknown");
        assert_eq!(resolve("android-app:/relative"), "Unknown");
    }

    #[test]
    fn search_engines_resolve_to_labels() {
        assert_eq!(resolve("https://www.google.com/search?q=x"), "Google");
        assert_eq!(resolve("https://www.google.co.uk/"), "Google");
        assert_eq!(resolve("https://duckduckgo.com/?q=privacy"), "DuckDuckGo");
    }

    #[test]
    fn social_and_code_hosts_resolve_to_labels() {
        assert_eq!(resolve("https://t.co/abc123"), "Twitter");
        assert_eq!(resolve("https://news.ycombinator.com/item?id=1"), "Hacker News");
        assert_eq!(resolve("https://github.com/rust-lang/rust"), "GitHub");
    }

    #[test]
    fn unlisted_host_falls_back_to_bare_hostname() {
        assert_eq!(resolve("https://www.example.org/post/1"), "example.org");
        assert_eq!(resolve("https://blog.acme.dev/launch"), "blog.acme.dev");
    }

    #[test]
    fn first_table_match_wins() {
        // Hostname contains both "google" and an unlisted suffix; table order decides.
        assert_eq!(resolve("https://google.example-cdn.net/"), "Google");
    }
}
