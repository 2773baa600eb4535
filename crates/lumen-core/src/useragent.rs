use woothee::parser::Parser;

/// Classified user-agent fields, one per inbound request.
///
/// Unknown values are empty strings (never None — the row schema has no
/// nullable columns); `device_type` always falls back to "desktop".
#[derive(Debug, Clone, Default)]
pub struct UserAgentInfo {
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device_type: String,
    pub is_bot: bool,
}

/// Automation signatures, matched case-insensitively as substrings.
/// "Googlebot" is caught by "bot"; the list covers headless frameworks the
/// generic terms miss.
const BOT_SIGNATURES: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "scraper",
    "headless",
    "phantom",
    "selenium",
    "puppeteer",
    "playwright",
];

/// Classify a raw `User-Agent` string.
///
/// Parsing via `woothee`; its category maps to our device_type convention:
///   "smartphone" / "mobilephone" → "mobile"
///   "tablet"                     → "tablet"
///   everything else              → "desktop"
///
/// A UA is flagged as a bot when it matches the signature list or when
/// woothee itself classifies it as a crawler. An empty UA parses to empty
/// fields and is not treated as a bot.
pub fn classify(user_agent: &str) -> UserAgentInfo {
    let lowered = user_agent.to_ascii_lowercase();
    let mut is_bot = BOT_SIGNATURES.iter().any(|sig| lowered.contains(sig));

    let mut info = UserAgentInfo {
        device_type: "desktop".to_string(),
        is_bot,
        ..UserAgentInfo::default()
    };

    if user_agent.is_empty() {
        return info;
    }

    if let Some(result) = Parser::new().parse(user_agent) {
        if result.category == "crawler" {
            is_bot = true;
        }
        let device_type = match result.category {
            "smartphone" | "mobilephone" => "mobile",
            "tablet" => "tablet",
            _ => "desktop",
        };
        // woothee reports "UNKNOWN" for fields it cannot identify;
        // normalise those to empty strings.
        info = UserAgentInfo {
            browser: clean(result.name),
            browser_version: clean(&result.version),
            os: clean(result.os),
            os_version: clean(&result.os_version),
            device_type: device_type.to_string(),
            is_bot,
        };
    }

    info
}

fn clean(value: &str) -> String {
    if value == "UNKNOWN" {
        String::new()
    } else {
        value.to_string()
    }
}
