use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

pub(crate) const UNKNOWN_TITLE: &str = "Unknown Series";

// Tried in order, first non-empty text wins.
selector!(TITLE_ENTRY_SELECTOR, "h1.entry-title");
selector!(TITLE_H1_SELECTOR, "h1");
selector!(TITLE_POST_SELECTOR, "div.post-title h1");
selector!(TITLE_BIG_SELECTOR, "div.big-title h1");
selector!(ANCHOR_SELECTOR, "a[href]");
selector!(BREADCRUMB_SELECTOR, ".breadcrumb a, .yoast-breadcrumbs a");
selector!(IMAGE_SELECTOR, "img");

regex!(NAVIGATION_REGEX, r"(?i)\b(next|prev|previous)\b");
regex!(SOCIAL_REGEX, r"(?i)facebook\.com|twitter\.com|x\.com/intent");
// "ads" only as a whole path segment so that "/uploads/" survives.
regex!(NOT_A_PAGE_REGEX, r"(?i)logo|icon|banner|(?:^|[/_.-])ads?(?:[/_.-]|$)");
