//! Reading the list of series names for bulk discovery.

use rslug::slugify;

// Various quotation marks: '"''""„"`«»
const QUOTATION_MARKS: [char; 13] = [
    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}', '\u{0060}',
    '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
];

/// Slugs from a names file: either a JSON array of strings or one name per
/// line (blank lines and `#` comments ignored). Order is kept, duplicates
/// dropped.
pub fn parse_names(contents: &str) -> serde_json::Result<Vec<String>> {
    let trimmed = contents.trim_start();
    let raw: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect()
    };
    let mut slugs: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        // Quotes would otherwise become dashes: "Frieren's" -> "frieren-s".
        let stripped: String = name.chars().filter(|c| !QUOTATION_MARKS.contains(c)).collect();
        let slug = slugify!(&stripped);
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    Ok(slugs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_array() {
        let names = parse_names(r#"["Solo Leveling", "Jujutsu Kaisen", "solo-leveling"]"#).unwrap();
        assert_eq!(names, ["solo-leveling", "jujutsu-kaisen"]);
    }

    #[test]
    fn test_one_per_line() {
        let names = parse_names("# favourites\nSolo Leveling\n\n  Frieren's Journey  \n").unwrap();
        assert_eq!(names, ["solo-leveling", "frierens-journey"]);
    }

    #[test]
    fn test_broken_json_is_an_error() {
        assert!(parse_names(r#"["Solo Leveling","#).is_err());
    }
}
