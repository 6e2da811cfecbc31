//! Alternative spellings of a series slug that reader sites like to use.

/// Slug variants to try, best guess first and without duplicates.
///
/// `jujutsu-kaisen` gives `jujutsu-kaisen`, `jujutsukaisen`, `jk` and
/// `jujutsu`.
pub fn slug_variants(slug: &str) -> Vec<String> {
    let parts: Vec<&str> = slug.split('-').filter(|part| !part.is_empty()).collect();
    let mut variants = vec![slug.to_string(), slug.replace('-', "")];
    if parts.len() >= 2 {
        let acronym: String = parts.iter().filter_map(|part| part.chars().next()).collect();
        if acronym.chars().count() >= 2 {
            variants.push(acronym);
        }
        if parts[0].chars().count() > 3 {
            variants.push(parts[0].to_string());
        }
    }
    let mut unique = Vec::with_capacity(variants.len());
    for variant in variants {
        if !variant.is_empty() && !unique.contains(&variant) {
            unique.push(variant);
        }
    }
    unique
}

/// `solo-leveling` becomes `Solo Leveling`.
pub fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// The domain to rotate subdomains on: `www.` and `w<digits>.` are dropped.
pub fn registry_domain(host: &str) -> &str {
    let host = host.strip_prefix("www.").unwrap_or(host);
    if let Some((label, rest)) = host.split_once('.')
        && let Some(digits) = label.strip_prefix('w')
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && rest.contains('.')
    {
        return rest;
    }
    host
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::four("jujutsu-kaisen", &["jujutsu-kaisen", "jujutsukaisen", "jk", "jujutsu"])]
    #[case::three_parts("attack-on-titan", &["attack-on-titan", "attackontitan", "aot", "attack"])]
    #[case::short_first("one-piece", &["one-piece", "onepiece", "op"])]
    #[case::single("naruto", &["naruto"])]
    fn test_variants(#[case] slug: &str, #[case] expected: &[&str]) {
        assert_eq!(slug_variants(slug), expected);
    }

    #[rstest]
    #[case("solo-leveling", "Solo Leveling")]
    #[case("one-PIECE", "One Piece")]
    #[case("naruto", "Naruto")]
    fn test_titles(#[case] slug: &str, #[case] expected: &str) {
        assert_eq!(title_case(slug), expected);
    }

    #[rstest]
    #[case("www.readfoo.com", "readfoo.com")]
    #[case("w3.foo.net", "foo.net")]
    #[case("w12.foo.net", "foo.net")]
    #[case("web.foo.com", "web.foo.com")]
    #[case("w.foo.com", "w.foo.com")]
    #[case("w1.net", "w1.net")]
    #[case("readfoo.com", "readfoo.com")]
    fn test_domains(#[case] host: &str, #[case] expected: &str) {
        assert_eq!(registry_domain(host), expected);
    }
}
