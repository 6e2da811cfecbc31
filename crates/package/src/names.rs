//! File and directory naming for downloaded content.

use url::Url;

const DEFAULT_PAGE_EXTENSION: &str = "jpg";

/// Keeps alphanumerics, spaces, `-` and `_`, then trims.
///
/// Used for series directory names. May return an empty string, callers
/// should have a fallback.
pub fn safe_name(title: impl AsRef<str>) -> String {
    title
        .as_ref()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Directory (and artifact stem) name for a chapter.
///
/// Dots become dashes first so that `"Chapter 10.5"` doesn't turn into
/// `"Chapter 105"`.
pub fn chapter_dir_name(title: impl AsRef<str>) -> String {
    safe_name(title.as_ref().replace('.', "-"))
}

/// Image extension from a URL path, if it's one we recognise.
pub fn infer_extension(url: &str) -> Option<&'static str> {
    let path = Url::parse(url).ok()?.path().to_ascii_lowercase();
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg" | "jpeg") => Some("jpg"),
        Some("png") => Some("png"),
        Some("webp") => Some("webp"),
        Some("gif") => Some("gif"),
        Some("avif") => Some("avif"),
        _ => None,
    }
}

/// `001.jpg`, `002.png`, ... Zero-based index in, one-based name out.
pub fn page_file_name(index: usize, url: &str) -> String {
    format!("{:03}.{}", index + 1, infer_extension(url).unwrap_or(DEFAULT_PAGE_EXTENSION))
}

/// Whether a file name looks like a page image.
pub fn is_image(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    [".jpg", ".jpeg", ".png", ".webp", ".gif", ".avif"].iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Solo Leveling", "Solo Leveling")]
    #[case("  Re:Zero / Part 2? ", "ReZero  Part 2")]
    #[case("Kaguya-sama_Love", "Kaguya-sama_Love")]
    #[case("???", "")]
    fn test_safe_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(safe_name(input), expected);
    }

    #[rstest]
    #[case("Chapter 10.5", "Chapter 10-5")]
    #[case("Chapter 1: The Start", "Chapter 1 The Start")]
    fn test_chapter_dir_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(chapter_dir_name(input), expected);
    }

    #[rstest]
    #[case(0, "https://cdn.example.org/a/01.png", "001.png")]
    #[case(9, "https://cdn.example.org/a/10.JPEG?token=x", "010.jpg")]
    #[case(99, "https://cdn.example.org/a/100.webp", "100.webp")]
    #[case(0, "https://cdn.example.org/image?id=4", "001.jpg")]
    #[case(0, "not a url", "001.jpg")]
    fn test_page_file_name(#[case] index: usize, #[case] url: &str, #[case] expected: &str) {
        assert_eq!(page_file_name(index, url), expected);
    }

    #[rstest]
    #[case("001.jpg", true)]
    #[case("001.JPEG", true)]
    #[case("cover.webp", true)]
    #[case("ComicInfo.xml", false)]
    #[case("notes.txt", false)]
    fn test_is_image(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image(name), expected);
    }
}
