//! Slug generation shared by routing and alias registration.

use unicode_segmentation::UnicodeSegmentation;

/// Convert a string to a URL-safe slug
///
/// Rules:
/// - Fold diacritics to their base letter
/// - Drop characters that are neither alphanumeric nor whitespace
/// - Collapse runs of whitespace
/// - Lowercase
/// - Replace spaces with hyphens
///
/// # Examples
///
/// ```
/// use mica_core::slugify;
///
/// assert_eq!(slugify("Getting Started"), "getting-started");
/// assert_eq!(slugify("Café"), "cafe");
/// assert_eq!(slugify("What's new?"), "whats-new");
/// ```
pub fn slugify(input: &str) -> String {
    let folded = fold_diacritics(input);

    let cleaned: String = folded
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if c.is_alphanumeric() {
                Some(g)
            } else if c.is_whitespace() {
                Some(" ")
            } else {
                None
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace(' ', "-")
}

/// Replace precomposed Latin letters with their unaccented base.
pub(crate) fn fold_diacritics(input: &str) -> String {
    input.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'í' | 'ì' | 'î' | 'ï' | 'ī' | 'į' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' | 'Į' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' | 'ő' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' | 'Ō' | 'Ő' => 'O',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        'ç' | 'ć' | 'č' => 'c',
        'Ç' | 'Ć' | 'Č' => 'C',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'š' | 'ś' | 'ş' => 's',
        'Š' | 'Ś' | 'Ş' => 'S',
        'ž' | 'ź' | 'ż' => 'z',
        'Ž' | 'Ź' | 'Ż' => 'Z',
        'ł' => 'l',
        'Ł' => 'L',
        'đ' | 'ď' => 'd',
        'Đ' | 'Ď' => 'D',
        'ğ' => 'g',
        'Ğ' => 'G',
        'ţ' | 'ť' => 't',
        'Ţ' | 'Ť' => 'T',
        'ř' => 'r',
        'Ř' => 'R',
        _ => c,
    }
}
