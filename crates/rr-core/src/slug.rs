//! # Slugs
//!
//! Turns human titles into URL tokens. Cyrillic is transliterated with a
//! fixed table; anything else outside `[a-z0-9]` is dropped. Uniqueness is
//! not decided here, the services check it against the store.

/// Latin spelling of a lower-case Cyrillic letter. `ъ` and `ь` vanish.
fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Builds a slug from `title`. Total: any input yields a (possibly empty) slug.
///
/// ```
/// use rr_core::slug::slugify;
///
/// assert_eq!(slugify("Борщ украинский!"), "borsch-ukrainskiy");
/// assert_eq!(slugify("   "), "");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    // A separator is only written once the next kept character arrives,
    // so leading, trailing and repeated separators never materialise.
    let mut pending_separator = false;

    for ch in title.to_lowercase().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_separator = !slug.is_empty();
            continue;
        }

        let mut buf = [0u8; 4];
        let piece: &str = match transliterate(ch) {
            Some(latin) => latin,
            None if ch.is_ascii_lowercase() || ch.is_ascii_digit() => &*ch.encode_utf8(&mut buf),
            None => continue,
        };
        if piece.is_empty() {
            continue;
        }

        if pending_separator {
            slug.push('-');
            pending_separator = false;
        }
        slug.push_str(piece);
    }

    slug
}

/// Return `true` when `value` is a well-formed slug.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}
