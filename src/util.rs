pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }

    if max <= 3 {
        return s.chars().take(max).collect();
    }

    let truncated: String = s.chars().take(max - 3).collect();
    format!("{}...", truncated)
}

/// Lowercase ASCII slug for directory names. Runs of non-alphanumerics
/// collapse to single hyphens; empty input falls back to "plan".
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut last_hyphen = true;
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        return "plan".to_string();
    }
    truncate_slug(&slug, 40)
}

fn truncate_slug(slug: &str, max: usize) -> String {
    if slug.len() <= max {
        return slug.to_string();
    }
    let mut cut = &slug[..max];
    if let Some(idx) = cut.rfind('-') {
        if idx >= max / 2 {
            cut = &cut[..idx];
        }
    }
    cut.to_string()
}

/// Format a duration in seconds as M:SS for step cards.
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.round().max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::{format_clock, slugify, truncate};

    #[test]
    fn test_truncate_unicode_safe() {
        let input = "ééééé";
        assert_eq!(truncate(input, 4), "é...");
    }

    #[test]
    fn test_truncate_small_max() {
        let input = "こんにちは";
        assert_eq!(truncate(input, 3), "こんに");
        assert_eq!(truncate(input, 0), "");
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Wobbly Chair: Leg Repair!"), "wobbly-chair-leg-repair");
        assert_eq!(slugify("---"), "plan");
        assert_eq!(slugify(""), "plan");
    }

    #[test]
    fn test_slugify_caps_length_at_word_boundary() {
        let long = "a very long repair plan title that keeps going and going forever";
        let slug = slugify(long);
        assert!(slug.len() <= 40);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(7.4), "0:07");
        assert_eq!(format_clock(61.0), "1:01");
        assert_eq!(format_clock(-2.0), "0:00");
    }
}
