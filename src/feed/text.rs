//! Text normalization applied to every field before it is stored.

/// Maximum title length in characters.
pub const MAX_TITLE_LENGTH: usize = 500;

/// Maximum summary length in characters.
pub const MAX_SUMMARY_LENGTH: usize = 2000;

/// Maximum link URL length in characters.
pub const MAX_LINK_LENGTH: usize = 1200;

/// Maximum author length in characters.
pub const MAX_AUTHOR_LENGTH: usize = 200;

/// Maximum external id length in characters.
pub const MAX_EXTERNAL_ID_LENGTH: usize = 300;

/// Maximum image URL length in characters.
pub const MAX_IMAGE_URL_LENGTH: usize = 1200;

/// Longest entity name we try to decode; anything longer is literal text.
const MAX_ENTITY_LENGTH: usize = 10;

/// Truncate to at most `max` characters without splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Trim, drop empty values and truncate.
pub fn clean_field(value: Option<&str>, max: usize) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate_chars(trimmed, max))
    }
}

/// Strip HTML tags, decode entities and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut entity: Option<String> = None;

    for ch in html.chars() {
        if in_tag {
            if ch == '>' {
                in_tag = false;
                // Tags separate words: "<p>a</p><p>b</p>" reads "a b".
                result.push(' ');
            }
            continue;
        }

        if let Some(name) = entity.as_mut() {
            if ch == ';' {
                push_entity(&mut result, name);
                entity = None;
                continue;
            }
            if (ch.is_ascii_alphanumeric() || ch == '#') && name.len() < MAX_ENTITY_LENGTH {
                name.push(ch);
                continue;
            }
            // Not an entity after all: emit what was buffered as text.
            result.push('&');
            result.push_str(name);
            entity = None;
        }

        match ch {
            '<' => in_tag = true,
            '&' => entity = Some(String::new()),
            _ => result.push(ch),
        }
    }

    if let Some(name) = entity {
        result.push('&');
        result.push_str(&name);
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_entity(out: &mut String, name: &str) {
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "lsquo" => Some('‘'),
        "rsquo" => Some('’'),
        "ldquo" => Some('“'),
        "rdquo" => Some('”'),
        _ => parse_numeric_entity(name).and_then(char::from_u32),
    };

    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push('&');
            out.push_str(name);
            out.push(';');
        }
    }
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    let digits = entity.strip_prefix('#')?;
    if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        digits.parse().ok()
    }
}
