//! String helpers shared by the output writers and the fixtures parser.

/// Directory-safe slug for match output folders.
///
/// Spaces become `_`, path separators become `-`, and anything outside ASCII
/// alphanumerics, `_`, `-` and the Spanish accented letters is dropped. The
/// result is capped at 80 characters.
pub fn path_slug(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' => '-',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-') || is_spanish_letter(*c))
        .take(80)
        .collect()
}

fn is_spanish_letter(c: char) -> bool {
    matches!(
        c,
        'á' | 'é' | 'í' | 'ó' | 'ú' | 'Á' | 'É' | 'Í' | 'Ó' | 'Ú' | 'ñ' | 'Ñ'
    )
}

/// Replace Latin accented letters with their plain ASCII base letter.
pub fn fold_accents(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => out.push('a'),
            'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => out.push('A'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'É' | 'È' | 'Ê' | 'Ë' => out.push('E'),
            'í' | 'ì' | 'î' | 'ï' => out.push('i'),
            'Í' | 'Ì' | 'Î' | 'Ï' => out.push('I'),
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => out.push('o'),
            'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' => out.push('O'),
            'ú' | 'ù' | 'û' | 'ü' => out.push('u'),
            'Ú' | 'Ù' | 'Û' | 'Ü' => out.push('U'),
            'ñ' => out.push('n'),
            'Ñ' => out.push('N'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'ß' => out.push_str("ss"),
            'ć' | 'č' => out.push('c'),
            'Ć' | 'Č' => out.push('C'),
            'š' => out.push('s'),
            'Š' => out.push('S'),
            'ž' => out.push('z'),
            'Ž' => out.push('Z'),
            other => out.push(other),
        }
    }
    out
}

/// ASCII slug used for fixtures folders: accents folded, separators turned
/// into `-`, other punctuation removed, inner spaces turned into `_`.
pub fn ascii_slug(s: &str) -> String {
    let folded = fold_accents(s).replace(['/', '\\'], "-");
    let kept: String = folded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
        .collect();
    kept.trim().replace(' ', "_")
}

/// Collapse whitespace runs into single spaces and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `<...>` tags, decode the handful of entities the site uses and
/// collapse whitespace.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Decode bytes as UTF-8 (dropping a leading BOM), falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
