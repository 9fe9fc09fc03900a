use url::Url;

/// Normalizes free-text reference links: trims each entry, defaults the
/// scheme to `https`, drops anything that does not parse as an http(s) URL,
/// and removes exact duplicates keeping first-occurrence order.
///
/// Malformed entries are dropped silently rather than reported; the field
/// is free text and the lenient policy is deliberate.
pub fn sanitize_links<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for entry in raw {
        let trimmed = entry.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        // Prefix only entries with no leading scheme. A "://" further in
        // (say, inside a query string) must not suppress the prefix.
        let candidate = match trimmed.split_once("://") {
            Some((scheme, _)) if is_scheme(scheme) => trimmed.to_string(),
            _ => format!("https://{trimmed}"),
        };
        let Ok(parsed) = Url::parse(&candidate) else {
            continue;
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            continue;
        }
        let normalized = parsed.to_string();
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
