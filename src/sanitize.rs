use once_cell::sync::Lazy;
use regex::Regex;

/// Boilerplate the meeting recorder prepends to exported transcripts.
pub const DISCLAIMER_VARIANTS: [&str; 4] = [
    "This editable transcript was computer generated and might contain errors.",
    "This editable transcript was computer generated and might contain errors",
    "This editable transcript was computer-generated and might contain errors.",
    "This editable transcript was computer-generated and might contain errors",
];

static DISCLAIMER: Lazy<Regex> = Lazy::new(|| {
    // Variants ending in a period come first so the period is consumed too.
    let alternation = DISCLAIMER_VARIANTS
        .iter()
        .map(|variant| regex::escape(variant))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{alternation})")).expect("disclaimer pattern is valid")
});

static EXCESS_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r?\n){3,}").expect("line break pattern is valid"));

/// Strips the recorder disclaimer, collapses runs of blank lines and trims.
///
/// Removal is repeated until nothing matches, so text that only forms a
/// disclaimer once an inner copy is cut out is cleaned too. This keeps
/// `sanitize_transcript(sanitize_transcript(x)) == sanitize_transcript(x)`.
pub fn sanitize_transcript(raw: &str) -> String {
    let mut text = raw.to_string();
    while DISCLAIMER.is_match(&text) {
        text = DISCLAIMER.replace_all(&text, "").into_owned();
    }

    let collapsed = EXCESS_BREAKS.replace_all(&text, "\n\n");
    collapsed.trim().to_string()
}
