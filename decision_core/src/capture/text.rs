// decision_core/src/capture/text.rs

use unicode_normalization::UnicodeNormalization;

/// Hard ceiling on extracted page text. Rendered DOM text beyond this adds
/// nothing the extractor's heuristics can use.
pub const MAX_EXTRACTED_TEXT_BYTES: usize = 200 * 1024;

// Mojibake sequences seen when UTF-8 pages get decoded as Windows-1252
// somewhere along the render path.
const MOJIBAKE_REPLACEMENTS: [(&str, &str); 10] = [
    ("\u{c3}\u{a2}\u{20ac}\u{2122}", "'"),
    ("â€™", "'"),
    ("â€˜", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("â€“", "–"),
    ("â€”", "—"),
    ("â€¦", "…"),
    ("Â\u{a0}", " "),
    ("Ã‚", ""),
];

/// # NDOC
/// component: `capture::text`
/// purpose: Canonicalize rendered body text before feature extraction.
/// invariants:
///   - Output is NFC-normalized UTF-8.
///   - Line structure is preserved (one block per line); runs of intra-line
///     whitespace collapse to a single space, runs of blank lines to one.
///   - Output is truncated to `MAX_EXTRACTED_TEXT_BYTES` on a char boundary.
pub fn normalize_rendered_text(raw: &str) -> String {
    let mut text: String = raw.nfc().collect();

    for (bad, good) in MOJIBAKE_REPLACEMENTS {
        if text.contains(bad) {
            text = text.replace(bad, good);
        }
    }
    text = text.replace('\u{fffd}', "");

    let mut lines = Vec::new();
    let mut previous_blank = false;
    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !previous_blank && !lines.is_empty() {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }
    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }

    truncate_on_char_boundary(lines.join("\n"), MAX_EXTRACTED_TEXT_BYTES)
}

fn truncate_on_char_boundary(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}
