//! Canonical text cleanup applied before chunking and lexical matching.

use regex::Regex;
use std::sync::OnceLock;

fn tabs_and_returns() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\t\r]+").expect("static regex"))
}

fn repeated_spaces() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("static regex"))
}

fn decorative_glyphs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["'*\[\]<>▶◆■●▪→⇒①②③④⑤⑥⑦⑧⑨⑩]"#).expect("static regex")
    })
}

fn newlines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n+").expect("static regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Normalize raw extracted text into its canonical single-line form.
///
/// Collapses tab/carriage-return runs and repeated spaces, strips decorative
/// glyphs and bracket/quote characters, flattens newlines to spaces, and trims
/// the result. Pure and idempotent: `clean_text(clean_text(x)) == clean_text(x)`.
pub fn clean_text(text: &str) -> String {
    let text = tabs_and_returns().replace_all(text, " ");
    let text = repeated_spaces().replace_all(&text, " ");
    let text = decorative_glyphs().replace_all(&text, "");
    let text = newlines().replace_all(&text, " ");
    let text = whitespace_runs().replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_newlines() {
        assert_eq!(clean_text("a\t\tb\r\nc\n\nd   e"), "a b c d e");
    }

    #[test]
    fn strips_decorative_glyphs() {
        assert_eq!(clean_text("▶ 문제 [1] \"보기\" ①②"), "문제 1 보기");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(clean_text("  하나 둘  "), "하나 둘");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_text("   \n\t "), "");
    }

    #[test]
    fn idempotent_on_already_clean_text() {
        let samples = [
            "a\t\tb\r\nc\n\nd   e",
            "▶ 유동비율 계산: [100] \"50\"",
            "plain text",
            "",
        ];
        for sample in samples {
            let once = clean_text(sample);
            assert_eq!(clean_text(&once), once);
        }
    }
}
