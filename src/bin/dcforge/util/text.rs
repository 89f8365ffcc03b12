/// Greedy word wrap at `width` columns; always yields at least one line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for word in text.split_whitespace() {
        match lines.last_mut() {
            Some(line) if line.chars().count() + 1 + word.chars().count() <= width => {
                line.push(' ');
                line.push_str(word);
            }
            _ => lines.push(word.to_string()),
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Shortens `s` to at most `max_len` characters, marking the cut with `…`.
pub fn fit(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max_len - 1).collect();
    out.push('…');
    out
}

pub fn percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "n/a".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_short_text_on_one_line() {
        assert_eq!(wrap("merge finished", 20), vec!["merge finished"]);
    }

    #[test]
    fn wrap_breaks_between_words() {
        assert_eq!(
            wrap("chunk file is missing", 10),
            vec!["chunk file", "is missing"]
        );
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn fit_marks_truncation() {
        assert_eq!(fit("decoys", 10), "decoys");
        assert_eq!(fit("decoys", 6), "decoys");
        assert_eq!(fit("reconstructed", 6), "recon…");
        assert_eq!(fit("反応データ", 3), "反応…");
    }

    #[test]
    fn percent_of_nothing_is_undefined() {
        assert_eq!(percent(1, 4), "25.0%");
        assert_eq!(percent(0, 0), "n/a");
    }
}
