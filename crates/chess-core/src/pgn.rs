//! PGN parsing utilities, lightweight and regex-based.

use regex::Regex;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const RESULT_TOKENS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Mainline SAN moves of a game.
/// Returns None for games that start from a custom position.
pub fn mainline_moves(pgn: &str) -> Option<Vec<String>> {
    if extract_header(pgn, "SetUp").as_deref() == Some("1") {
        if let Some(fen) = extract_header(pgn, "FEN") {
            if fen != STANDARD_START_FEN {
                return None;
            }
        }
    }
    Some(extract_moves(pgn))
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
/// Zero-style castling (`0-0`, `0-0-0`) is normalized to `O-O` / `O-O-O`.
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let Ok(header_re) = Regex::new(r"\[[^\]]*\]") else {
        return Vec::new();
    };
    let no_headers = header_re.replace_all(pgn, "");

    let Ok(comment_re) = Regex::new(r"\{[^}]*\}|;[^\n]*") else {
        return Vec::new();
    };
    let no_comments = comment_re.replace_all(&no_headers, "");

    // Innermost variations first so nested ones unwind
    let Ok(variation_re) = Regex::new(r"\([^()]*\)") else {
        return Vec::new();
    };
    let mut text = no_comments.into_owned();
    while variation_re.is_match(&text) {
        text = variation_re.replace_all(&text, "").into_owned();
    }

    let Ok(move_re) = Regex::new(
        r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|[O0]-[O0]-[O0][+#]?|[O0]-[O0][+#]?",
    ) else {
        return Vec::new();
    };

    move_re
        .find_iter(&text)
        .map(|m| m.as_str().replace('0', "O"))
        .collect()
}

/// Extract a string value from a PGN header.
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"([^"]*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str().to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// Split a multi-game PGN file into individual game texts.
///
/// A new game begins at a header line that follows movetext.
pub fn split_games(text: &str) -> Vec<String> {
    let mut games = Vec::new();
    let mut current = String::new();
    let mut seen_movetext = false;

    for line in text.lines() {
        let trimmed = line.trim();
        let is_header = trimmed.starts_with('[');

        if is_header && seen_movetext {
            games.push(std::mem::take(&mut current));
            seen_movetext = false;
        }
        if !is_header && !trimmed.is_empty() {
            seen_movetext = true;
        }

        current.push_str(line);
        current.push('\n');
    }

    if !current.trim().is_empty() {
        games.push(current);
    }

    games
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty() && !RESULT_TOKENS.contains(&g.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainline_moves_basic() {
        let pgn = r#"[White "Player1"]
[Black "Player2"]
[Result "1-0"]
[Date "2025.01.15"]

1. e4 e5 2. Nf3 Nc6 1-0"#;

        assert_eq!(
            mainline_moves(pgn).unwrap(),
            vec!["e4", "e5", "Nf3", "Nc6"]
        );
    }

    #[test]
    fn test_extract_moves_zero_castling() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. 0-0 Nf6 5. d3 d6 10. Qe2 0-0-0+ 0-1";
        assert_eq!(
            extract_moves(pgn),
            vec!["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5", "O-O", "Nf6", "d3", "d6", "Qe2", "O-O-O+"]
        );
    }

    #[test]
    fn test_extract_moves_skips_comments_and_variations() {
        let pgn = "1. e4 {best by test} e5 (1... c5 2. Nf3 (2. c3) d6) 2. Nf3 ; aside\n2... Nc6 3. O-O-O+ O-O";
        assert_eq!(
            extract_moves(pgn),
            vec!["e4", "e5", "Nf3", "Nc6", "O-O-O+", "O-O"]
        );
    }

    #[test]
    fn test_custom_start_position_rejected() {
        let pgn = r#"[SetUp "1"]
[FEN "8/8/8/8/8/8/8/K6k w - - 0 1"]

1. Kb1 *"#;
        assert!(mainline_moves(pgn).is_none());
    }

    #[test]
    fn test_extract_header() {
        let pgn = r#"[Event "Casual Game"]
[Site ""]"#;
        assert_eq!(extract_header(pgn, "Event").as_deref(), Some("Casual Game"));
        assert_eq!(extract_header(pgn, "Site"), None);
        assert_eq!(extract_header(pgn, "Missing"), None);
    }

    #[test]
    fn test_split_games() {
        let text = r#"[Event "A"]
[Result "1-0"]

1. e4 e5 1-0

[Event "B"]
[Result "0-1"]

1. d4 d5 0-1
"#;
        let games = split_games(text);
        assert_eq!(games.len(), 2);
        assert!(games[0].contains("1. e4 e5"));
        assert!(games[1].starts_with("[Event \"B\"]"));
    }
}
