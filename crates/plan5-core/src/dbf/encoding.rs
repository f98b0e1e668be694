//! Text decoding with encoding fallback.
//!
//! The archives come from decades of German Windows and DOS installations.
//! Candidate encodings are tried in priority order: strict UTF-8 first,
//! then permissive Windows-1252. A Windows-1252 decode of DOS-codepage
//! bytes leaves recognizable mojibake in place of umlauts, which the
//! repair table below maps back.

use encoding_rs::WINDOWS_1252;

/// Decode one text field window.
///
/// Returns the cleaned string and whether the permissive fallback encoding
/// was used (surfaced as a per-table advisory, never an error).
pub(crate) fn decode_text(bytes: &[u8]) -> (String, bool) {
    let trimmed = trim_window(bytes);
    if trimmed.is_empty() {
        return (String::new(), false);
    }

    if trimmed.is_ascii() {
        // Fast path; ASCII is identical in every candidate encoding.
        let text = std::str::from_utf8(trimmed).unwrap_or_default();
        return (text.to_string(), false);
    }

    if let Ok(text) = std::str::from_utf8(trimmed) {
        return (clean(text), false);
    }

    let (text, _) = WINDOWS_1252.decode_without_bom_handling(trimmed);
    (clean(&text).chars().map(repair_char).collect(), true)
}

fn trim_window(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| b != b' ' && b != 0)
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map(|i| i + 1)
        .unwrap_or(start);
    &bytes[start..end]
}

fn clean(text: &str) -> String {
    text.chars().filter(|&c| c != '\0').collect::<String>().trim().to_string()
}

/// Repairs for umlaut bytes that survive a Windows-1252 decode as
/// mojibake: the DOS-codepage positions (0x81, 0x84, 0x8E, 0x94, 0x99,
/// 0x9A, 0xE1) and the Cyrillic look-alikes seen in archives that passed
/// through an OEM->ANSI round trip.
fn repair_char(c: char) -> char {
    match c {
        '\u{0081}' => 'ü', // cp437/cp850 ü
        '„' => 'ä',        // cp437/cp850 ä (0x84)
        'Ž' => 'Ä',        // cp437/cp850 Ä (0x8E)
        '”' => 'ö',        // cp437/cp850 ö (0x94)
        '™' => 'Ö',        // cp437/cp850 Ö (0x99)
        'š' => 'Ü',        // cp437/cp850 Ü (0x9A)
        'á' => 'ß',        // cp437/cp850 ß (0xE1)
        'ь' | 'ќ' => 'ü',
        'д' => 'ä',
        'ц' => 'ö',
        'Ь' => 'Ü',
        'Д' => 'Ä',
        'Ц' => 'Ö',
        'Я' => 'ß',
        'Ђ' => 'Ä',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_fast_path() {
        let (text, fallback) = decode_text(b"  Mustermann   ");
        assert_eq!(text, "Mustermann");
        assert!(!fallback);
    }

    #[test]
    fn test_utf8_accepted_without_fallback() {
        let (text, fallback) = decode_text("Müller ".as_bytes());
        assert_eq!(text, "Müller");
        assert!(!fallback);
    }

    #[test]
    fn test_windows_1252_fallback() {
        // 0xFC is 'ü' in Windows-1252 and invalid as a lone UTF-8 byte.
        let (text, fallback) = decode_text(b"M\xFCller   ");
        assert_eq!(text, "Müller");
        assert!(fallback);
    }

    #[test]
    fn test_dos_umlauts_repaired() {
        // "Müller" written under cp850: 0x81 is ü there.
        let (text, fallback) = decode_text(b"M\x81ller");
        assert_eq!(text, "Müller");
        assert!(fallback);

        // 0x84 ä, 0x94 ö, 0xE1 ß.
        let (text, _) = decode_text(b"G\x84rtnerstra\xE1e");
        assert_eq!(text, "Gärtnerstraße");
    }

    #[test]
    fn test_nul_padding_stripped() {
        let (text, fallback) = decode_text(b"Nachtschicht\x00\x00\x00");
        assert_eq!(text, "Nachtschicht");
        assert!(!fallback);
    }

    #[test]
    fn test_empty_window() {
        let (text, fallback) = decode_text(b"        ");
        assert_eq!(text, "");
        assert!(!fallback);
    }
}
