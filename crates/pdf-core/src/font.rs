//! Standard Type1 fonts for overlay text
//!
//! Overlay text is drawn with the base-14 Helvetica faces, which every
//! conforming reader provides, so nothing is embedded. Strings are encoded
//! with WinAnsiEncoding.

use lopdf::{Dictionary, Object};

/// Base-14 font faces used by the renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name used inside overlay content streams
    pub fn resource_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helv",
            StandardFont::HelveticaBold => "HeBo",
        }
    }

    /// Build the simple font dictionary for this face
    pub fn to_pdf_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Font".to_vec()));
        dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        dict.set("BaseFont", Object::Name(self.base_font().as_bytes().to_vec()));
        dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        dict
    }

    /// Encode text as a hex string operand (e.g. `<48656C6C6F>`)
    pub fn encode_text_hex(&self, text: &str) -> String {
        let mut hex = String::with_capacity(text.len() * 2 + 2);
        hex.push('<');
        for byte in encode_win_ansi(text) {
            hex.push_str(&format!("{byte:02X}"));
        }
        hex.push('>');
        hex
    }
}

/// Encode text to WinAnsiEncoding bytes
///
/// Characters outside the encoding are replaced with `?`; tabs become spaces
/// and other control characters are dropped.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().filter_map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match c {
        '\t' => Some(b' '),
        _ if code < 0x20 || code == 0x7F => None,
        _ if code < 0x7F => Some(code as u8),
        _ if (0xA0..=0xFF).contains(&code) => Some(code as u8),
        '€' => Some(0x80),
        '‚' => Some(0x82),
        'ƒ' => Some(0x83),
        '„' => Some(0x84),
        '…' => Some(0x85),
        '†' => Some(0x86),
        '‡' => Some(0x87),
        'ˆ' => Some(0x88),
        '‰' => Some(0x89),
        'Š' => Some(0x8A),
        '‹' => Some(0x8B),
        'Œ' => Some(0x8C),
        'Ž' => Some(0x8E),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        '˜' => Some(0x98),
        '™' => Some(0x99),
        'š' => Some(0x9A),
        '›' => Some(0x9B),
        'œ' => Some(0x9C),
        'ž' => Some(0x9E),
        'Ÿ' => Some(0x9F),
        _ => Some(b'?'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_font_dictionary() {
        let dict = StandardFont::HelveticaBold.to_pdf_dictionary();
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type1");
        assert_eq!(
            dict.get(b"BaseFont").unwrap().as_name().unwrap(),
            b"Helvetica-Bold"
        );
        assert_eq!(
            dict.get(b"Encoding").unwrap().as_name().unwrap(),
            b"WinAnsiEncoding"
        );
    }

    #[test]
    fn test_encode_ascii_hex() {
        assert_eq!(StandardFont::Helvetica.encode_text_hex("Hi!"), "<486921>");
    }

    #[test]
    fn test_encode_latin1_and_specials() {
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("€—’"), vec![0x80, 0x97, 0x92]);
    }

    #[test]
    fn test_encode_unmappable_and_controls() {
        assert_eq!(encode_win_ansi("a\tb"), b"a b".to_vec());
        assert_eq!(encode_win_ansi("x\r"), b"x".to_vec());
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }
}
