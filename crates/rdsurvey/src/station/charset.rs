//! RDS character set and code tables

/// RDS basic character set, indexed by code
///
/// Codes which are not printable map to a space, except for
/// the null code (which marks an unwritten position), line
/// feed, and carriage return (which ends a radiotext).
const CHARMAP: [char; 256] = [
    '\u{0000}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}',
    '\u{0020}', '\u{0020}', '\u{000a}', '\u{000b}', '\u{0020}', '\u{000d}', '\u{0020}', '\u{0020}',
    '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}',
    '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{0020}', '\u{001f}',
    '\u{0020}', '\u{0021}', '\u{0022}', '\u{0023}', '\u{00a4}', '\u{0025}', '\u{0026}', '\u{0027}',
    '\u{0028}', '\u{0029}', '\u{002a}', '\u{002b}', '\u{002c}', '\u{002d}', '\u{002e}', '\u{002f}',
    '\u{0030}', '\u{0031}', '\u{0032}', '\u{0033}', '\u{0034}', '\u{0035}', '\u{0036}', '\u{0037}',
    '\u{0038}', '\u{0039}', '\u{003a}', '\u{003b}', '\u{003c}', '\u{003d}', '\u{003e}', '\u{003f}',
    '\u{0040}', '\u{0041}', '\u{0042}', '\u{0043}', '\u{0044}', '\u{0045}', '\u{0046}', '\u{0047}',
    '\u{0048}', '\u{0049}', '\u{004a}', '\u{004b}', '\u{004c}', '\u{004d}', '\u{004e}', '\u{004f}',
    '\u{0050}', '\u{0051}', '\u{0052}', '\u{0053}', '\u{0054}', '\u{0055}', '\u{0056}', '\u{0057}',
    '\u{0058}', '\u{0059}', '\u{005a}', '\u{005b}', '\u{005c}', '\u{005d}', '\u{2015}', '\u{005f}',
    '\u{2551}', '\u{0061}', '\u{0062}', '\u{0063}', '\u{0064}', '\u{0065}', '\u{0066}', '\u{0067}',
    '\u{0068}', '\u{0069}', '\u{006a}', '\u{006b}', '\u{006c}', '\u{006d}', '\u{006e}', '\u{006f}',
    '\u{0070}', '\u{0071}', '\u{0072}', '\u{0073}', '\u{0074}', '\u{0075}', '\u{0076}', '\u{0077}',
    '\u{0078}', '\u{0079}', '\u{007a}', '\u{007b}', '\u{007c}', '\u{007d}', '\u{00af}', '\u{007f}',
    '\u{00e1}', '\u{00e0}', '\u{00e9}', '\u{00e8}', '\u{00ed}', '\u{00ec}', '\u{00f3}', '\u{00f2}',
    '\u{00fa}', '\u{00f9}', '\u{00d1}', '\u{00c7}', '\u{015e}', '\u{00df}', '\u{00a1}', '\u{0132}',
    '\u{00e2}', '\u{00e4}', '\u{00ea}', '\u{00eb}', '\u{00ee}', '\u{00ef}', '\u{00f4}', '\u{00f6}',
    '\u{00fb}', '\u{00fc}', '\u{00f1}', '\u{00e7}', '\u{015f}', '\u{011f}', '\u{0131}', '\u{0133}',
    '\u{00aa}', '\u{03b1}', '\u{00a9}', '\u{2030}', '\u{011e}', '\u{011b}', '\u{0148}', '\u{0151}',
    '\u{03c0}', '\u{20ac}', '\u{00a3}', '\u{0024}', '\u{2190}', '\u{2191}', '\u{2192}', '\u{2193}',
    '\u{00ba}', '\u{00b9}', '\u{00b2}', '\u{00b3}', '\u{00b1}', '\u{0130}', '\u{0144}', '\u{0171}',
    '\u{00b5}', '\u{00bf}', '\u{00f7}', '\u{00b0}', '\u{00bc}', '\u{00bd}', '\u{00be}', '\u{00a7}',
    '\u{00c1}', '\u{00c0}', '\u{00c9}', '\u{00c8}', '\u{00cd}', '\u{00cc}', '\u{00d3}', '\u{00d2}',
    '\u{00da}', '\u{00d9}', '\u{0158}', '\u{010c}', '\u{0160}', '\u{017d}', '\u{0110}', '\u{013f}',
    '\u{00c2}', '\u{00c4}', '\u{00ca}', '\u{00cb}', '\u{00ce}', '\u{00cf}', '\u{00d4}', '\u{00d6}',
    '\u{00db}', '\u{00dc}', '\u{0159}', '\u{010d}', '\u{0161}', '\u{017e}', '\u{0111}', '\u{0140}',
    '\u{00c3}', '\u{00c5}', '\u{00c6}', '\u{0152}', '\u{0177}', '\u{00dd}', '\u{00d5}', '\u{00d8}',
    '\u{00de}', '\u{014a}', '\u{0154}', '\u{0106}', '\u{015a}', '\u{0179}', '\u{0166}', '\u{00f0}',
    '\u{00e3}', '\u{00e5}', '\u{00e6}', '\u{0153}', '\u{0175}', '\u{00fd}', '\u{00f5}', '\u{00f8}',
    '\u{00fe}', '\u{014b}', '\u{0155}', '\u{0107}', '\u{015b}', '\u{017a}', '\u{0167}', '\u{0020}',
];

/// Convert an RDS character code to Unicode
///
/// ```
/// use rdsurvey::station::charset::to_char;
///
/// assert_eq!('A', to_char(0x41));
/// assert_eq!('\u{20ac}', to_char(0xa9));
/// ```
#[inline]
pub fn to_char(code: u8) -> char {
    CHARMAP[code as usize]
}

/// Convert both bytes of a block to characters
#[inline]
pub fn block_chars(block: u16) -> [char; 2] {
    [to_char((block >> 8) as u8), to_char(block as u8)]
}

const RDS_PTY: [&str; 32] = [
    "None/Undefined",
    "News",
    "Current Affairs",
    "Information",
    "Sport",
    "Education",
    "Drama",
    "Culture",
    "Science",
    "Varied",
    "Pop Music",
    "Rock Music",
    "Easy Listening Music",
    "Light classical",
    "Serious classical",
    "Other Music",
    "Weather",
    "Finance",
    "Children's programmes",
    "Social Affairs",
    "Religion",
    "Phone In",
    "Travel",
    "Leisure",
    "Jazz Music",
    "Country Music",
    "National Music",
    "Oldies Music",
    "Folk Music",
    "Documentary",
    "Alarm Test",
    "Alarm",
];

const RBDS_PTY: [&str; 32] = [
    "No program type or undefined",
    "News",
    "Information",
    "Sport",
    "Talk",
    "Rock",
    "Classic Rock",
    "Adult Hits",
    "Soft Rock",
    "Top 40",
    "Country",
    "Oldies",
    "Soft",
    "Nostalgia",
    "Jazz",
    "Classical",
    "Rhythm and Blues",
    "Soft Rhythm and Blues",
    "Foreign Language",
    "Religious Music",
    "Religious Talk",
    "Personality",
    "Public",
    "College",
    "Unassigned",
    "Unassigned",
    "Unassigned",
    "Unassigned",
    "Unassigned",
    "Weather",
    "Emergency Test",
    "Emergency",
];

/// Programme type label
///
/// North American (RBDS) stations use a different table
/// from the rest of the world.
///
/// ```
/// use rdsurvey::station::charset::pty_label;
///
/// assert_eq!("Culture", pty_label(7, false));
/// assert_eq!("Adult Hits", pty_label(7, true));
/// ```
pub fn pty_label(pty: u8, rbds: bool) -> &'static str {
    let table = if rbds { &RBDS_PTY } else { &RDS_PTY };
    table[(pty & 0x1f) as usize]
}

const LANGUAGES: [&str; 122] = [
    "Unknown", "Albanian", "Breton", "Catalan",
    "Croatian", "Welsh", "Czech", "Danish",
    "German", "English", "Spanish", "Esperanto",
    "Estonian", "Basque", "Faroese", "French",
    "Frisian", "Irish", "Gaelic", "Galician",
    "Icelandic", "Italian", "Lappish", "Latin",
    "Latvian", "Luxembourgian", "Lithuanian", "Hungarian",
    "Maltese", "Dutch", "Norwegian", "Occitan",
    "Polish", "Portuguese", "Romanian", "Romansh",
    "Serbian", "Slovak", "Slovene", "Finnish",
    "Swedish", "Turkish", "Flemish", "Walloon",
    "<2C>", "<2D>", "<2E>", "<2F>",
    "<30>", "<31>", "<32>", "<33>",
    "<34>", "<35>", "<36>", "<37>",
    "<38>", "<39>", "Void", "<41>",
    "<42>", "<43>", "<44>", "Zulu",
    "Vietnamese", "Uzbek", "Urdu", "Ukrainian",
    "Thai", "Telugu", "Tatar", "Tamil",
    "Tadzhik", "Swahili", "Sranan Tongo", "Somali",
    "Sinhalese", "Shona", "Serbo-Croat", "Ruthenian",
    "Russian", "Quechua", "Pushtu", "Punjabi",
    "Persian", "Papamiento", "Oriya", "Nepali",
    "Ndebele", "Marathi", "Moldavian", "Malaysian",
    "Malagasay", "Macedonian", "Laotian", "Korean",
    "Khmer", "Kazakh", "Kannada", "Japanese",
    "Indonesian", "Hindi", "Hebrew", "Hausa",
    "Gurani", "Gujurati", "Greek", "Georgian",
    "Fulani", "Dari", "Churash", "Chinese",
    "Burmese", "Bulgarian", "Bengali", "Belorussian",
    "Bambora", "Azerbijani", "Assamese", "Armenian",
    "Arabic", "Amharic",
];

/// Language name for a slow-labelling language code
pub fn language(code: u8) -> Option<&'static str> {
    LANGUAGES.get(code as usize).copied()
}

/// ISO 3166 country code from the PI country nibble and ECC
///
/// Returns `None` for an ECC which is not allocated.
///
/// ```
/// use rdsurvey::station::charset::country_code;
///
/// assert_eq!(Some("FR"), country_code(0xf, 0xe1));
/// assert_eq!(Some("DE"), country_code(0xd, 0xe0));
/// ```
pub fn country_code(pi_country: u8, ecc: u8) -> Option<&'static str> {
    let row: &[&str; 16] = match ecc {
        0xE0 => &["  ", "DE", "DZ", "AD", "IL", "IT", "BE", "RU", "PS", "AL", "AT", "HU", "MT", "DE", "  ", "EG"],
        0xE1 => &["  ", "GR", "CY", "SM", "CH", "JO", "FI", "LU", "BG", "DK", "GI", "IQ", "GB", "LY", "RO", "FR"],
        0xE2 => &["  ", "MA", "CZ", "PL", "VA", "SK", "SY", "TN", "  ", "LI", "IS", "MC", "LT", "RS/YU", "ES", "NO"],
        0xE3 => &["  ", "ME", "IE", "TR", "MK", "TJ", "  ", "  ", "NL", "LV", "LB", "AZ", "HR", "KZ", "SE", "BY"],
        0xE4 => &["  ", "MD", "EE", "KG", "  ", "  ", "UA", "KS", "PT", "SI", "AM", "UZ", "GE", "  ", "TM", "BA"],
        0xD0 => &["  ", "CM", "DZ/CF", "DJ", "MG", "ML", "AO", "GQ", "GA", "  ", "ZA", "BF", "CG", "TG", "BJ", "MW"],
        0xD1 => &["  ", "NA", "LR", "GH", "MR", "CV/ST", "  ", "SN", "GM", "BI", "??", "BW", "KM", "TZ", "ET", "NG"],
        0xD2 => &["  ", "SL", "ZW", "MZ", "UG", "SZ", "GN", "SO", "NE", "TD", "GW", "CD", "CI", "  ", "ZM", "ER"],
        0xD3 => &["  ", "  ", "  ", "EH", "??", "RW", "LS", "  ", "SC", "  ", "MU", "  ", "SD", "  ", "  ", "  "],
        0xA0 => &["  ", "US", "US", "US", "US", "US", "US", "US", "US", "US", "US", "US", "  ", "US", "US", "  "],
        0xA1 => &["  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "CA", "CA", "CA", "CA", "GL"],
        0xA2 => &["  ", "AI", "AG", "EC", "  ", "BB", "BZ", "KY", "CR", "CU", "AR", "BR", "BM", "AN", "GP", "BS"],
        0xA3 => &["  ", "BO", "CO", "JM", "MQ", "GF", "PY", "NI", "  ", "PA", "DM", "DO", "CL", "GD", "  ", "GY"],
        0xA4 => &["  ", "GT", "HN", "AW", "  ", "MS", "TT", "PE", "SR", "UY", "KN", "LC", "SV", "HT", "VE", "  "],
        0xA5 => &["  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "MX", "VC", "MX", "MX", "MX/VG"],
        0xA6 => &["  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "PM"],
        0xF0 => &["  ", "AU", "AU", "AU", "AU", "AU", "AU", "AU", "AU", "SA", "AF", "MM", "CN", "KP", "BH", "MY"],
        0xF1 => &["  ", "KI", "BT", "BD", "PK", "FJ", "OM", "NR", "IR", "NZ", "SB", "BN", "LK", "TW", "KR", "HK"],
        0xF2 => &["  ", "KW", "QA", "KH", "WS", "IN", "MO", "VN", "PH", "JP", "SG", "MV", "ID", "AE", "NP", "VU"],
        0xF3 => &["  ", "LA", "TH", "TO", "  ", "  ", "  ", "  ", "  ", "PG", "  ", "YE", "  ", "  ", "FM", "MN"],
        0xF4 => &["  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  ", "  "],
        _ => return None,
    };
    let cc = row[(pi_country & 0xf) as usize];
    if cc.trim().is_empty() {
        None
    } else {
        Some(cc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charmap() {
        assert_eq!('\0', to_char(0));
        assert_eq!('\r', to_char(0x0d));
        assert_eq!(' ', to_char(0x20));
        assert_eq!('z', to_char(0x7a));
        assert_eq!('\u{e1}', to_char(0x80));
        assert_eq!(['C', 'U'], block_chars(0x4355));
    }

    #[test]
    fn test_tables() {
        assert_eq!(Some("French"), language(0x0f));
        assert_eq!(Some("Amharic"), language(0x79));
        assert_eq!(None, language(0x7a));
        assert_eq!(None, country_code(0x0, 0xe1));
        assert_eq!(None, country_code(0x1, 0x00));
        assert_eq!(Some("GB"), country_code(0xc, 0xe1));
    }
}
