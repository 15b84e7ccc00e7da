//! Supported announcement languages and their TTS language codes

/// Language names accepted in configuration, lowercase
pub const LANGUAGES: &[&str] = &[
    "arabic",
    "chinese",
    "czech",
    "danish",
    "dutch",
    "english",
    "filipino",
    "finnish",
    "french",
    "german",
    "greek",
    "hindi",
    "italian",
    "japanese",
    "korean",
    "norwegian",
    "polish",
    "portuguese",
    "russian",
    "spanish",
    "swedish",
    "thai",
    "turkish",
    "ukrainian",
    "vietnamese",
];

/// TTS language code for a configured language name, case-insensitive
pub fn language_code(name: &str) -> Option<&'static str> {
    let code = match name.to_ascii_lowercase().as_str() {
        "arabic" => "ar",
        "chinese" => "zh",
        "czech" => "cs",
        "danish" => "da",
        "dutch" => "nl",
        "english" => "en",
        "filipino" => "tl",
        "finnish" => "fi",
        "french" => "fr",
        "german" => "de",
        "greek" => "el",
        "hindi" => "hi",
        "italian" => "it",
        "japanese" => "ja",
        "korean" => "ko",
        "norwegian" => "no",
        "polish" => "pl",
        "portuguese" => "pt",
        "russian" => "ru",
        "spanish" => "es",
        "swedish" => "sv",
        "thai" => "th",
        "turkish" => "tr",
        "ukrainian" => "uk",
        "vietnamese" => "vi",
        _ => return None,
    };
    Some(code)
}

/// Whether a language name is in the supported set
pub fn is_supported(name: &str) -> bool {
    language_code(name).is_some()
}
