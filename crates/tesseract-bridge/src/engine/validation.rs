use std::path::Path;

use crate::error::{BridgeError, Result};

/// Validate a (possibly `+`-joined) language code before it reaches the native engine.
///
/// Each component is one or more `/`-separated segments of ASCII letters, digits and `_`, so script models such
/// as `script/Latin` pass while `..` and absolute paths do not. The native engine can abort on an empty language
/// instead of returning an error, so this runs before any initialization attempt.
pub fn validate_language_code(language: &str) -> Result<()> {
    if language.trim().is_empty() {
        return Err(BridgeError::engine_init(
            "Language cannot be empty. Please specify a valid language code (e.g., 'eng')",
        ));
    }

    for code in language.split('+') {
        let valid = code
            .split('/')
            .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        if !valid {
            return Err(BridgeError::engine_init(format!(
                "Language code '{}' in '{}' is not a valid Tesseract language code",
                code, language
            )));
        }
    }
    Ok(())
}

/// Check that `<data_path>/<lang>.traineddata` exists for every component of `language`.
pub fn check_traineddata(data_path: &Path, language: &str) -> Result<()> {
    if !data_path.is_dir() {
        return Err(BridgeError::engine_init(format!(
            "Tessdata directory does not exist: {}",
            data_path.display()
        )));
    }

    for lang in language.split('+').map(str::trim).filter(|l| !l.is_empty()) {
        let traineddata_path = data_path.join(format!("{}.traineddata", lang));
        if !traineddata_path.exists() {
            return Err(BridgeError::engine_init(format!(
                "Language '{}' not found. Traineddata file does not exist: {}",
                lang,
                traineddata_path.display()
            )));
        }
    }
    Ok(())
}
