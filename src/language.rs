use rusqlite::Connection;
use thiserror::Error;

/// Language codes end up in column names (`name_<lang>`), so only short
/// lowercase ASCII codes are allowed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LanguageError {
    #[error("invalid language code {0:?}: expected 2-3 lowercase ASCII letters")]
    Invalid(String),
}

pub fn is_valid_language(code: &str) -> bool {
    (2..=3).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_lowercase())
}

pub fn validate_language(code: &str) -> Result<&str, LanguageError> {
    if is_valid_language(code) {
        Ok(code)
    } else {
        Err(LanguageError::Invalid(code.to_string()))
    }
}

/// Normalise a user-supplied language list: trimmed, lowercased,
/// deduplicated (first occurrence wins) and validated.
pub fn resolve_languages<I, S>(raw: I) -> Result<Vec<String>, LanguageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut languages: Vec<String> = Vec::new();

    for lang in raw {
        let lang = lang.as_ref().trim().to_ascii_lowercase();
        if lang.is_empty() {
            continue;
        }
        validate_language(&lang)?;
        if !languages.contains(&lang) {
            languages.push(lang);
        }
    }

    Ok(languages)
}

/// Language codes of the `name_<lang>` columns on `table`, in column order
pub fn language_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT SUBSTR(name, 6) FROM pragma_table_info(?1) WHERE name LIKE 'name\\_%' ESCAPE '\\'",
    )?;
    let languages = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(languages)
}
