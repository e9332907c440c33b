//! Extraction of database credentials from `wp-config.php`.

use crate::error::{Error, Result};
use crate::models::DatabaseCredentials;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, instrument};

/// Matches `define('DB_*', '...');` anywhere. Run on comment-free text.
static DEFINE_RE: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(
        r#"\bdefine\s*\(\s*['"](?P<key>DB_NAME|DB_USER|DB_PASSWORD|DB_HOST)['"]\s*,\s*(?:'(?P<single>(?:[^'\\]|\\.)*)'|"(?P<double>(?:[^"\\]|\\.)*)")\s*\)\s*;"#,
    )
    .expect("define pattern is valid")
});

/// Reads `<site_dir>/<file_name>` and extracts the four `DB_*` constants.
#[instrument(skip_all, fields(site = %site_dir.display()))]
pub fn read_credentials(site_dir: &Path, file_name: &str) -> Result<DatabaseCredentials> {
    let path = site_dir.join(file_name);
    debug!(path = %path.display(), "Parsing WordPress configuration.");
    let content = fs::read_to_string(&path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => Error::WpConfigNotFound { path: path.clone() },
        _ => Error::WpConfigUnreadable {
            path: path.clone(),
            source,
        },
    })?;
    parse_credentials(&content, &path)
}

/// Parses credentials out of configuration text. `path` is only used for diagnostics.
pub fn parse_credentials(content: &str, path: &Path) -> Result<DatabaseCredentials> {
    let code = strip_comments(content);
    let mut values: HashMap<&str, String> = HashMap::new();
    for caps in DEFINE_RE.captures_iter(&code) {
        let key = caps.name("key").map_or("", |m| m.as_str());
        let value = match (caps.name("single"), caps.name("double")) {
            (Some(m), _) => unescape(m.as_str(), &['\'', '\\']),
            (None, Some(m)) => unescape(m.as_str(), &['"', '\\', '$']),
            (None, None) => String::new(),
        };
        values.entry(key).or_insert(value);
    }

    let mut take = |key: &'static str| {
        values.remove(key).ok_or_else(|| Error::CorruptWpConfig {
            path: path.to_path_buf(),
            key,
        })
    };

    Ok(DatabaseCredentials {
        database: take("DB_NAME")?,
        user: take("DB_USER")?,
        password: take("DB_PASSWORD")?,
        host: take("DB_HOST")?,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Replaces `//`, `#` and `/* */` comments with whitespace, leaving quoted strings untouched.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut state = Lexeme::Code;
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            Lexeme::Code => match c {
                '\'' | '"' => {
                    state = Lexeme::Quoted(c);
                    out.push(c);
                }
                '#' => state = Lexeme::LineComment,
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = Lexeme::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = Lexeme::BlockComment;
                    out.push(' ');
                }
                _ => out.push(c),
            },
            Lexeme::Quoted(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote {
                    state = Lexeme::Code;
                }
            }
            Lexeme::LineComment => {
                if c == '\n' {
                    state = Lexeme::Code;
                    out.push(c);
                }
            }
            Lexeme::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = Lexeme::Code;
                } else if c == '\n' {
                    out.push(c);
                }
            }
        }
    }
    out
}

fn unescape(raw: &str, escapable: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if escapable.contains(&next) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}
