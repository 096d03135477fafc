// ABOUTME: POSIX shell command builders for operations SFTP cannot do in one request.
// ABOUTME: Paths are single-quoted unless they only contain safe characters.

/// Quote `value` for a POSIX shell.
pub fn quote(value: &str) -> String {
    let safe = !value.is_empty() && value.chars().all(is_safe);
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ',' | ':' | '@' | '%')
}

/// Create `path` and every missing ancestor.
pub fn mkdir_p(path: &str) -> String {
    format!("mkdir -p {}", quote(path))
}
