//! Validates that an uploaded blob looks like a Netscape `cookies.txt` jar
//! (§4.B, §6): either a `#`-prefixed header line or one-or-more
//! tab-separated 7-column lines.

use ytd_core::CoreError;

const EXPECTED_COLUMNS: usize = 7;

pub fn validate(blob: &[u8]) -> Result<(), CoreError> {
    if blob.is_empty() {
        return Err(CoreError::InvalidFormat("cookie jar is empty".into()));
    }

    let text = std::str::from_utf8(blob)
        .map_err(|_| CoreError::InvalidFormat("cookie jar is not valid UTF-8".into()))?;

    let mut saw_data_line = false;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let columns = line.split('\t').count();
        if columns != EXPECTED_COLUMNS {
            return Err(CoreError::InvalidFormat(format!(
                "expected {EXPECTED_COLUMNS} tab-separated columns, found {columns}"
            )));
        }
        saw_data_line = true;
    }

    if !saw_data_line {
        return Err(CoreError::InvalidFormat(
            "cookie jar contains no data lines".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_netscape_jar_with_header() {
        let jar = "# Netscape HTTP Cookie File\nexample.test\tFALSE\t/\tFALSE\t0\tsession\tabc123\n";
        assert!(validate(jar.as_bytes()).is_ok());
    }

    #[test]
    fn rejects_empty_blob() {
        assert!(validate(b"").is_err());
    }

    #[test]
    fn rejects_wrong_column_count() {
        let jar = "example.test\tFALSE\t/\tFALSE\n";
        assert!(validate(jar.as_bytes()).is_err());
    }

    #[test]
    fn rejects_header_only_jar() {
        let jar = "# Netscape HTTP Cookie File\n";
        assert!(validate(jar.as_bytes()).is_err());
    }
}
