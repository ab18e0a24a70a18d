//! Manual size entry for dry runs.
//!
//! In debug mode no encoder runs, so the size of every attempt is typed in
//! by the user instead of read from disk.

use fitenc_core::external::FileMetadataProvider;
use fitenc_core::{CoreError, CoreResult};
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::path::Path;

const PROMPT: &str = "Output size in MiB: ";

/// Asks for the size of each attempt on a reader (stdin in practice).
pub struct PromptedSizeProvider<R: BufRead, W: Write> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl<R: BufRead, W: Write> PromptedSizeProvider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }
}

/// Parses a MiB value typed by the user into bytes.
fn parse_mib(line: &str) -> Option<u64> {
    let mib: f64 = line.trim().parse().ok()?;
    (mib.is_finite() && mib >= 0.0).then(|| (mib * 1024.0 * 1024.0).round() as u64)
}

impl<R: BufRead, W: Write> FileMetadataProvider for PromptedSizeProvider<R, W> {
    fn get_size(&self, path: &Path) -> CoreResult<u64> {
        let mut input = self.input.borrow_mut();
        let mut output = self.output.borrow_mut();
        loop {
            write!(output, "{}\n{PROMPT}", path.display())?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(CoreError::OperationFailed(
                    "No size entered for dry-run attempt".to_string(),
                ));
            }
            match parse_mib(&line) {
                Some(bytes) => return Ok(bytes),
                None => writeln!(output, "Not a size: {}", line.trim())?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_mib() {
        assert_eq!(parse_mib("3\n"), Some(3 * 1024 * 1024));
        assert_eq!(parse_mib(" 0.5 "), Some(524_288));
        assert_eq!(parse_mib("-1"), None);
        assert_eq!(parse_mib("big"), None);
    }

    #[test]
    fn test_reprompts_until_valid() {
        let provider = PromptedSizeProvider::new(Cursor::new("oops\n2.5\n"), Vec::new());
        let size = provider.get_size(Path::new("attempt_01.webm")).unwrap();
        assert_eq!(size, 2_621_440);

        let shown = String::from_utf8(provider.output.into_inner()).unwrap();
        assert_eq!(shown.matches(PROMPT).count(), 2);
        assert!(shown.contains("Not a size: oops"));
    }

    #[test]
    fn test_end_of_input_is_an_error() {
        let provider = PromptedSizeProvider::new(Cursor::new(""), Vec::new());
        assert!(provider.get_size(Path::new("a.webm")).is_err());
    }
}
