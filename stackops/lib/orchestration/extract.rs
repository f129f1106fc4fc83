//! Attribution of operation output to the containers it complains about.

use crate::models::ContainerErrorMap;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Substrings that open a new error block.
const ERROR_MARKERS: &[&str] = &["Error response from daemon", "ERROR:"];

/// Characters stripped from a container name taken from the output.
const NAME_PUNCTUATION: &[char] = &['"', '\'', '`', ':', ',', ';'];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A single forward scan over operation output.
#[derive(Debug, Default)]
struct ErrorScan {
    /// The container the current block is attributed to, empty until one is referenced.
    container: String,

    /// The text accumulated for the current block, empty when no block is open.
    error: String,

    /// Whether the current block has referenced its container itself.
    attributed: bool,

    /// The flushed blocks.
    errors: ContainerErrorMap,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ErrorScan {
    fn feed(&mut self, line: &str) {
        let line = line.trim_end();
        let is_marker = is_error_marker(line);

        if is_marker {
            self.flush();
            self.error = line.to_string();
            self.attributed = false;
        }

        if let Some(container) = referenced_container(line) {
            // A block that already named its container ends at a reference to another one.
            if self.attributed && self.container != container {
                self.flush();
            }

            self.container = container;
            self.error = line.to_string();
            self.attributed = true;
            return;
        }

        if !is_marker && !line.trim().is_empty() && !self.error.is_empty() {
            self.error.push('\n');
            self.error.push_str(line);
        }
    }

    fn flush(&mut self) {
        if self.container.is_empty() || self.error.is_empty() {
            return;
        }

        self.errors
            .insert(self.container.clone(), self.error.trim().to_string());
    }

    fn finish(mut self) -> ContainerErrorMap {
        self.flush();
        self.errors
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Extracts per-container error text from the raw output of an operation.
///
/// Output that cannot be attributed to a container is dropped, so the result may be empty even
/// for output full of errors.
pub fn extract_container_errors(output: &str) -> ContainerErrorMap {
    let mut scan = ErrorScan::default();
    for line in output.lines() {
        scan.feed(line);
    }

    scan.finish()
}

fn is_error_marker(line: &str) -> bool {
    ERROR_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Returns the name following the word `container` on a "container ... not found" line.
fn referenced_container(line: &str) -> Option<String> {
    if !line.contains("container") || !line.contains("not found") {
        return None;
    }

    let mut words = line.split_whitespace();
    words.find(|word| word.trim_matches(NAME_PUNCTUATION) == "container")?;

    let name = words.next()?.trim_matches(NAME_PUNCTUATION);
    if name.is_empty() || name == "not" {
        return None;
    }

    Some(name.to_string())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
