//! Types for standardized reports to the user about a command run.
//!
//! Commands return their result together with a [`Report`] of things the
//! user should know about but that did not make the command fail, e.g. that
//! some samples had no calls loaded or that a window was corrected.

/// The [`CommandOutput<U>`] type output is generic over some data output
/// from a command, and a [`Report`] that reports information to the user.
#[derive(Debug)]
pub struct CommandOutput<U> {
    value: U,
    report: Report,
}

impl<U> CommandOutput<U> {
    pub fn new(value: U, report: Report) -> Self {
        Self { value, report }
    }

    pub fn value(&self) -> &U {
        &self.value
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_parts(self) -> (U, Report) {
        (self.value, self.report)
    }
}

/// A type to (semi) standardize reporting to the user.
#[derive(Debug, Default)]
pub struct Report {
    entries: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, message: String) {
        self.entries.push(message)
    }

    pub fn issues(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Send every issue to the log at warning level.
    pub fn log(&self) {
        for entry in &self.entries {
            log::warn!("{}", entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report() {
        let mut report = Report::new();
        assert!(report.is_empty());
        report.add_issue("2 samples have no calls loaded".to_string());
        let output = CommandOutput::new(3usize, report);
        assert_eq!(*output.value(), 3);
        let (value, report) = output.into_parts();
        assert_eq!(value, 3);
        assert_eq!(report.issues(), &["2 samples have no calls loaded".to_string()]);
    }
}
