/// Ordered diary of a single refresh run, returned to the caller with both
/// success and failure responses. Entries are mirrored to tracing.
#[derive(Debug, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "edis_server::run", "{}", line);
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_keeps_order() {
        let mut log = RunLog::new();
        log.push("first");
        log.push(format!("second {}", 2));
        assert_eq!(log.lines(), &["first".to_string(), "second 2".to_string()]);
        assert_eq!(log.len(), 2);
    }
}
