use crate::jobs::JobTable;
use crate::vars::VarStore;

/// Mutable state of one shell session.
///
/// The environment contains:
/// - `vars`: shell variables used by `$NAME` expansion.
/// - `jobs`: background jobs that have not been reaped yet.
/// - `history`: input lines read so far, oldest first.
/// - `should_exit`: set by the `exit` built-in; the main loop stops when it is.
#[derive(Debug, Default)]
pub struct Environment {
    pub vars: VarStore,
    pub jobs: JobTable,
    pub history: Vec<String>,
    pub should_exit: bool,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment whose job table lists at most `max_jobs` jobs.
    pub fn with_job_limit(max_jobs: Option<usize>) -> Self {
        Self {
            jobs: max_jobs.map_or_else(JobTable::new, JobTable::bounded),
            ..Self::default()
        }
    }

    /// Remember an input line for the `history` built-in.
    pub fn record_history(&mut self, line: &str) {
        let line = line.trim();
        if !line.is_empty() {
            self.history.push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Environment;

    #[test]
    fn test_history_skips_blank_lines() {
        let mut env = Environment::new();
        env.record_history("  ls -l  ");
        env.record_history("   ");
        env.record_history("");
        env.record_history("pwd");
        assert_eq!(env.history, vec!["ls -l", "pwd"]);
    }

    #[test]
    fn test_job_limit() {
        let env = Environment::with_job_limit(Some(3));
        assert!(env.jobs.is_empty());
        assert!(!env.should_exit);
    }
}
