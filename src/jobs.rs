use crate::process::Process;
use log::{debug, info, warn};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Finished,
}

/// A command started in the background.
///
/// A job owns every process it consists of: one for a plain command, two for
/// a pipeline. Its process id is the one of the last stage.
#[derive(Debug)]
pub struct Job {
    pid: u32,
    command: String,
    processes: Vec<Process>,
    state: JobState,
}

impl Job {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Collect whatever processes have exited. The job is finished once all have.
    fn poll(&mut self) -> JobState {
        let mut running = false;
        for process in &mut self.processes {
            match process.poll() {
                Ok(Some(_)) => {}
                Ok(None) => running = true,
                Err(e) => warn!("{}", e),
            }
        }
        if !running {
            self.state = JobState::Finished;
        }
        self.state
    }
}

/// Background jobs of a shell session, in launch order.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    /// Processes no longer listed in the table that still have to be reaped.
    detached: Vec<Process>,
    capacity: Option<usize>,
}

impl JobTable {
    /// An unbounded table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding at most `capacity` jobs.
    ///
    /// Jobs started while it is full are not listed, but are still reaped.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Register the processes of a background command.
    ///
    /// Returns the job's 1-based position in the table, or `None` if it was not
    /// listed because the table is full.
    pub fn add(&mut self, command: impl Into<String>, processes: Vec<Process>) -> Option<usize> {
        if processes.is_empty() {
            return None;
        }
        let command = command.into();
        if self.capacity.is_some_and(|cap| self.jobs.len() >= cap) {
            debug!("job table full, not listing `{}`", command);
            self.detached.extend(processes);
            return None;
        }
        let job = Job {
            pid: processes.last().map_or(0, Process::pid),
            command,
            processes,
            state: JobState::Running,
        };
        info!("job [{}] started: pid {} `{}`", self.jobs.len() + 1, job.pid(), job.command);
        self.jobs.push(job);
        Some(self.jobs.len())
    }

    /// Remove the job with process id `pid`, keeping the order of the others.
    ///
    /// Processes of a removed job that are still running are kept for reaping.
    pub fn remove(&mut self, pid: u32) -> Option<Job> {
        let idx = self.jobs.iter().position(|job| job.pid() == pid)?;
        let mut job = self.jobs.remove(idx);
        if job.state == JobState::Running {
            self.detached.append(&mut job.processes);
        }
        Some(job)
    }

    /// Collect every finished background process without blocking.
    ///
    /// Finished jobs are removed from the table and returned.
    pub fn reap(&mut self) -> Vec<Job> {
        self.detached.retain_mut(|process| match process.poll() {
            Ok(Some(_)) => false,
            Ok(None) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        });

        let finished: Vec<u32> = self
            .jobs
            .iter_mut()
            .filter_map(|job| (job.poll() == JobState::Finished).then(|| job.pid()))
            .collect();

        finished
            .into_iter()
            .filter_map(|pid| self.remove(pid))
            .inspect(|job| info!("job finished: pid {} `{}`", job.pid(), job.command))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of processes the table still has to reap, listed or not.
    pub fn pending_processes(&self) -> usize {
        self.detached.len()
            + self
                .jobs
                .iter()
                .map(|job| job.processes.len())
                .sum::<usize>()
    }

    /// Print one `[index] pid command` line per job.
    pub fn list(&self, out: &mut dyn Write) -> io::Result<()> {
        for (i, job) in self.jobs.iter().enumerate() {
            writeln!(out, "[{}] {} {}", i + 1, job.pid(), job.command)?;
        }
        Ok(())
    }
}
