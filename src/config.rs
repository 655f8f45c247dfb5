// src/config.rs

use crate::error::ConfigError;
use std::io::{BufRead, Write};
use std::time::Duration;

/// Three hours.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_800_000;
/// Intervals below this need explicit confirmation.
pub const LOW_POLL_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollInterval {
    Accepted(Duration),
    NeedsConfirmation(Duration),
}

impl PollInterval {
    /// Parses a millisecond count. Empty input selects the default.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(PollInterval::Accepted(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)));
        }

        let millis: i64 = input
            .parse()
            .map_err(|_| ConfigError::NotANumber(input.to_string()))?;
        if millis < 0 {
            return Err(ConfigError::Negative(millis));
        }

        let millis = millis as u64;
        let duration = Duration::from_millis(millis);
        if millis < LOW_POLL_INTERVAL_MS {
            Ok(PollInterval::NeedsConfirmation(duration))
        } else {
            Ok(PollInterval::Accepted(duration))
        }
    }

    /// Resolves a non-interactive value; low intervals need `confirmed`.
    pub fn resolve(self, confirmed: bool) -> Result<Duration, ConfigError> {
        match self {
            PollInterval::Accepted(d) => Ok(d),
            PollInterval::NeedsConfirmation(d) if confirmed => Ok(d),
            PollInterval::NeedsConfirmation(_) => Err(ConfigError::Declined),
        }
    }
}

/// Line-oriented terminal prompt.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Asks `question` and returns the trimmed answer.
    pub fn ask(&mut self, question: &str) -> Result<String, ConfigError> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input closed",
            )));
        }
        Ok(line.trim().to_string())
    }

    /// Only an exact "Y" confirms.
    pub fn confirm_low_interval(&mut self) -> Result<bool, ConfigError> {
        let answer = self.ask(
            "This value will cause a high resource usage, are you sure? \
             (Y to continue, anything else to return)",
        )?;
        Ok(answer == "Y")
    }

    /// Uses the interval given as a flag when it is valid, confirming a low
    /// value unless `confirmed`. A rejected flag falls back to asking.
    pub fn poll_interval_from(
        &mut self,
        flag: Option<&str>,
        confirmed: bool,
    ) -> Result<Duration, ConfigError> {
        let Some(value) = flag else {
            return self.poll_interval();
        };
        match PollInterval::parse(value) {
            Ok(PollInterval::NeedsConfirmation(d)) if !confirmed => {
                if self.confirm_low_interval()? {
                    return Ok(d);
                }
            }
            Ok(parsed) => return parsed.resolve(true),
            Err(e) => {
                tracing::debug!("Rejected --poll-interval-ms value: {}", e);
                writeln!(self.output, "Error. {}", e)?;
            }
        }
        self.poll_interval()
    }

    /// Asks until a usable poll interval is given. Low values must be
    /// confirmed with "Y"; any other answer asks again.
    pub fn poll_interval(&mut self) -> Result<Duration, ConfigError> {
        loop {
            let answer = self.ask(
                "Time between repository update checks, in milliseconds \
                 (leave empty for the default of 3 hours):",
            )?;
            match PollInterval::parse(&answer) {
                Ok(PollInterval::Accepted(d)) => return Ok(d),
                Ok(PollInterval::NeedsConfirmation(d)) => {
                    if self.confirm_low_interval()? {
                        return Ok(d);
                    }
                }
                Err(ConfigError::Io(e)) => return Err(ConfigError::Io(e)),
                Err(e) => {
                    tracing::debug!("Rejected poll interval input: {}", e);
                    writeln!(self.output, "Error. {}", e)?;
                }
            }
        }
    }
}
