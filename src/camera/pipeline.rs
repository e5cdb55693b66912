//! Structured shell pipelines.
//!
//! The host executes stream pipelines as a single `sh -c` string, but the
//! stages are kept typed until [`Pipeline::to_shell`] so callers and tests can
//! inspect the encode arguments or the delivery target directly.

use std::{borrow::Cow, fmt, str::FromStr};

use serde::Serialize;

/// TCP endpoint the encoded stream is delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub host: String,
    pub port: u16,
}

impl Destination {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Like [`Destination::new`], but refuses hosts `nc` would not read as a
    /// host: empty ones and ones that look like an option.
    pub fn checked(host: impl Into<String>, port: u16) -> Result<Self, String> {
        let host = host.into();
        if host.is_empty() {
            return Err("destination host is empty".to_owned());
        }
        if host.starts_with('-') {
            return Err(format!("destination host `{host}` must not start with `-`"));
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (host, port) = value
            .rsplit_once(':')
            .ok_or_else(|| format!("destination must be host:port, got `{value}`"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = port
            .parse::<u16>()
            .map_err(|err| format!("invalid destination port `{port}`: {err}"))?;
        Self::checked(host, port).map_err(|err| format!("{err} in `{value}`"))
    }
}

/// A plain program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// An ffmpeg run reading one input and writing one muxed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FfmpegInvocation {
    pub program: String,
    pub input_args: Vec<String>,
    pub input: String,
    pub output_args: Vec<String>,
    pub metadata: Vec<(String, String)>,
    pub output_format: String,
    pub video_codec: String,
    pub output: String,
}

impl FfmpegInvocation {
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.program.clone()];
        argv.extend(self.input_args.iter().cloned());
        argv.push("-i".to_owned());
        argv.push(self.input.clone());
        argv.extend(self.output_args.iter().cloned());
        for (key, value) in &self.metadata {
            argv.push("-metadata".to_owned());
            argv.push(format!("{key}={value}"));
        }
        argv.extend([
            "-f".to_owned(),
            self.output_format.clone(),
            "-vcodec".to_owned(),
            self.video_codec.clone(),
            self.output.clone(),
        ]);
        argv
    }
}

/// Final stage writing stdin to a raw TCP connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub program: String,
    pub destination: Destination,
}

impl Delivery {
    pub fn argv(&self) -> Vec<String> {
        vec![
            self.program.clone(),
            self.destination.host.clone(),
            self.destination.port.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Encode(FfmpegInvocation),
    TimestampSync(Command),
    Deliver(Delivery),
}

impl Stage {
    pub fn argv(&self) -> Vec<String> {
        match self {
            Stage::Encode(ffmpeg) => ffmpeg.argv(),
            Stage::TimestampSync(command) => command.argv(),
            Stage::Deliver(delivery) => delivery.argv(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn encode(&self) -> Option<&FfmpegInvocation> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Encode(ffmpeg) => Some(ffmpeg),
            _ => None,
        })
    }

    pub fn delivery(&self) -> Option<&Delivery> {
        match self.stages.last() {
            Some(Stage::Deliver(delivery)) => Some(delivery),
            _ => None,
        }
    }

    pub fn has_timestamp_sync(&self) -> bool {
        self.stages
            .iter()
            .any(|stage| matches!(stage, Stage::TimestampSync(_)))
    }

    /// Renders the pipeline as a POSIX shell command line.
    pub fn to_shell(&self) -> String {
        self.stages
            .iter()
            .map(|stage| {
                stage
                    .argv()
                    .iter()
                    .map(|word| shell_quote(word))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell())
    }
}

pub fn shell_quote(word: &str) -> Cow<'_, str> {
    let safe = !word.is_empty()
        && word.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'-' | b'_' | b'.' | b'/' | b':' | b'=' | b'+' | b',' | b'@' | b'%'
                )
        });
    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}
