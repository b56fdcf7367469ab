use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, bounded, select};

use crate::{error::PositionLogError, pipeline::SharedPosition, types::SampledPosition};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CreationPolicy {
    #[default]
    #[value(name = "replace")]
    ReplaceExisting,
    Append,
}

pub trait PositionSink: Send + 'static {
    fn append(&mut self, line: &str) -> io::Result<()>;
}

#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    pub fn create(path: &Path, policy: CreationPolicy) -> Result<Self> {
        let mut options = OpenOptions::new();
        match policy {
            CreationPolicy::ReplaceExisting => options.write(true).create(true).truncate(true),
            CreationPolicy::Append => options.append(true).create(true),
        };
        let file = options
            .open(path)
            .with_context(|| format!("failed to open position log {}", path.display()))?;
        Ok(FileSink {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PositionSink for FileSink {
    fn append(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.flush()
    }
}

/// Forwards lines to a channel; handy when another thread owns storage.
impl PositionSink for Sender<String> {
    fn append(&mut self, line: &str) -> io::Result<()> {
        self.send(line.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "position receiver dropped"))
    }
}

/// Background task appending the shared position to a sink once per
/// interval. Stops and joins when dropped.
#[derive(Debug)]
pub struct PositionLogger {
    stop: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PositionLogger {
    pub fn spawn<K: PositionSink>(position: SharedPosition, mut sink: K, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let handle = thread::spawn(move || {
            loop {
                let line = position.snapshot().log_line();
                if let Err(err) = sink.append(&line) {
                    log::warn!("failed to append position sample: {err:?}");
                }

                select! {
                    recv(stop_rx) -> _ => break,
                    default(interval) => {}
                }
            }
            log::debug!("position logger stopped");
        });

        PositionLogger {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the loop.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PositionLogger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reads a position log back, one `x y z` triple per non-empty line.
pub fn parse_position_log<R: BufRead>(reader: R) -> Result<Vec<SampledPosition>, PositionLogError> {
    let mut positions = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 3 {
            return Err(PositionLogError::FieldCount {
                line: number,
                found: fields.len(),
            });
        }

        let coordinate = |value: &str| {
            value
                .parse::<f32>()
                .map_err(|_| PositionLogError::InvalidCoordinate {
                    line: number,
                    value: value.to_string(),
                })
        };
        positions.push(SampledPosition {
            x: coordinate(fields[0])?,
            y: coordinate(fields[1])?,
            z: coordinate(fields[2])?,
        });
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Cursor, time::Instant};

    use crossbeam_channel::unbounded;

    use super::*;

    #[test]
    fn logger_writes_latest_snapshot_until_stopped() {
        let position = SharedPosition::new(SampledPosition {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        });
        let (line_tx, line_rx) = unbounded();
        let logger = PositionLogger::spawn(position.clone(), line_tx, Duration::from_millis(10));

        assert_eq!(line_rx.recv_timeout(Duration::from_secs(2)).unwrap(), "1 2 3\n");

        position.store(SampledPosition {
            x: 4.0,
            y: 5.0,
            z: 6.0,
        });
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut saw_update = false;
        while Instant::now() < deadline {
            if line_rx.recv_timeout(Duration::from_millis(100)).as_deref() == Ok("4 5 6\n") {
                saw_update = true;
                break;
            }
        }
        assert!(saw_update);

        logger.stop();
        while line_rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(30));
        assert!(line_rx.try_recv().is_err());
    }

    #[test]
    fn file_sink_policies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.txt");
        fs::write(&path, "stale\n").unwrap();

        let mut sink = FileSink::create(&path, CreationPolicy::ReplaceExisting).unwrap();
        sink.append("0.5 0 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "0.5 0 1\n");

        let mut sink = FileSink::create(&path, CreationPolicy::Append).unwrap();
        sink.append("1 1 1\n").unwrap();
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "0.5 0 1\n1 1 1\n");
    }

    #[test]
    fn parses_written_lines() {
        let text = "0.25 -0.5 2\n\n1 2 3\n";
        let positions = parse_position_log(Cursor::new(text)).unwrap();

        assert_eq!(
            positions,
            vec![
                SampledPosition {
                    x: 0.25,
                    y: -0.5,
                    z: 2.0
                },
                SampledPosition {
                    x: 1.0,
                    y: 2.0,
                    z: 3.0
                },
            ]
        );
    }

    #[test]
    fn reports_malformed_lines() {
        let err = parse_position_log(Cursor::new("1 2 3\n1 2\n")).unwrap_err();
        assert!(matches!(err, PositionLogError::FieldCount { line: 2, found: 2 }));

        let err = parse_position_log(Cursor::new("1 two 3\n")).unwrap_err();
        assert!(matches!(
            err,
            PositionLogError::InvalidCoordinate { line: 1, ref value } if value == "two"
        ));
    }
}
