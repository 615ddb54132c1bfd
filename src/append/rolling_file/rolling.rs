// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;
use crate::ErrorKind;

/// A writer that appends to a file and rotates it by size.
///
/// When the active file is not empty and the next write would push it past `max_bytes`, the
/// file is archived as `<path>.1` (shifting `<path>.1` to `<path>.2` and so on), at most
/// `backup_count` archives are kept, and a new empty active file is opened.
#[derive(Debug)]
pub struct RollingFileWriter {
    state: State,
    writer: Option<File>,
}

impl RollingFileWriter {
    /// Creates a new [`RollingFileWriterBuilder`].
    #[must_use]
    pub fn builder(path: impl Into<PathBuf>) -> RollingFileWriterBuilder {
        RollingFileWriterBuilder::new(path)
    }

    /// The path of the active file.
    pub fn path(&self) -> &Path {
        &self.state.path
    }

    /// The size of the active file as tracked by the writer.
    pub fn current_filesize(&self) -> u64 {
        self.state.current_filesize
    }

    /// Write one whole line, rotating first if it would not fit in the active file.
    pub fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        if self.state.should_rollover(line.len()) {
            self.rollover()?;
        }

        let writer = self.writer.as_mut().ok_or_else(closed)?;
        writer.write_all(line)?;
        self.state.current_filesize += line.len() as u64;
        Ok(())
    }

    /// Point the writer at another file, opened in append mode.
    ///
    /// Missing parent directories are created. The previous file is flushed and closed only
    /// once the new one is open, so a failure leaves the writer unchanged.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) -> Result<(), Error> {
        let path = path.into();
        let (file, size) = open_log_file(&path)?;
        if let Some(mut previous) = self.writer.replace(file) {
            if let Err(err) = previous.flush() {
                eprintln!("failed to flush previous log file: {err}");
            }
        }
        self.state.path = path;
        self.state.current_filesize = size;
        Ok(())
    }

    /// Flush the active file, if one is open.
    pub fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Flush and close the active file. Later writes fail until [`set_path`] reopens one.
    ///
    /// [`set_path`]: RollingFileWriter::set_path
    pub fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn rollover(&mut self) -> io::Result<()> {
        // release the handle first; some platforms refuse to rename an open file
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.state.shift_backups()?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.state.path)?;
        self.writer = Some(file);
        self.state.current_filesize = 0;
        Ok(())
    }
}

/// A builder for configuring [`RollingFileWriter`].
#[derive(Debug)]
pub struct RollingFileWriterBuilder {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
}

impl RollingFileWriterBuilder {
    /// Creates a new [`RollingFileWriterBuilder`] writing to `path`.
    ///
    /// By default the file is never rotated.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: 0,
            backup_count: 0,
        }
    }

    /// Sets the size in bytes past which the active file is rotated. Zero disables rotation.
    #[must_use]
    pub fn max_bytes(mut self, n: u64) -> Self {
        self.max_bytes = n;
        self
    }

    /// Sets the number of archived files to keep. Zero disables rotation.
    #[must_use]
    pub fn backup_count(mut self, n: usize) -> Self {
        self.backup_count = n;
        self
    }

    /// Builds the [`RollingFileWriter`].
    ///
    /// # Errors
    ///
    /// Return an error if the path is empty, or if the file or its parent directories cannot
    /// be created.
    pub fn build(self) -> Result<RollingFileWriter, Error> {
        let Self {
            path,
            max_bytes,
            backup_count,
        } = self;

        if path.as_os_str().is_empty() {
            return Err(Error::configuration("log file path is empty"));
        }

        let (writer, current_filesize) = open_log_file(&path)?;
        let state = State {
            path,
            max_bytes,
            backup_count,
            current_filesize,
        };
        Ok(RollingFileWriter {
            state,
            writer: Some(writer),
        })
    }
}

#[derive(Debug)]
struct State {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    current_filesize: u64,
}

impl State {
    fn should_rollover(&self, incoming: usize) -> bool {
        self.max_bytes > 0
            && self.backup_count > 0
            && self.current_filesize > 0
            && self.current_filesize + incoming as u64 > self.max_bytes
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn shift_backups(&self) -> io::Result<()> {
        for n in (1..self.backup_count).rev() {
            let src = self.backup_path(n);
            if src.exists() {
                let dst = self.backup_path(n + 1);
                remove_if_exists(&dst)?;
                fs::rename(&src, &dst)?;
            }
        }

        let dst = self.backup_path(1);
        remove_if_exists(&dst)?;
        match fs::rename(&self.path, &dst) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn open_log_file(path: &Path) -> Result<(File, u64), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            Error::new(ErrorKind::Io, "failed to create log directory")
                .with_context("path", parent.display())
                .with_source(err)
        })?;
    }

    let open_error = |err: io::Error| {
        Error::new(ErrorKind::Io, "failed to open log file")
            .with_context("path", path.display())
            .with_source(err)
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_error)?;
    let size = file.metadata().map_err(open_error)?.len();
    Ok((file, size))
}

fn closed() -> io::Error {
    io::Error::other("log file is closed")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;

    fn line(len: usize) -> Vec<u8> {
        let mut rng = rand::rng();
        let mut line: Vec<u8> = std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .take(len - 1)
            .collect();
        line.push(b'\n');
        line
    }

    fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_rotates_when_line_does_not_fit() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("log.jsonl");
        let mut writer = RollingFileWriter::builder(&path)
            .max_bytes(100)
            .backup_count(2)
            .build()
            .unwrap();

        for _ in 0..3 {
            writer.write_line(&line(30)).unwrap();
        }
        assert_eq!(writer.current_filesize(), 90);
        assert_eq!(count_files(temp_dir.path()), 1);

        // 120 bytes would not fit: exactly one rotation
        writer.write_line(&line(30)).unwrap();
        assert_eq!(writer.current_filesize(), 30);
        assert_eq!(count_files(temp_dir.path()), 2);
        assert_eq!(fs::metadata(writer.state.backup_path(1)).unwrap().len(), 90);
        assert_eq!(fs::metadata(&path).unwrap().len(), 30);
    }

    #[test]
    fn test_keeps_at_most_backup_count_archives() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("log.jsonl");
        let backup_count = 3;
        let mut writer = RollingFileWriter::builder(&path)
            .max_bytes(50)
            .backup_count(backup_count)
            .build()
            .unwrap();

        // every line fills the file, so every later line rotates
        let mut generations = vec![];
        for i in 0..(backup_count + 3) {
            let mut content = format!("generation {i:02}").into_bytes();
            content.resize(49, b'.');
            content.push(b'\n');
            writer.write_line(&content).unwrap();
            writer.flush().unwrap();
            generations.push(content);

            assert_eq!(count_files(temp_dir.path()), (i + 1).min(backup_count + 1));
        }

        // the newest archives survive, the oldest are discarded
        let last = generations.len() - 1;
        assert_eq!(fs::read(&path).unwrap(), generations[last]);
        for n in 1..=backup_count {
            let archived = fs::read(writer.state.backup_path(n)).unwrap();
            assert_eq!(archived, generations[last - n]);
        }
        assert!(!writer.state.backup_path(backup_count + 1).exists());
    }

    #[test]
    fn test_zero_limits_never_rotate() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");

        let path = temp_dir.path().join("no_size.jsonl");
        let mut writer = RollingFileWriter::builder(&path)
            .max_bytes(0)
            .backup_count(2)
            .build()
            .unwrap();
        for _ in 0..10 {
            writer.write_line(&line(64)).unwrap();
        }
        assert_eq!(writer.current_filesize(), 640);

        let path = temp_dir.path().join("no_backup.jsonl");
        let mut writer = RollingFileWriter::builder(&path)
            .max_bytes(10)
            .backup_count(0)
            .build()
            .unwrap();
        for _ in 0..10 {
            writer.write_line(&line(64)).unwrap();
        }
        assert_eq!(writer.current_filesize(), 640);
        assert_eq!(count_files(temp_dir.path()), 2);
    }

    #[test]
    fn test_oversized_line_in_empty_file_is_written() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("log.jsonl");
        let mut writer = RollingFileWriter::builder(&path)
            .max_bytes(10)
            .backup_count(1)
            .build()
            .unwrap();

        writer.write_line(&line(64)).unwrap();
        assert_eq!(count_files(temp_dir.path()), 1);
        assert_eq!(writer.current_filesize(), 64);
    }

    #[test]
    fn test_reopen_appends_and_tracks_size() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("nested").join("dir").join("log.jsonl");

        let mut writer = RollingFileWriter::builder(&path).build().unwrap();
        writer.write_line(&line(20)).unwrap();
        writer.close().unwrap();
        assert!(writer.write_line(&line(20)).is_err());

        let writer = RollingFileWriter::builder(&path).build().unwrap();
        assert_eq!(writer.current_filesize(), 20);
    }

    #[test]
    fn test_set_path_swaps_file() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let old = temp_dir.path().join("old.jsonl");
        let new = temp_dir.path().join("sub").join("new.jsonl");

        let mut writer = RollingFileWriter::builder(&old).build().unwrap();
        writer.write_line(b"first\n").unwrap();
        writer.set_path(&new).unwrap();
        writer.write_line(b"second\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(writer.path(), new.as_path());
        assert_eq!(fs::read_to_string(&old).unwrap(), "first\n");
        assert_eq!(fs::read_to_string(&new).unwrap(), "second\n");
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let err = RollingFileWriter::builder("").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
