use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::data::GameRecord;

/// Line-oriented output for finished episodes, shared by every worker
///
/// Each record is written and flushed under one lock so lines from
/// concurrent workers never interleave.
pub struct RecordSink {
    writer: Mutex<Box<dyn Write + Send>>,
    records_written: AtomicUsize,
}

impl RecordSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            records_written: AtomicUsize::new(0),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn write_record(&self, record: &GameRecord) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{record}")?;
        writer.flush()?;
        self.records_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use zeroplay_core::{Action, Player};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record(id: usize) -> GameRecord {
        let mut record = GameRecord::new("tictactoe");
        record.add_ply(Action::new(id, Player::One), String::new());
        record
    }

    #[test]
    fn test_one_line_per_record() {
        let buffer = SharedBuffer::default();
        let sink = RecordSink::new(buffer.clone());

        sink.write_record(&record(4)).unwrap();
        sink.write_record(&record(0)).unwrap();

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            output,
            "(GM[tictactoe]RE[0]B[4|])\n(GM[tictactoe]RE[0]B[0|])\n"
        );
        assert_eq!(sink.records_written(), 2);
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let buffer = SharedBuffer::default();
        let sink = Arc::new(RecordSink::new(buffer.clone()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for _ in 0..25 {
                        sink.write_record(&record(i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 100);
        assert!(lines
            .iter()
            .all(|l| GameRecord::parse(l).map(|r| r.len() == 1).unwrap_or(false)));
        assert_eq!(sink.records_written(), 100);
    }
}
