use std::{
    fs,
    io::{self, ErrorKind, Read},
    path::PathBuf,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender};
use log::warn;
use xz2::read::XzDecoder;

use crate::{
    cache::Op,
    memory::{Address, Word},
};

// Record Format: addr u32, data u32, kind u8, 3 pad bytes. Little endian.
pub const RECORD_SIZE: usize = 12;
const KIND_READ: u8 = 0;
const KIND_WRITE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub addr: Address,
    pub op: Op,
}

impl Record {
    fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Option<Record> {
        let addr = Address::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let data = Word::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let op = match bytes[8] {
            KIND_READ => Op::Read,
            KIND_WRITE => Op::Write(data),
            _ => return None,
        };
        Some(Record { addr, op })
    }

    #[cfg(test)]
    pub fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let (kind, data) = match self.op {
            Op::Read => (KIND_READ, 0),
            Op::Write(word) => (KIND_WRITE, word),
        };
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[0..4].copy_from_slice(&self.addr.to_le_bytes());
        bytes[4..8].copy_from_slice(&data.to_le_bytes());
        bytes[8] = kind;
        bytes
    }
}

/// Streams access records from a trace file on a background thread.
///
/// The channel closes once the whole file has been sent or reading failed.
/// Call [`Trace::finish`] afterwards to tell the two apart.
pub struct Trace {
    pub rec: Receiver<Vec<Record>>,
    thread: JoinHandle<io::Result<()>>,
}

impl Trace {
    pub fn read(
        path: PathBuf,
        records_per_block: usize,
        blocks_per_queue: usize,
    ) -> io::Result<Trace> {
        let stream = fs::File::open(&path)?;
        let compressed = path.extension().is_some_and(|ext| ext == "xz");
        let (sender, receiver) = crossbeam::channel::bounded(blocks_per_queue);

        let records_per_block = records_per_block.max(1);
        let t = thread::spawn(move || {
            if compressed {
                Trace::run_thread(XzDecoder::new(stream), records_per_block, sender)
            } else {
                Trace::run_thread(io::BufReader::new(stream), records_per_block, sender)
            }
        });

        Ok(Trace {
            rec: receiver,
            thread: t,
        })
    }

    /// Stops the reader and reports whether it hit an error.
    ///
    /// Records not yet received are dropped, so a reader cut short by the
    /// consumer still finishes cleanly.
    pub fn finish(self) -> io::Result<()> {
        let Trace { rec, thread } = self;
        drop(rec);
        thread.join().unwrap_or_else(|_| {
            Err(io::Error::new(ErrorKind::Other, "trace reader panicked"))
        })
    }

    fn run_thread(
        mut stream: impl Read,
        records_per_block: usize,
        queue: Sender<Vec<Record>>,
    ) -> io::Result<()> {
        let mut bytes = vec![0u8; records_per_block * RECORD_SIZE];
        loop {
            let filled = read_full(&mut stream, &mut bytes)?;
            if filled == 0 {
                return Ok(());
            }
            if filled % RECORD_SIZE != 0 {
                warn!("Trace ends with a partial record, dropping it");
            }

            let buffer = bytes[..filled]
                .chunks_exact(RECORD_SIZE)
                .filter_map(|chunk| {
                    let chunk: &[u8; RECORD_SIZE] = chunk.try_into().ok()?;
                    let record = Record::from_bytes(chunk);
                    if record.is_none() {
                        warn!("Skipping trace record with unknown kind {}", chunk[8]);
                    }
                    record
                })
                .collect::<Vec<_>>();

            // Receiver gone means the consumer is done with us.
            if queue.send(buffer).is_err() {
                return Ok(());
            }
            if filled < bytes.len() {
                return Ok(());
            }
        }
    }
}

/// Fills `buf` unless the stream ends first. Returns the number of bytes read.
fn read_full(stream: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cachesim-{}-{name}", std::process::id()))
    }

    fn sample() -> Vec<Record> {
        (0..10u32)
            .map(|i| Record {
                addr: i * 4,
                op: if i % 2 == 0 { Op::Read } else { Op::Write(i) },
            })
            .collect()
    }

    fn collect(trace: Trace) -> Vec<Record> {
        let records = trace.rec.iter().flatten().collect();
        trace.finish().unwrap();
        records
    }

    #[test]
    fn reads_plain_trace_in_blocks() {
        let path = temp_path("plain.trace");
        let bytes: Vec<u8> = sample().into_iter().flat_map(Record::to_bytes).collect();
        fs::write(&path, bytes).unwrap();

        let trace = Trace::read(path.clone(), 3, 2).unwrap();
        let blocks: Vec<_> = trace.rec.iter().collect();
        assert_eq!(blocks.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 3, 1]);
        assert_eq!(blocks.into_iter().flatten().collect::<Vec<_>>(), sample());
        trace.finish().unwrap();
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn reads_xz_trace() {
        let path = temp_path("packed.trace.xz");
        let mut encoder = xz2::write::XzEncoder::new(fs::File::create(&path).unwrap(), 6);
        for record in sample() {
            encoder.write_all(&record.to_bytes()).unwrap();
        }
        encoder.finish().unwrap();

        assert_eq!(collect(Trace::read(path.clone(), 4, 1).unwrap()), sample());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn drops_partial_and_unknown_records() {
        let path = temp_path("ragged.trace");
        let mut bytes = Vec::new();
        bytes.extend(sample()[0].to_bytes());
        let mut bad = sample()[1].to_bytes();
        bad[8] = 9;
        bytes.extend(bad);
        bytes.extend(sample()[2].to_bytes());
        bytes.extend([1, 2, 3]);
        fs::write(&path, bytes).unwrap();

        assert_eq!(
            collect(Trace::read(path.clone(), 16, 1).unwrap()),
            vec![sample()[0], sample()[2]]
        );
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn corrupt_xz_fails_on_finish() {
        let path = temp_path("corrupt.trace.xz");
        let garbage: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        fs::write(&path, garbage).unwrap();

        let trace = Trace::read(path.clone(), 16, 1).unwrap();
        assert_eq!(trace.rec.iter().flatten().count(), 0);
        assert!(trace.finish().is_err());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn finish_after_stopping_early() {
        let path = temp_path("long.trace");
        let bytes: Vec<u8> = (0..64)
            .flat_map(|_| sample())
            .flat_map(Record::to_bytes)
            .collect();
        fs::write(&path, bytes).unwrap();

        let trace = Trace::read(path.clone(), 2, 1).unwrap();
        assert_eq!(trace.rec.recv().unwrap().len(), 2);
        trace.finish().unwrap();
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Trace::read(temp_path("nope.trace"), 1, 1).is_err());
    }
}
