use std::io::{Cursor, Read, Seek};

use dumpi_trace::handles::{comm, datatype};
use dumpi_trace::{
    ArgValue, CallRecord, CallType, Header, MeshDescriptor, PerfSample, Result, StatusBundle,
    TimeBias, TraceMetadata, TraceReader, TraceWriter, WriteOptions,
};

struct CountingReader<R> {
    inner: R,
    bytes_read: usize,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }

    fn bytes_read(&self) -> usize {
        self.bytes_read
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n;
        Ok(n)
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

fn send(tag: i32) -> CallRecord {
    CallRecord::new(
        CallType::SEND,
        vec![
            ArgValue::Int(1024),
            ArgValue::Handle(datatype::BYTE),
            ArgValue::Int(tag % 16),
            ArgValue::Int(tag),
            ArgValue::Handle(comm::WORLD),
        ],
    )
    .with_thread(0)
    .with_perf(vec![PerfSample {
        entry: tag as u64,
        exit: tag as u64 + 100,
    }])
}

fn big_trace(records: i32) -> Result<Vec<u8>> {
    let mut writer = TraceWriter::new(
        Cursor::new(Vec::new()),
        TimeBias::default(),
        WriteOptions::default(),
    )?;
    for tag in 0..records {
        writer.write_call(&send(tag))?;
    }
    writer.write_call(
        &CallRecord::new(
            CallType::PROBE,
            vec![
                ArgValue::Int(0),
                ArgValue::Int(-1),
                ArgValue::Handle(comm::WORLD),
                ArgValue::Status(Some(StatusBundle::single(64, 0, false, false))),
            ],
        )
        .with_status_detail(),
    )?;
    let (cursor, _) = writer.finish(TraceMetadata {
        header: Header {
            hostname: "node0".to_string(),
            mesh: MeshDescriptor {
                position: vec![0, 1, 2],
                size: vec![4, 4, 4],
            },
            ..Header::default()
        },
        keyvals: vec![("MPI_COMM_WORLD size".to_string(), "64".to_string())],
        perf_labels: Some(vec!["PAPI_TOT_INS".to_string()]),
        ..TraceMetadata::default()
    })?;
    Ok(cursor.into_inner())
}

#[test]
fn header_access_does_not_scan_the_body() -> Result<()> {
    let bytes = big_trace(20_000)?;
    assert!(bytes.len() > 500_000);

    let mut reader = TraceReader::open(CountingReader::new(Cursor::new(bytes)))?;
    let header = reader.header()?;
    assert_eq!(header.hostname, "node0");
    assert_eq!(header.mesh.size, vec![4, 4, 4]);
    assert_eq!(reader.keyvals()?.len(), 1);
    assert_eq!(reader.perf_labels()?.unwrap(), vec!["PAPI_TOT_INS"]);

    let footer = reader.footer()?;
    assert_eq!(footer.calls(CallType::SEND), 20_000);
    assert_eq!(footer.calls(CallType::PROBE), 1);

    let read = reader.into_inner().bytes_read();
    assert!(read < 4096, "random access unexpectedly read {read} bytes");
    Ok(())
}

#[test]
fn stream_can_stop_early_and_restart() -> Result<()> {
    let bytes = big_trace(50)?;
    let mut reader = TraceReader::open(Cursor::new(bytes))?;

    let first_three = reader.calls()?.take(3).collect::<Result<Vec<_>>>()?;
    assert_eq!(first_three, vec![send(0), send(1), send(2)]);

    // Interleave a random-access read, then stream again from the start.
    assert_eq!(reader.header()?.hostname, "node0");
    let all = reader.read_all_calls()?;
    assert_eq!(all.len(), 51);
    assert_eq!(all[0], send(0));
    assert_eq!(all[49], send(49));
    assert_eq!(all[50].call, CallType::PROBE);
    assert_eq!(
        all[50].args[3],
        ArgValue::Status(Some(StatusBundle::single(64, 0, false, false)))
    );
    Ok(())
}

#[test]
fn corrupt_body_surfaces_once_then_ends() -> Result<()> {
    let mut bytes = big_trace(2)?;
    // First record's call code becomes an unregistered value.
    bytes[16] = 0x7f;
    let mut reader = TraceReader::open(Cursor::new(bytes))?;
    let mut calls = reader.calls()?;
    assert!(matches!(
        calls.next(),
        Some(Err(dumpi_trace::TraceError::UnknownCallType(_)))
    ));
    assert!(calls.next().is_none());
    Ok(())
}
