use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dumpi_trace::{CallType, TraceReader, TrailerLayout};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "dumpi-inspect",
    about = "Summarize the sections of one binary call-trace file."
)]
struct Args {
    /// Trace file to inspect
    file: PathBuf,

    /// Also stream the call records and count them per call
    #[arg(long, action = clap::ArgAction::SetTrue)]
    calls: bool,

    /// Print the summary as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    layout: &'static str,
    offsets: Offsets,
    header: HeaderSummary,
    /// Non-zero footer counters keyed by call label.
    recorded: BTreeMap<String, u32>,
    skipped: BTreeMap<String, u32>,
    keyvals: Vec<(String, String)>,
    perf_labels: Option<Vec<String>>,
    function_names: Option<Vec<(String, String)>>,
    /// Only present with `--calls`.
    streamed: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, Serialize)]
struct Offsets {
    header: u64,
    body: u64,
    footer: u64,
    keyval: u64,
    perf_labels: Option<u64>,
    function_names: Option<u64>,
}

#[derive(Debug, Serialize)]
struct HeaderSummary {
    version: String,
    start_time: u64,
    hostname: String,
    username: String,
    mesh_position: Vec<i32>,
    mesh_size: Vec<i32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let summary = inspect(&args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_text(&summary);
    }
    Ok(())
}

fn call_label(code: usize) -> String {
    match u16::try_from(code) {
        Ok(code) => CallType(code)
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("call#{code}")),
        Err(_) => format!("call#{code}"),
    }
}

fn nonzero_counts(counts: &[u32]) -> BTreeMap<String, u32> {
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n != 0)
        .map(|(code, &n)| (call_label(code), n))
        .collect()
}

fn inspect(args: &Args) -> anyhow::Result<Summary> {
    let file = File::open(&args.file).with_context(|| format!("open {}", args.file.display()))?;
    let mut reader = TraceReader::open(BufReader::new(file))
        .with_context(|| format!("read trace index of {}", args.file.display()))?;
    let index = *reader.index();
    tracing::debug!(?index, "opened trace");

    let header = reader.header().context("decode header")?;
    let footer = reader.footer().context("decode footer")?;
    let keyvals = reader.keyvals().context("decode keyval table")?;
    let perf_labels = reader.perf_labels().context("decode perfcounter labels")?;
    let function_names = reader
        .function_names()
        .context("decode function names")?
        .map(|names| {
            names
                .into_iter()
                .map(|entry| (format!("{:#x}", entry.address), entry.name))
                .collect()
        });

    let streamed = if args.calls {
        let mut counts = BTreeMap::new();
        for record in reader.calls().context("seek to call stream")? {
            let record = record.context("decode call record")?;
            *counts.entry(call_label(usize::from(record.call.0))).or_insert(0u64) += 1;
        }
        Some(counts)
    } else {
        None
    };

    Ok(Summary {
        layout: match index.layout {
            TrailerLayout::FiveWord => "five-word",
            TrailerLayout::SixWord => "six-word",
            TrailerLayout::SevenWord => "seven-word",
        },
        offsets: Offsets {
            header: index.header,
            body: index.body,
            footer: index.footer,
            keyval: index.keyval,
            perf_labels: index.perf_labels,
            function_names: index.function_names,
        },
        header: HeaderSummary {
            version: format!(
                "{}.{}.{}",
                header.version[0], header.version[1], header.version[2]
            ),
            start_time: header.start_time,
            hostname: header.hostname,
            username: header.username,
            mesh_position: header.mesh.position,
            mesh_size: header.mesh.size,
        },
        recorded: nonzero_counts(&footer.call_counts),
        skipped: nonzero_counts(&footer.skip_counts),
        keyvals,
        perf_labels,
        function_names,
        streamed,
    })
}

fn print_text(summary: &Summary) {
    let o = &summary.offsets;
    println!("layout: {}", summary.layout);
    println!(
        "offsets: header={} body={} footer={} keyval={}",
        o.header, o.body, o.footer, o.keyval
    );
    if let Some(offset) = o.perf_labels {
        println!("offsets: perf_labels={offset}");
    }
    if let Some(offset) = o.function_names {
        println!("offsets: function_names={offset}");
    }

    let h = &summary.header;
    println!("version: {}", h.version);
    println!("start time: {}", h.start_time);
    println!("host: {}", h.hostname);
    println!("user: {}", h.username);
    if h.mesh_position.is_empty() {
        println!("mesh: unavailable");
    } else {
        println!("mesh: position={:?} size={:?}", h.mesh_position, h.mesh_size);
    }

    for (label, n) in &summary.recorded {
        println!("recorded {label}: {n}");
    }
    for (label, n) in &summary.skipped {
        println!("skipped {label}: {n}");
    }
    for (key, value) in &summary.keyvals {
        println!("keyval {key}={value}");
    }
    if let Some(labels) = &summary.perf_labels {
        println!("perf labels: {}", labels.join(", "));
    }
    if let Some(names) = &summary.function_names {
        for (address, name) in names {
            println!("function {address} {name}");
        }
    }
    if let Some(streamed) = &summary.streamed {
        let total: u64 = streamed.values().sum();
        println!("streamed records: {total}");
        for (label, n) in streamed {
            println!("streamed {label}: {n}");
        }
    }
}
