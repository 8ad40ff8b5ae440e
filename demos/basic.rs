//! Basic usage example for mtbl
//!
//! This example demonstrates the fundamental operations:
//! - Writing a table of two-letter keys
//! - Iterating, exact, prefix and range lookups
//! - Reading table metadata
//! - Sorting unordered input into a table

use anyhow::Context;
use mtbl::{CompressionType, MergePolicy, Reader, Sorter, SorterOptions, Writer, WriterOptions};

fn show(tag: &str, entry: mtbl::Result<mtbl::Entry>) -> anyhow::Result<()> {
    let (key, value) = entry?;
    println!(
        "[{}, {:?}, {:?}]",
        tag,
        String::from_utf8_lossy(&key),
        String::from_utf8_lossy(&value)
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let dir = tempfile::tempdir()?;
    let table = dir.path().join("test1.mtbl");

    // Every key "aa".."zz", valued by its rank
    let options = WriterOptions::default().compression(CompressionType::Zlib);
    let mut writer = Writer::create(&table, options)?;
    let mut rank = 0;
    for a in b'a'..=b'z' {
        for b in b'a'..=b'z' {
            rank += 1;
            writer.add([a, b], rank.to_string())?;
        }
    }
    writer.close()?;

    let reader = Reader::open(&table).with_context(|| format!("opening {:?}", table))?;
    for entry in reader.iter().take(10) {
        show("iterator", entry)?;
    }
    println!("{}", "-".repeat(80));

    if let Some(entry) = reader.get(b"az").next() {
        show("get", entry)?;
    }
    if let Some(entry) = reader.get_prefix(b"c").next() {
        show("get_prefix", entry)?;
    }
    for entry in reader.get_range(b"ca", b"cz") {
        show("get_range", entry)?;
    }
    println!("{}", "-".repeat(80));

    let meta = mtbl::metadata(&table)?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    println!("compactness: {:.2}%", meta.compactness());
    println!("{}", "-".repeat(80));

    // A small table for each compression scheme
    for compression in CompressionType::ALL {
        let path = dir.path().join(format!("hello.{}", compression));
        let mut writer = Writer::create(&path, WriterOptions::default().compression(compression))?;
        writer.add(b"Hello", b"Goodbye")?;
        writer.close()?;
        println!("[compression, {}, {}]", compression, mtbl::metadata(&path)?.compression);
    }
    println!("{}", "-".repeat(80));

    // Duplicate keys keep the newest value
    let mut sorter = Sorter::new(SorterOptions::new().merge_policy(MergePolicy::LastWriteWins))?;
    for (key, value) in [
        ("bbb", "2"),
        ("aaa", "1"),
        ("ccc", "3"),
        ("bbb", "22"),
        ("aaa", "11"),
        ("ccc", "33"),
        ("bbb", "222"),
        ("aaa", "111"),
        ("ccc", "333"),
    ] {
        sorter.add(key, value)?;
    }

    let sorted = dir.path().join("sorted.mtbl");
    let mut writer = Writer::create(&sorted, WriterOptions::default())?;
    sorter.write(&mut writer)?;
    sorter.close()?;
    writer.close()?;

    for entry in Reader::open(&sorted)?.iter() {
        show("sorted", entry)?;
    }

    Ok(())
}
