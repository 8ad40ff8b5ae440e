// Table Integration Tests for mtbl
// Write tables through the public API and read them back

use mtbl::{create_writer, open_reader, CompressionType, Error, Reader, WriterOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Every two-letter key "aa".."zz", valued by its 1-based rank
fn two_letter_entries() -> Vec<(String, String)> {
    let mut entries = Vec::with_capacity(676);
    for a in b'a'..=b'z' {
        for b in b'a'..=b'z' {
            let key = String::from_utf8(vec![a, b]).unwrap();
            entries.push((key, (entries.len() + 1).to_string()));
        }
    }
    entries
}

fn write_two_letter_table(dir: &TempDir, options: WriterOptions) -> PathBuf {
    let path = dir.path().join("test1.mtbl");
    let mut writer = create_writer(&path, options).unwrap();
    for (key, value) in two_letter_entries() {
        writer.add(key, value).unwrap();
    }
    writer.close().unwrap();
    path
}

fn collect_strings(iter: mtbl::TableIterator) -> Vec<(String, String)> {
    iter.map(|e| {
        let (k, v) = e.unwrap();
        (String::from_utf8(k).unwrap(), String::from_utf8(v).unwrap())
    })
    .collect()
}

fn pair(k: &str, v: &str) -> (String, String) {
    (k.to_string(), v.to_string())
}

/// Test the full scan of the two-letter table
#[test]
fn test_two_letter_iterator() {
    let dir = TempDir::new().unwrap();
    let path = write_two_letter_table(&dir, WriterOptions::default());
    let reader = open_reader(&path).unwrap();

    let all = collect_strings(reader.iter());
    assert_eq!(all.len(), 676);
    assert_eq!(all[0], pair("aa", "1"));
    assert_eq!(all[675], pair("zz", "676"));
    assert_eq!(all, two_letter_entries());
}

/// Test exact lookups on the two-letter table
#[test]
fn test_two_letter_get() {
    let dir = TempDir::new().unwrap();
    let path = write_two_letter_table(&dir, WriterOptions::default());
    let reader = open_reader(&path).unwrap();

    assert_eq!(collect_strings(reader.get(b"aj")), vec![pair("aj", "10")]);
    assert_eq!(collect_strings(reader.get(b"zx")), vec![pair("zx", "674")]);
    assert!(collect_strings(reader.get(b"a")).is_empty());
    assert!(collect_strings(reader.get(b"zzz")).is_empty());
    assert_eq!(reader.get_value(b"az").unwrap(), Some(b"26".to_vec()));
}

/// Test prefix lookups on the two-letter table
#[test]
fn test_two_letter_get_prefix() {
    let dir = TempDir::new().unwrap();
    let path = write_two_letter_table(&dir, WriterOptions::default());
    let reader = open_reader(&path).unwrap();

    assert_eq!(reader.get_prefix(b"a").count(), 26);
    assert_eq!(reader.get_prefix(b"z").count(), 26);
    assert_eq!(collect_strings(reader.get_prefix(b"jj")), vec![pair("jj", "244")]);
    assert_eq!(reader.get_prefix(b"").count(), 676);
    assert_eq!(reader.get_prefix(b"q!").count(), 0);
}

/// Test inclusive range lookups on the two-letter table
#[test]
fn test_two_letter_get_range() {
    let dir = TempDir::new().unwrap();
    let path = write_two_letter_table(&dir, WriterOptions::default());
    let reader = open_reader(&path).unwrap();

    assert_eq!(reader.get_range(b"ab", b"az").count(), 25);

    let range = collect_strings(reader.get_range(b"ca", b"jp"));
    assert_eq!(range.len(), 198);
    assert_eq!(range.first(), Some(&pair("ca", "53")));
    assert_eq!(range.last(), Some(&pair("jp", "250")));

    // Empty when the bounds are reversed
    assert_eq!(reader.get_range(b"jp", b"ca").count(), 0);
}

/// Test the two-letter scenario with small blocks and every codec
#[test]
fn test_two_letter_all_compressions() {
    for compression in CompressionType::ALL {
        let dir = TempDir::new().unwrap();
        let options =
            WriterOptions::default().compression(compression).block_size(128).block_restart_interval(4);
        let path = write_two_letter_table(&dir, options);
        let reader = Reader::open(&path).unwrap();

        assert!(reader.num_blocks() > 1, "{} should span several blocks", compression);
        assert_eq!(collect_strings(reader.iter()), two_letter_entries(), "{}", compression);
        assert_eq!(collect_strings(reader.get(b"zx")), vec![pair("zx", "674")]);
        assert_eq!(reader.get_range(b"ca", b"jp").count(), 198);

        let meta = mtbl::metadata(&path).unwrap();
        assert_eq!(meta.compression, compression.name());
    }
}

/// Test a single-entry table, one per compression scheme
#[test]
fn test_hello_goodbye_round_trip() {
    let dir = TempDir::new().unwrap();
    for compression in CompressionType::ALL {
        let path = dir.path().join(format!("hello.{}", compression));
        let mut writer = create_writer(&path, WriterOptions::default().compression(compression)).unwrap();
        writer.add(b"Hello", b"Goodbye").unwrap();
        writer.close().unwrap();
        assert!(matches!(writer.close(), Err(Error::AlreadyClosed(_))));

        let reader = open_reader(&path).unwrap();
        assert_eq!(collect_strings(reader.iter()), vec![pair("Hello", "Goodbye")]);
    }
}

/// Test that writer construction rejects bad arguments
#[test]
fn test_writer_arguments() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("args.mtbl");

    assert!(matches!(
        create_writer(&path, WriterOptions::default().block_size(0)),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(create_writer(Path::new(""), WriterOptions::default()), Err(Error::InvalidArgument(_))));
    assert!("invalid".parse::<CompressionType>().is_err());

    create_writer(&path, WriterOptions::default()).unwrap().close().unwrap();
    assert!(matches!(create_writer(&path, WriterOptions::default()), Err(Error::InvalidArgument(_))));
}

/// Test that the writer only accepts strictly increasing keys
#[test]
fn test_writer_key_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("order.mtbl");
    let mut writer = create_writer(&path, WriterOptions::default()).unwrap();

    writer.add(b"1000", b"test1").unwrap();
    writer.add(b"1005", b"test2").unwrap();
    writer.add(b"1010", b"test3").unwrap();
    assert!(matches!(writer.add(b"1001", b"test1"), Err(Error::OutOfOrderKey(_))));
    assert!(matches!(writer.add(b"1009", b"test1"), Err(Error::OutOfOrderKey(_))));
    writer.close().unwrap();

    let reader = open_reader(&path).unwrap();
    assert_eq!(reader.iter().count(), 3);
}

/// Test reader errors for missing and invalid files
#[test]
fn test_reader_open_errors() {
    assert!(matches!(open_reader("missing.mtbl"), Err(Error::NotFound(_))));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.mtbl");
    std::fs::write(&path, b"this is definitely not a table").unwrap();
    assert!(open_reader(&path).unwrap_err().is_format());
}

/// Test that several readers can share one file
#[test]
fn test_independent_readers() {
    let dir = TempDir::new().unwrap();
    let path = write_two_letter_table(&dir, WriterOptions::default().block_size(256));

    let r1 = open_reader(&path).unwrap();
    let r2 = open_reader(&path).unwrap();
    let mut it1 = r1.iter();
    let mut it2 = r2.get_prefix(b"m");

    assert_eq!(it1.next().unwrap().unwrap().0, b"aa");
    assert_eq!(it2.next().unwrap().unwrap().0, b"ma");
    assert_eq!(it1.next().unwrap().unwrap().0, b"ab");
    assert_eq!(it2.count(), 25);
}
