// Property Tests for mtbl
// Tables and the sorter checked against a BTreeMap model

use mtbl::{CompressionType, Reader, Sorter, SorterOptions, Writer, WriterOptions};
use proptest::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

type Model = BTreeMap<Vec<u8>, Vec<u8>>;

fn small_key() -> impl Strategy<Value = Vec<u8>> {
    // A narrow alphabet so prefixes and ranges actually match something
    proptest::collection::vec(prop::sample::select(vec![b'a', b'b', b'c', 0u8, 0xff]), 0..6)
}

fn model_strategy() -> impl Strategy<Value = Model> {
    proptest::collection::btree_map(small_key(), proptest::collection::vec(any::<u8>(), 0..40), 0..200)
}

fn compression_strategy() -> impl Strategy<Value = CompressionType> {
    prop::sample::select(CompressionType::ALL.to_vec())
}

fn write_model(dir: &TempDir, model: &Model, options: WriterOptions) -> Reader {
    let path = dir.path().join("prop.mtbl");
    let mut writer = Writer::create(&path, options).unwrap();
    for (k, v) in model {
        writer.add(k, v).unwrap();
    }
    writer.close().unwrap();
    Reader::open(&path).unwrap()
}

fn collect(iter: mtbl::TableIterator) -> Vec<(Vec<u8>, Vec<u8>)> {
    iter.map(|e| e.unwrap()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip(
        model in model_strategy(),
        compression in compression_strategy(),
        block_size in 16usize..512,
        interval in 1usize..8,
    ) {
        let dir = TempDir::new().unwrap();
        let options = WriterOptions::default()
            .compression(compression)
            .block_size(block_size)
            .block_restart_interval(interval);
        let reader = write_model(&dir, &model, options);

        let expected: Vec<_> = model.clone().into_iter().collect();
        prop_assert_eq!(collect(reader.iter()), expected);
        prop_assert_eq!(reader.footer().count_entries, model.len() as u64);
    }

    #[test]
    fn prop_get_matches_model(model in model_strategy(), probe in small_key()) {
        let dir = TempDir::new().unwrap();
        let reader = write_model(&dir, &model, WriterOptions::default().block_size(64));

        let expected: Vec<_> = model.get(&probe).map(|v| (probe.clone(), v.clone())).into_iter().collect();
        prop_assert_eq!(collect(reader.get(&probe)), expected);
    }

    #[test]
    fn prop_prefix_matches_model(model in model_strategy(), prefix in small_key()) {
        let dir = TempDir::new().unwrap();
        let reader = write_model(&dir, &model, WriterOptions::default().block_size(64));

        let expected: Vec<_> = model
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        prop_assert_eq!(collect(reader.get_prefix(&prefix)), expected);
    }

    #[test]
    fn prop_range_matches_model(model in model_strategy(), low in small_key(), high in small_key()) {
        let dir = TempDir::new().unwrap();
        let reader = write_model(&dir, &model, WriterOptions::default().block_size(64));

        let expected: Vec<_> = model
            .iter()
            .filter(|(k, _)| low.as_slice() <= k.as_slice() && k.as_slice() <= high.as_slice())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        prop_assert_eq!(collect(reader.get_range(&low, &high)), expected);
    }

    #[test]
    fn prop_sorter_matches_model(
        input in proptest::collection::vec((small_key(), proptest::collection::vec(any::<u8>(), 0..16)), 0..300),
        max_memory in 64usize..4096,
    ) {
        let dir = TempDir::new().unwrap();
        let mut sorter = Sorter::new(SorterOptions::new().max_memory(max_memory)).unwrap();
        let mut model = Model::new();
        for (k, v) in input {
            model.insert(k.clone(), v.clone());
            sorter.add(k, v).unwrap();
        }

        let path = dir.path().join("sorted.mtbl");
        let mut writer = Writer::create(&path, WriterOptions::default()).unwrap();
        prop_assert_eq!(sorter.write(&mut writer).unwrap(), model.len() as u64);
        sorter.close().unwrap();
        writer.close().unwrap();

        let reader = Reader::open(&path).unwrap();
        prop_assert_eq!(collect(reader.iter()), model.into_iter().collect::<Vec<_>>());
    }
}
