use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

pub mod read {
    use divan::Bencher;
    use hyper_io::{BinaryReader, Endian, StringTable};
    use std::io::{Cursor, SeekFrom};

    fn get_names() -> Vec<u8> {
        (0..4096)
            .flat_map(|i| format!("directory/file_{i:04}.bin\0").into_bytes())
            .collect()
    }

    fn read_words(bencher: Bencher, endian: Endian) {
        bencher
            .with_inputs(|| BinaryReader::new(Cursor::new(vec![0xA5u8; 4096 * 4]), endian))
            .bench_local_refs(|reader| {
                for _ in 0..4096 {
                    divan::black_box(reader.read_u32().unwrap());
                }
            });
    }

    #[divan::bench]
    fn read_u32_big(bencher: Bencher) {
        read_words(bencher, Endian::Big);
    }

    #[divan::bench]
    fn read_u32_little(bencher: Bencher) {
        read_words(bencher, Endian::Little);
    }

    #[divan::bench]
    fn read_names(bencher: Bencher) {
        let names = get_names();
        let table = StringTable::new(0, names.len() as u64);

        bencher
            .with_inputs(|| BinaryReader::new(Cursor::new(names.clone()), Endian::Big))
            .bench_local_refs(|reader| {
                reader.seek(SeekFrom::Start(0)).unwrap();
                for _ in 0..4096 {
                    divan::black_box(table.read_next(reader).unwrap());
                }
            });
    }
}

pub mod write {
    use divan::Bencher;
    use hyper_io::{BinaryWriter, Endian};
    use std::io::Cursor;

    #[divan::bench]
    fn backfill_offsets(bencher: Bencher) {
        bencher
            .with_inputs(|| BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little))
            .bench_local_values(|mut writer| {
                for i in 0..1024 {
                    writer.reserve_for::<u32>(format!("offset_{i}")).unwrap();
                }
                for i in 0..1024u32 {
                    writer.write_bytes(&[0xCC; 16]).unwrap();
                    writer.patch(&format!("offset_{i}"), i * 16).unwrap();
                }
                divan::black_box(writer.finish().unwrap());
            });
    }
}
