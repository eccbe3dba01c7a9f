use hyper_io::{error::Result, BinaryReader, BinaryWriter, Endian, NameTable, StringTable};
use pretty_assertions::assert_eq;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

const SIGNATURE: u32 = 0x5445_5354;

// signature, entry count, names length, then (name offset, data offset, size) per entry
fn write_container<W: Write + Seek>(
    writer: W,
    endian: Endian,
    entries: &[(&str, &[u8])],
) -> Result<W> {
    let mut writer = BinaryWriter::new(writer, endian);
    writer.write_u32(SIGNATURE)?;
    writer.write_u32(entries.len() as u32)?;
    writer.reserve_for::<u32>("namesLength")?;

    let mut names = NameTable::new();
    for (index, (name, data)) in entries.iter().enumerate() {
        writer.write_u32(names.push(name) as u32)?;
        writer.reserve_for::<u32>(format!("entry{index}.offset"))?;
        writer.write_u32(data.len() as u32)?;
    }

    writer.patch("namesLength", names.len() as u32)?;
    writer.write_bytes(names.as_bytes())?;

    for (index, (_, data)) in entries.iter().enumerate() {
        writer.align(0x10)?;
        let offset = writer.position()? as u32;
        writer.patch(&format!("entry{index}.offset"), offset)?;
        writer.write_bytes(data)?;
    }

    writer.finish()
}

fn read_container<R: Read + Seek>(reader: R) -> Result<(Endian, Vec<(String, Vec<u8>)>)> {
    let mut reader = BinaryReader::new(reader, Endian::Big);
    reader.detect_endian(SIGNATURE)?;

    let count = reader.read_u32()?;
    let names_length = reader.read_u32()? as u64;

    let mut records = Vec::new();
    for _ in 0..count {
        records.push((reader.read_u32()?, reader.read_u32()?, reader.read_u32()?));
    }

    let names = StringTable::new(reader.position()?, names_length);
    let mut entries = Vec::new();
    for (name_offset, offset, size) in records {
        let name = names.read_at(&mut reader, name_offset as u64)?;
        entries.push((name, reader.read_bytes_at(offset as u64, size as usize)?));
    }

    Ok((reader.endian(), entries))
}

#[test]
fn deferred_offsets_resolve_in_both_byte_orders() -> Result<()> {
    let entries: [(&str, &[u8]); 2] = [("first", b"abc"), ("second", &[0xFF; 20])];

    for endian in [Endian::Big, Endian::Little] {
        let bytes = write_container(Cursor::new(Vec::new()), endian, &entries)?.into_inner();
        let (detected, read) = read_container(Cursor::new(&bytes))?;

        assert_eq!(detected, endian);
        assert_eq!(
            read,
            vec![
                ("first".to_owned(), b"abc".to_vec()),
                ("second".to_owned(), vec![0xFF; 20])
            ]
        );

        // names end at 0x31, payloads start at 0x40 and 0x50
        assert_eq!(bytes.len(), 0x50 + 20);
    }

    Ok(())
}

#[test]
fn unresolved_fields_fail_the_write() {
    let mut writer = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
    writer.reserve_for::<u32>("never").unwrap();

    assert!(matches!(
        writer.finish(),
        Err(hyper_io::error::Error::UnresolvedPatches(names)) if names == vec!["never".to_owned()]
    ));
}

#[test]
fn patching_keeps_the_write_position() -> Result<()> {
    let mut writer = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Big);
    writer.reserve_for::<u32>("size")?;
    writer.write_bytes(b"body")?;

    assert!(writer.patch("size", 4u32)?);
    assert_eq!(writer.position()?, 8);
    assert!(!writer.patch("size", 5u32)?);

    writer.write_u8(0x2E)?;
    assert_eq!(
        writer.finish()?.into_inner(),
        vec![0, 0, 0, 4, b'b', b'o', b'd', b'y', 0x2E]
    );

    Ok(())
}

#[test]
fn seeking_back_does_not_confuse_the_table() -> Result<()> {
    let mut writer = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);
    writer.write_null_bytes(8)?;
    writer.reserve_at("late", 4, 4)?;
    writer.seek(SeekFrom::End(0))?;

    writer.patch("late", 0x0102_0304u32)?;
    assert_eq!(
        writer.finish()?.into_inner(),
        vec![0, 0, 0, 0, 0x04, 0x03, 0x02, 0x01]
    );

    Ok(())
}
