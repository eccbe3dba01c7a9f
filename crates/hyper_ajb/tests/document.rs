use hyper_ajb::{error::Result, AjbDocument, BinaryValue, HeaderInfo, HeaderVariant, Platform};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use std::io::Cursor;
use tracing_test::traced_test;

#[rustfmt::skip]
const OBJECT_DOCUMENT: [u8; 56] = [
    0x41, 0x4B, 0x4A, 0x42,
    0x00, 0x00, 0x00, 0x01,
    0x00, 0x00, 0x00, 0x06,
    0x00, 0x00, 0x00, 0x02,
    // "a": Int32(1)
    0x00, 0x00, 0x00, 0x01, b'a',
    0x00, 0x00, 0x00, 0x01,
    0x00, 0x00, 0x00, 0x01,
    // "b": Array [Boolean(true), String("x")]
    0x00, 0x00, 0x00, 0x01, b'b',
    0x00, 0x00, 0x00, 0x05,
    0x00, 0x00, 0x00, 0x02,
    0x00, 0x00, 0x00, 0x03, 0x01,
    0x00, 0x00, 0x00, 0x04,
    0x00, 0x00, 0x00, 0x01, b'x',
];

#[traced_test]
#[test]
fn encode_object_from_json() -> Result<()> {
    let root: BinaryValue = serde_json::from_str(r#"{"a": 1, "b": [true, "x"]}"#)?;
    let bytes = AjbDocument::new(root)
        .write(Cursor::new(Vec::new()))?
        .into_inner();

    assert_eq!(bytes, OBJECT_DOCUMENT.to_vec());

    Ok(())
}

#[traced_test]
#[test]
fn decode_object_keeps_key_order() -> Result<()> {
    let document = AjbDocument::read(Cursor::new(OBJECT_DOCUMENT))?;
    let root = document.root.as_object().unwrap();

    assert_eq!(root.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(root["a"], BinaryValue::Int32(1));
    assert_eq!(
        root["b"],
        BinaryValue::Array(vec![BinaryValue::Boolean(true), "x".into()])
    );
    assert_eq!(
        serde_json::to_string(&document.root)?,
        r#"{"a":1,"b":[true,"x"]}"#
    );

    Ok(())
}

fn sample_root() -> BinaryValue {
    let mut nested = IndexMap::new();
    nested.insert("empty".to_owned(), BinaryValue::Null);
    nested.insert("wide".to_owned(), BinaryValue::Int64(1));
    nested.insert("ratio".to_owned(), BinaryValue::Single(-0.25));

    let mut root = IndexMap::new();
    root.insert("name".to_owned(), "stage01".into());
    root.insert(
        "flags".to_owned(),
        BinaryValue::Array(vec![false.into(), BinaryValue::Int32(3)]),
    );
    root.insert("nested".to_owned(), BinaryValue::Object(nested));
    root.insert("list".to_owned(), BinaryValue::Array(vec![]));

    BinaryValue::Object(root)
}

#[test]
fn every_header_layout_survives_a_rewrite() -> Result<()> {
    for variant in [
        HeaderVariant::Default,
        HeaderVariant::SizeAware,
        HeaderVariant::Identified,
    ] {
        for platform in [Platform::Console, Platform::Pc] {
            for endian in [binrw::Endian::Big, binrw::Endian::Little] {
                let document = AjbDocument {
                    platform,
                    endian,
                    header: HeaderInfo {
                        variant,
                        identifier: if variant == HeaderVariant::Identified {
                            0x1234
                        } else {
                            0
                        },
                    },
                    root: sample_root(),
                };

                let bytes = document.write(Cursor::new(Vec::new()))?.into_inner();
                assert_eq!(AjbDocument::read(Cursor::new(bytes))?, document);
            }
        }
    }

    Ok(())
}

#[test]
fn explicit_int64_keeps_its_tag() -> Result<()> {
    let document = AjbDocument::new(BinaryValue::Array(vec![BinaryValue::Int64(5)]));
    let bytes = document.write(Cursor::new(Vec::new()))?.into_inner();

    assert_eq!(&bytes[16..20], &[0x00, 0x00, 0x00, 0x07]);
    assert_eq!(AjbDocument::read(Cursor::new(bytes))?.root, document.root);

    Ok(())
}
