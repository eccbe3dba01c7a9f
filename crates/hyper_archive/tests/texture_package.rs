use hyper_archive::{error::Result, Texture, TexturePackage};
use pretty_assertions::assert_eq;
use std::{fs, io::Cursor, path::PathBuf};
use tracing_test::traced_test;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hyper_archive-tp-{}-{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn sample_package() -> TexturePackage {
    TexturePackage {
        textures: (0..12u8)
            .map(|i| Texture::new(vec![0x89, b'P', b'N', b'G', i], [i; 9]))
            .collect(),
    }
}

#[traced_test]
#[test]
fn textures_survive_extraction() -> Result<()> {
    let dir = scratch_dir("extract");
    let package = sample_package();

    let report = package.export(&dir)?;
    assert!(report.is_complete());
    assert_eq!(report.written.len(), 24);
    assert_eq!(fs::read(dir.join("11.png"))?, vec![0x89, b'P', b'N', b'G', 11]);
    assert!(fs::read_to_string(dir.join("3.json"))?
        .contains(r#""Attributes": "03 03 03 03 03 03 03 03 03""#));

    // 10.png sorts after 9.png
    let imported = TexturePackage::import(&dir)?;
    assert_eq!(imported, package);

    let bytes = imported.write(Cursor::new(Vec::new()))?.into_inner();
    assert_eq!(TexturePackage::read(Cursor::new(bytes))?, package);

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn missing_attributes_default_to_zero() -> Result<()> {
    let dir = scratch_dir("bare");
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("0.png"), b"first")?;
    fs::write(dir.join("1.PNG"), b"second")?;
    fs::write(dir.join("1.json"), r#"{"Attributes": "FF 00 00 00 00 00 00 00 01"}"#)?;
    fs::write(dir.join("notes.txt"), b"ignored")?;

    let package = TexturePackage::import(&dir)?;
    assert_eq!(
        package.textures,
        vec![
            Texture::new(b"first".to_vec(), [0; 9]),
            Texture::new(b"second".to_vec(), [0xFF, 0, 0, 0, 0, 0, 0, 0, 1]),
        ]
    );

    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn malformed_sidecar_fails_the_import() -> Result<()> {
    let dir = scratch_dir("malformed");
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("0.png"), b"image")?;
    fs::write(dir.join("0.json"), r#"{"Attributes": "01"}"#)?;

    assert!(matches!(
        TexturePackage::import(&dir),
        Err(hyper_archive::error::Error::JsonError(_))
    ));

    fs::remove_dir_all(dir)?;
    Ok(())
}
