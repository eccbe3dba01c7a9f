use hyper_ajb::{error::Result, BinaryValue, Platform, TimedEvent, TimedEvents};
use pretty_assertions::assert_eq;
use std::{fs, io::Cursor};

fn sample_events() -> TimedEvents {
    TimedEvents {
        platform: Platform::Console,
        events: vec![
            TimedEvent {
                name: "spawn".to_owned(),
                user_data1: 0.5,
                user_data2: 0,
                root: BinaryValue::Null,
            },
            TimedEvent {
                name: "explode".to_owned(),
                user_data1: 12.25,
                user_data2: 0xFFFF_FFFF,
                root: serde_json::from_str(r#"{"radius": 3.5, "targets": ["a", "b"]}"#).unwrap(),
            },
        ],
    }
}

#[test]
fn events_survive_a_rewrite() -> Result<()> {
    let events = sample_events();
    let bytes = events.write(Cursor::new(Vec::new()))?.into_inner();

    assert_eq!(&bytes[..4], &[0x00, 0x00, 0x00, 0x02]);
    assert_eq!(TimedEvents::read(Cursor::new(bytes))?, events);

    Ok(())
}

#[test]
fn empty_event_list() -> Result<()> {
    let events = TimedEvents::read(Cursor::new([0u8; 4]))?;
    assert!(events.events.is_empty());
    assert_eq!(events.platform, Platform::Console);

    Ok(())
}

#[test]
fn events_survive_json() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("hyper_ajb-events-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    let path = dir.join("events.json");

    let events = sample_events();
    events.export(&path)?;
    assert_eq!(TimedEvents::import(&path, Platform::Console)?, events);

    fs::remove_dir_all(dir)?;
    Ok(())
}
