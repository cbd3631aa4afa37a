//! Integration tests for saved colors, built-ins and the color picker.

mod common;

use colorfilter::{process_frame, PresetStore, SaveOutcome, Settings};
use common::*;

#[test]
fn test_picked_color_finds_its_object_in_every_space() {
    let color = [200, 40, 40];
    let raw = frame_with_square(80, [20, 90, 200], 20, 20, 30, color);

    for space in ColorSpace::ALL {
        let range = ChannelRange::around(color, space);
        let output = process_frame(&raw, &exact_params(space, range, 100.0));
        assert_eq!(output.count, 1, "picked range in {} missed the square", space);
        assert_eq!(output.detections[0].bbox.width, 30);
    }
}

#[test]
fn test_builtins_detect_their_own_swatch() {
    // Black, Gray and White swatches are lifted to S,V >= 100 so they are
    // no longer inside their own range
    let chromatic = [
        BuiltinColor::Red,
        BuiltinColor::Green,
        BuiltinColor::Blue,
        BuiltinColor::Yellow,
        BuiltinColor::Cyan,
        BuiltinColor::Purple,
        BuiltinColor::Pink,
    ];
    for color in chromatic {
        let preset = color.preset();
        let raw = frame_with_square(60, BLACK, 10, 10, 30, preset.swatch_rgb());
        let output = process_frame(&raw, &exact_params(ColorSpace::Hsv, preset.range, 100.0));
        assert_eq!(output.count, 1, "{} swatch {} not detected", color, preset.swatch_hex());
    }
}

#[test]
fn test_store_keeps_names_unique() {
    let mut store = PresetStore::new();
    let range = ChannelRange::new([0; 3], [10; 3]);

    assert_eq!(store.save(ColorPreset::new("a", ColorSpace::Hsv, range)), SaveOutcome::Inserted);
    assert_eq!(store.save(ColorPreset::new("", ColorSpace::Lab, range)), SaveOutcome::Inserted);
    assert_eq!(store.save(ColorPreset::new(" a ", ColorSpace::Rgb, range)), SaveOutcome::Replaced);

    let names: Vec<&str> = store.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Color 2", "a"]);
    assert_eq!(store.matching(ColorSpace::Rgb).count(), 1);
    assert_eq!(store.matching(ColorSpace::Hsv).count(), 0);

    store.clear();
    assert!(store.is_empty());
}

#[test]
fn test_store_round_trips_through_json() -> anyhow::Result<()> {
    let mut settings = Settings::default();
    settings.set_multi(true);
    settings.apply_builtin(BuiltinColor::Red);
    settings.save_current("red");

    let json = serde_json::to_string(&settings.presets)?;
    let restored: PresetStore = serde_json::from_str(&json)?;
    assert_eq!(restored, settings.presets);
    assert_eq!(restored.len(), 2);
    Ok(())
}
