use playdeck::domain::palette::{fuzzy_filter, playback_palette, PaletteItem};

#[test]
fn fuzzy_filter_ranks_matches() {
    let items = vec![
        PaletteItem::new("Toggle fullscreen", "/fullscreen"),
        PaletteItem::new("Toggle mute", "/mute"),
        PaletteItem::new("Quit playdeck", "/quit"),
    ];

    let result = fuzzy_filter(&items, "mute");
    assert!(!result.is_empty());
    assert_eq!(result[0].command, "/mute");
}

#[test]
fn blank_query_keeps_every_item_in_order() {
    let items = playback_palette();
    assert_eq!(fuzzy_filter(&items, "  "), items);
}

#[test]
fn unmatched_query_yields_nothing() {
    assert!(fuzzy_filter(&playback_palette(), "zzqx").is_empty());
}
