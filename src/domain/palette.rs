use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

/// A palette entry; `command` is slash-command text run when it is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteItem {
    pub label: String,
    pub command: String,
}

impl PaletteItem {
    pub fn new(label: &str, command: &str) -> Self {
        Self {
            label: label.to_string(),
            command: command.to_string(),
        }
    }
}

pub fn playback_palette() -> Vec<PaletteItem> {
    vec![
        PaletteItem::new("Play / pause", "/toggle"),
        PaletteItem::new("Play", "/play"),
        PaletteItem::new("Pause", "/pause"),
        PaletteItem::new("Restart from beginning", "/restart"),
        PaletteItem::new("Skip forward 10 seconds", "/skip 10"),
        PaletteItem::new("Skip back 10 seconds", "/skip -10"),
        PaletteItem::new("Seek to middle", "/seek 50"),
        PaletteItem::new("Toggle mute", "/mute"),
        PaletteItem::new("Volume 50%", "/volume 50%"),
        PaletteItem::new("Volume 100%", "/volume 100%"),
        PaletteItem::new("Speed 0.5x", "/rate 0.5"),
        PaletteItem::new("Speed 1x", "/rate 1"),
        PaletteItem::new("Speed 1.5x", "/rate 1.5"),
        PaletteItem::new("Speed 2x", "/rate 2"),
        PaletteItem::new("Toggle fullscreen", "/fullscreen"),
        PaletteItem::new("Show help", "/help"),
        PaletteItem::new("Quit playdeck", "/quit"),
    ]
}

/// Items matching `query`, best match first; everything when `query` is blank.
pub fn fuzzy_filter(items: &[PaletteItem], query: &str) -> Vec<PaletteItem> {
    if query.trim().is_empty() {
        return items.to_vec();
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);

    let mut scored: Vec<(u32, &PaletteItem)> = items
        .iter()
        .filter_map(|item| {
            let mut buf = Vec::new();
            pattern
                .score(Utf32Str::new(&item.label, &mut buf), &mut matcher)
                .map(|score| (score, item))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.label.cmp(&b.1.label)));
    scored.into_iter().map(|(_, item)| item.clone()).collect()
}
