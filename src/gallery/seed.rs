use crate::gallery::types::GalleryItem;

struct Sample {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    lyrics: &'static str,
    tags: [&'static str; 4],
    slug: &'static str,
    duration_seconds: u64,
    created_at: &'static str,
    created_by: &'static str,
    featured: bool,
}

const SAMPLE_BASE: &str = "https://music.abada.kr/samples";

const SAMPLES: [Sample; 5] = [
    Sample {
        id: "sample-001",
        title: "Morning Light",
        description: "A cheerful pop song about new beginnings",
        lyrics: "[Verse]\nThe morning light comes through the window\nA brand new day is here\n\n[Chorus]\nWe rise again, we start again\nEvery day is a new begin",
        tags: ["pop", "happy", "morning", "piano"],
        slug: "morning-light",
        duration_seconds: 120,
        created_at: "2026-01-15T10:00:00Z",
        created_by: "ABADA Team",
        featured: true,
    },
    Sample {
        id: "sample-002",
        title: "Midnight Dream",
        description: "Ambient relaxing music for late night vibes",
        lyrics: "[Verse]\nWhen the night falls silent\nStars begin to shine\n\n[Bridge]\nDreams are calling me\nInto the peaceful night",
        tags: ["ambient", "relaxing", "night", "dreamy"],
        slug: "midnight-dream",
        duration_seconds: 180,
        created_at: "2026-01-16T22:00:00Z",
        created_by: "ABADA Team",
        featured: true,
    },
    Sample {
        id: "sample-003",
        title: "City Lights",
        description: "Electronic dance track with urban vibes",
        lyrics: "[Verse]\nNeon signs light up the street\nBass drops, feel the beat\n\n[Chorus]\nCity lights, city nights\nWe dance until the morning light",
        tags: ["electronic", "dance", "edm", "urban"],
        slug: "city-lights",
        duration_seconds: 150,
        created_at: "2026-01-17T18:00:00Z",
        created_by: "Community",
        featured: false,
    },
    Sample {
        id: "sample-004",
        title: "Acoustic Serenade",
        description: "Gentle acoustic guitar piece",
        lyrics: "[Verse]\nSoft strings whisper tales\nOf love beneath the moon\n\n[Chorus]\nPlay for me tonight\nLet the melody take flight",
        tags: ["acoustic", "guitar", "romantic", "soft"],
        slug: "acoustic-serenade",
        duration_seconds: 200,
        created_at: "2026-01-18T14:00:00Z",
        created_by: "Community",
        featured: false,
    },
    Sample {
        id: "sample-005",
        title: "Jazz Cafe",
        description: "Smooth jazz for coffee time",
        lyrics: "[Instrumental]\nSmooth saxophone melody\nPiano accompaniment\nDouble bass groove",
        tags: ["jazz", "instrumental", "cafe", "smooth"],
        slug: "jazz-cafe",
        duration_seconds: 240,
        created_at: "2026-01-18T20:00:00Z",
        created_by: "ABADA Team",
        featured: true,
    },
];

/// Built-in tracks loaded into an empty gallery at startup.
pub fn samples() -> Vec<GalleryItem> {
    SAMPLES
        .iter()
        .map(|s| GalleryItem {
            id: s.id.to_string(),
            title: s.title.to_string(),
            description: s.description.to_string(),
            lyrics: s.lyrics.to_string(),
            tags: s.tags.iter().map(|t| t.to_string()).collect(),
            audio_url: format!("{SAMPLE_BASE}/{}.mp3", s.slug),
            thumbnail_url: format!("{SAMPLE_BASE}/{}-thumb.jpg", s.slug),
            duration_seconds: s.duration_seconds,
            created_at: s.created_at.to_string(),
            created_by: s.created_by.to_string(),
            featured: s.featured,
            plays: 0,
        })
        .collect()
}
