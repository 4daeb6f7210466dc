// Articles statiques par niveau géographique (pas de source réelle)

use chrono::{DateTime, Duration, TimeZone, Utc};
use switchat_core::{LocationTier, NewsArticle};

struct Story {
    title: &'static str,
    summary: &'static str,
    source: &'static str,
    image: Option<&'static str>,
}

const LOCAL: &[Story] = &[
    Story { title: "Riverside market reopens after renovation", summary: "Forty stalls return with extended weekend hours.", source: "City Desk", image: Some("market.jpg") },
    Story { title: "New bike lanes open on Main Street", summary: "The council expects the route to cut commute times downtown.", source: "City Desk", image: None },
    Story { title: "Library launches evening coding club", summary: "Free sessions for teens start next Tuesday.", source: "Neighbourhood News", image: Some("library.jpg") },
];

const REGIONAL: &[Story] = &[
    Story { title: "Regional rail adds late-night service", summary: "Trains will run hourly until 2 a.m. on weekends.", source: "Regional Wire", image: Some("rail.jpg") },
    Story { title: "Wildfire season outlook improves", summary: "A wet spring lowers the fire risk across the valley.", source: "Regional Wire", image: None },
    Story { title: "Startups flock to the coastal tech corridor", summary: "Office vacancy drops for the third straight quarter.", source: "Business Regional", image: Some("corridor.jpg") },
];

const NATIONAL: &[Story] = &[
    Story { title: "Parliament passes digital privacy bill", summary: "New rules limit how apps may share location data.", source: "National Herald", image: Some("parliament.jpg") },
    Story { title: "Central bank holds rates steady", summary: "Policy makers cite cooling inflation.", source: "Financial Daily", image: None },
    Story { title: "National team qualifies for the finals", summary: "A late goal secures the spot after a tense match.", source: "Sports Nation", image: Some("stadium.jpg") },
];

const GLOBAL: &[Story] = &[
    Story { title: "Climate summit agrees on methane targets", summary: "Over 100 countries sign on to new reductions.", source: "World Report", image: Some("summit.jpg") },
    Story { title: "Space telescope captures distant galaxy cluster", summary: "The image reveals light from 13 billion years ago.", source: "Science World", image: Some("galaxy.jpg") },
    Story { title: "Global shipping costs ease", summary: "Container rates fall to pre-pandemic levels.", source: "Trade Monitor", image: None },
    Story { title: "Open-source AI models gain ground", summary: "Researchers report rapid adoption across industries.", source: "Tech Globe", image: Some("ai.jpg") },
];

fn stories(tier: LocationTier) -> &'static [Story] {
    match tier {
        LocationTier::Local => LOCAL,
        LocationTier::Regional => REGIONAL,
        LocationTier::National => NATIONAL,
        LocationTier::Global => GLOBAL,
    }
}

fn edition_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Fixed article list for a tier. Same input, same output.
pub fn articles_for(tier: LocationTier) -> Vec<NewsArticle> {
    let edition = edition_time();
    stories(tier)
        .iter()
        .enumerate()
        .map(|(i, story)| {
            let id = format!("{}-{}", tier.as_str(), i + 1);
            NewsArticle {
                url: format!("https://news.switchat.app/{id}"),
                image_url: story
                    .image
                    .map(|img| format!("https://news.switchat.app/img/{img}")),
                id,
                title: story.title.to_string(),
                summary: story.summary.to_string(),
                source: story.source.to_string(),
                published_at: edition - Duration::hours(i as i64),
                tier,
            }
        })
        .collect()
}
