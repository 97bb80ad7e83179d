// StreamSelector - picks what to download from a catalog
//
// Rules:
// - Any combined (audio+video) stream wins; highest height among them
// - Otherwise best video-only by height plus best audio-only by bitrate
// - Equal quality: the earlier entry in catalog order wins

use super::models::{SelectionResult, StreamDescriptor, StreamKind};

/// Choose the best combined stream, or the best video/audio pair
pub fn select(catalog: &[StreamDescriptor]) -> SelectionResult {
    if let Some(combined) = best_of_kind(catalog, StreamKind::Combined) {
        return SelectionResult::Combined(combined.clone());
    }

    match (
        best_of_kind(catalog, StreamKind::VideoOnly),
        best_of_kind(catalog, StreamKind::AudioOnly),
    ) {
        (Some(video), Some(audio)) => SelectionResult::Pair {
            video: video.clone(),
            audio: audio.clone(),
        },
        _ => SelectionResult::Unavailable,
    }
}

/// Highest quality of one kind; first wins on ties.
/// `Iterator::max_by_key` returns the last maximum, so fold by hand.
fn best_of_kind(catalog: &[StreamDescriptor], kind: StreamKind) -> Option<&StreamDescriptor> {
    catalog
        .iter()
        .filter(|s| s.kind == kind)
        .fold(None, |best: Option<&StreamDescriptor>, candidate| match best {
            Some(current) if current.quality >= candidate.quality => Some(current),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::StreamHandle;

    fn stream(id: &str, kind: StreamKind, quality: u64) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            kind,
            quality,
            container: "mp4".to_string(),
            codec: None,
            handle: StreamHandle {
                url: format!("https://example.invalid/{}", id),
                headers: Vec::new(),
            },
        }
    }

    #[test]
    fn combined_wins_over_pair() {
        let catalog = vec![
            stream("137", StreamKind::VideoOnly, 1080),
            stream("140", StreamKind::AudioOnly, 128_000),
            stream("18", StreamKind::Combined, 360),
            stream("22", StreamKind::Combined, 720),
        ];

        match select(&catalog) {
            SelectionResult::Combined(s) => assert_eq!(s.format_id, "22"),
            other => panic!("expected combined, got {:?}", other),
        }
    }

    #[test]
    fn ties_go_to_catalog_order() {
        let catalog = vec![
            stream("first", StreamKind::Combined, 720),
            stream("second", StreamKind::Combined, 720),
        ];
        assert_eq!(
            select(&catalog),
            SelectionResult::Combined(catalog[0].clone())
        );

        let catalog = vec![
            stream("v1", StreamKind::VideoOnly, 1080),
            stream("v2", StreamKind::VideoOnly, 1080),
            stream("a1", StreamKind::AudioOnly, 160_000),
            stream("a2", StreamKind::AudioOnly, 160_000),
        ];
        match select(&catalog) {
            SelectionResult::Pair { video, audio } => {
                assert_eq!(video.format_id, "v1");
                assert_eq!(audio.format_id, "a1");
            }
            other => panic!("expected pair, got {:?}", other),
        }
    }

    #[test]
    fn pair_takes_per_class_maxima() {
        let catalog = vec![
            stream("v480", StreamKind::VideoOnly, 480),
            stream("a48", StreamKind::AudioOnly, 48_000),
            stream("v1080", StreamKind::VideoOnly, 1080),
            stream("a160", StreamKind::AudioOnly, 160_000),
            stream("v720", StreamKind::VideoOnly, 720),
        ];

        assert_eq!(
            select(&catalog),
            SelectionResult::Pair {
                video: catalog[2].clone(),
                audio: catalog[3].clone(),
            }
        );
    }

    #[test]
    fn missing_class_is_unavailable() {
        let video_only = vec![stream("v", StreamKind::VideoOnly, 720)];
        assert_eq!(select(&video_only), SelectionResult::Unavailable);

        let audio_only = vec![stream("a", StreamKind::AudioOnly, 128_000)];
        assert_eq!(select(&audio_only), SelectionResult::Unavailable);

        assert_eq!(select(&[]), SelectionResult::Unavailable);
    }
}
