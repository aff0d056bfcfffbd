use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::TrackError;
use crate::metrics::compute_metrics;
use crate::track_types::*;

type Result<T> = std::result::Result<T, TrackError>;

/// Per-document counters for points and fields that were not usable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadStats {
    pub skipped_points: usize,
    pub invalid_timestamps: usize,
    pub invalid_elevations: usize,
}

/// Parse a GPX document into a track, its metrics and any non-fatal warnings.
pub fn parse_track(xml: &str) -> Result<ParsedTrack> {
    let (points, stats) = read_track_points(xml)?;
    let metrics = compute_metrics(&points);
    let warnings = collect_warnings(&points, &stats);

    if !warnings.is_empty() {
        warn!("track read with {} warning(s): {:?}", warnings.len(), warnings);
    }

    Ok(ParsedTrack {
        points,
        metrics,
        warnings,
    })
}

/// Collect every `<trkpt>` in document order, across all tracks and segments.
///
/// Points with missing, unparsable or out-of-range coordinates are left out
/// and counted; the rest of the document is still read. The document itself
/// must have exactly one root element and no text outside it.
pub fn read_track_points(xml: &str) -> Result<(Track, ReadStats)> {
    let mut reader = Reader::from_str(xml);
    let mut points = Vec::new();
    let mut stats = ReadStats::default();
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if open.is_empty() {
                    check_single_root(seen_root, e.name().0)?;
                }
                seen_root = true;
                if e.local_name().as_ref() == b"trkpt" {
                    if let Some(pt) = parse_point(&e, &mut reader, &mut stats)? {
                        points.push(pt);
                    }
                } else {
                    open.push(e.name().0.to_vec());
                }
            }
            Event::Empty(e) => {
                if open.is_empty() {
                    check_single_root(seen_root, e.name().0)?;
                }
                seen_root = true;
                if e.local_name().as_ref() == b"trkpt" {
                    match parse_lat_lon(&e)? {
                        Some((lat, lng)) => points.push(GeoPoint::new(lat, lng)),
                        None => stats.skipped_points += 1,
                    }
                }
            }
            Event::Text(e) if open.is_empty() => {
                let text = String::from_utf8_lossy(e.as_ref());
                if !text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}').is_empty() {
                    return Err(TrackError::TextOutsideRoot);
                }
            }
            Event::CData(_) if open.is_empty() => return Err(TrackError::TextOutsideRoot),
            Event::End(_) => {
                open.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(name) = open.pop() {
        return Err(TrackError::UnclosedElement {
            element: String::from_utf8_lossy(&name).into_owned(),
        });
    }
    if !seen_root {
        return Err(TrackError::NoRootElement);
    }

    Ok((Track::new(points), stats))
}

fn check_single_root(seen_root: bool, name: &[u8]) -> Result<()> {
    if seen_root {
        return Err(TrackError::MultipleRoots {
            element: String::from_utf8_lossy(name).into_owned(),
        });
    }
    Ok(())
}

fn collect_warnings(track: &Track, stats: &ReadStats) -> Vec<TrackWarning> {
    let mut warnings = Vec::new();
    if stats.skipped_points > 0 {
        warnings.push(TrackWarning::SkippedPoints {
            count: stats.skipped_points,
        });
    }
    if stats.invalid_timestamps > 0 {
        warnings.push(TrackWarning::InvalidTimestamps {
            count: stats.invalid_timestamps,
        });
    }
    if stats.invalid_elevations > 0 {
        warnings.push(TrackWarning::InvalidElevations {
            count: stats.invalid_elevations,
        });
    }
    if track.len() < 2 {
        warnings.push(TrackWarning::TooFewPoints { count: track.len() });
    }
    if let Some(index) = track.first_out_of_order() {
        warnings.push(TrackWarning::NonMonotonicTime { index });
    }
    warnings
}

/// Read `lat`/`lon` from a point's start tag.
///
/// `Ok(None)` means the point is unusable (missing, NaN, infinite or out of
/// range); malformed attribute syntax is a document error.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<Option<(f64, f64)>> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        let val = std::str::from_utf8(&attr.value).unwrap_or_default().trim();
        match attr.key.local_name().as_ref() {
            b"lat" => lat = val.parse::<f64>().ok(),
            b"lon" => lon = val.parse::<f64>().ok(),
            _ => {}
        }
    }

    match (lat, lon) {
        (Some(lat), Some(lon)) if GeoPoint::is_valid(lat, lon) => Ok(Some((lat, lon))),
        _ => {
            debug!("skipping trkpt with lat={lat:?} lon={lon:?}");
            Ok(None)
        }
    }
}

/// Parse a `<trkpt>` and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    stats: &mut ReadStats,
) -> Result<Option<GeoPoint>> {
    let Some((lat, lng)) = parse_lat_lon(start)? else {
        reader.read_to_end(start.name())?;
        stats.skipped_points += 1;
        return Ok(None);
    };

    let mut point = GeoPoint::new(lat, lng);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = read_text_owned(reader, &e)?;
                    match text.trim().parse::<f64>() {
                        Ok(v) if v.is_finite() => point.elevation = Some(v),
                        _ => stats.invalid_elevations += 1,
                    }
                }
                b"time" => {
                    let text = read_text_owned(reader, &e)?;
                    match parse_timestamp(&text) {
                        Some(t) => point.timestamp = Some(t),
                        None => {
                            debug!("unreadable trkpt time {text:?}");
                            stats.invalid_timestamps += 1;
                        }
                    }
                }
                _ => {
                    // extensions, speed, course, hr...
                    reader.read_to_end(e.name())?;
                }
            },
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => {
                return Err(TrackError::UnclosedElement {
                    element: String::from_utf8_lossy(&end_name).into_owned(),
                });
            }
            _ => {}
        }
    }

    Ok(Some(point))
}

/// Parse an ISO-8601 time. Values without an offset are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|t| t.and_utc())
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references.
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Event::CData(e) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Event::GeneralRef(e) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                }
            }
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => {
                return Err(TrackError::UnclosedElement {
                    element: String::from_utf8_lossy(&end_name).into_owned(),
                });
            }
            _ => {}
        }
    }

    Ok(text)
}
