//! Text shown for the hovered record.

use signband_engine::paint::Color;
use signband_model::InputRecord;

/// Multi-line description logged when a record is hovered or selected.
pub fn describe(index: usize, record: &InputRecord) -> String {
    let meta = &record.metadata;
    let mut out = format!("#{index} {}", record.id);

    if let Some(filename) = meta.filename.as_deref() {
        out.push_str(&format!("\n  file:   {filename}"));
    }
    let swatches = swatches(&meta.colors);
    if !swatches.is_empty() {
        out.push_str(&format!("\n  colors: {}", swatches.join(" ")));
    }
    if !meta.labels.is_empty() {
        out.push_str(&format!("\n  labels: {}", meta.labels.join(", ")));
    }
    out
}

/// `#rrggbb` strings for the colors that parse; the rest are dropped.
pub fn swatches(colors: &[String]) -> Vec<String> {
    colors
        .iter()
        .filter_map(|c| {
            let digits = c.strip_prefix('#').unwrap_or(c);
            match Color::parse_hex(digits) {
                Some(_) => Some(format!("#{}", digits.to_ascii_lowercase())),
                None => {
                    log::debug!("ignoring malformed color {c:?}");
                    None
                }
            }
        })
        .collect()
}

pub fn window_title(selected: Option<(usize, &InputRecord)>, total: usize) -> String {
    match selected {
        Some((index, record)) => {
            let name = record.metadata.filename.as_deref().unwrap_or(record.id.as_str());
            format!("signband: {name} ({}/{total})", index + 1)
        }
        None => format!("signband: {total} images"),
    }
}

#[cfg(test)]
mod tests {
    use signband_model::RecordMetadata;

    use super::*;

    fn record() -> InputRecord {
        InputRecord::with_metadata(
            "5a1",
            RecordMetadata {
                filename: Some("march-01.jpg".into()),
                colors: vec!["FF0000".into(), "#00ff00".into(), "nope".into()],
                labels: vec!["crowd".into(), "sign".into()],
                ..RecordMetadata::default()
            },
        )
    }

    #[test]
    fn description_lists_metadata() {
        let text = describe(4, &record());
        assert_eq!(
            text,
            "#4 5a1\n  file:   march-01.jpg\n  colors: #ff0000 #00ff00\n  labels: crowd, sign"
        );
    }

    #[test]
    fn signed_hex_is_not_a_swatch() {
        let colors = vec!["+fffff".to_string(), "#-00000".to_string(), "0a0B0c".to_string()];
        assert_eq!(swatches(&colors), ["#0a0b0c"]);
    }

    #[test]
    fn bare_record_is_one_line() {
        assert_eq!(describe(0, &InputRecord::new("x")), "#0 x");
    }

    #[test]
    fn title_prefers_filename() {
        let r = record();
        assert_eq!(window_title(Some((2, &r)), 10), "signband: march-01.jpg (3/10)");
        assert_eq!(
            window_title(Some((0, &InputRecord::new("raw-id"))), 1),
            "signband: raw-id (1/1)"
        );
        assert_eq!(window_title(None, 10), "signband: 10 images");
    }
}
