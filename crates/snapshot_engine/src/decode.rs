use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use monitor_logging::monitor_warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding_label: String,
}

/// Decode a response body to text using: BOM -> Content-Type charset -> chardetng fallback.
///
/// Malformed sequences are replaced with U+FFFD rather than failing the run.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> DecodedBody {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    // Plain ASCII/UTF-8 is by far the common case; skip detection for it.
    if std::str::from_utf8(bytes).is_ok() {
        return decode_with(bytes, encoding_rs::UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
        })
        .next()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedBody {
    // `decode` strips a matching BOM, which must not end up in the snapshot.
    let (text, used, had_errors) = enc.decode(bytes);
    if had_errors {
        monitor_warn!(
            "Body is not valid {}; malformed sequences were replaced",
            used.name()
        );
    }
    DecodedBody {
        text: text.into_owned(),
        encoding_label: used.name().to_string(),
    }
}
