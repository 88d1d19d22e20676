/* 📖 # How is the MIME type detected?

Detection follows the WHATWG MIME sniffing algorithm on at most the first 512 bytes:
known magic numbers first, then the text/binary heuristic. Two results are adjusted to
match what the `file` utility reports: OpenPGP data (ASCII armored or binary packets)
becomes `application/pgp-encrypted`, and empty input becomes `inode/x-empty`.
*/

/// Number of bytes inspected when sniffing.
pub const SNIFF_LEN: usize = 512;

pub const MIME_EMPTY: &str = "inode/x-empty";
pub const MIME_PGP_ENCRYPTED: &str = "application/pgp-encrypted";
pub const MIME_TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

const PGP_ARMOR_HEADER: &[u8] = b"-----BEGIN PGP MESSAGE-----";

/// Tags that start an HTML document when followed by a space or `>`.
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const PREFIX_SIGNATURES: &[(&[u8], &str)] = &[
    (b"<?xml", "text/xml; charset=utf-8"),
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\xFE\xFF", "text/plain; charset=utf-16be"),
    (b"\xFF\xFE", "text/plain; charset=utf-16le"),
    (b"\xEF\xBB\xBF", MIME_TEXT_PLAIN),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"BM", "image/bmp"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"ID3", "audio/mpeg"),
    (b"OggS\x00", "application/ogg"),
    (b"MThd\x00\x00\x00\x06", "audio/midi"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    (b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    (b"\x00\x61\x73\x6D", "application/wasm"),
];

/// RIFF/FORM containers identified by a four byte form type at offset 8.
const CONTAINER_SIGNATURES: &[(&[u8; 4], &[u8; 4], &str)] = &[
    (b"RIFF", b"WEBP", "image/webp"),
    (b"RIFF", b"AVI ", "video/avi"),
    (b"RIFF", b"WAVE", "audio/wave"),
    (b"FORM", b"AIFF", "audio/aiff"),
];

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | 0x0C | b'\r' | b' ')
}

fn is_binary_byte(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|&b| !is_whitespace(b))
        .unwrap_or(data.len());
    &data[start..]
}

fn matches_html_tag(data: &[u8], tag: &[u8]) -> bool {
    if data.len() <= tag.len() || !data[..tag.len()].eq_ignore_ascii_case(tag) {
        return false;
    }
    matches!(data[tag.len()], b' ' | b'>')
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size % 4 != 0 || data.len() < box_size || box_size < 12 {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    (8..box_size)
        .step_by(4)
        .filter(|&offset| offset != 12)
        .any(|offset| data.get(offset..offset + 3) == Some(b"mp4".as_slice()))
}

/// MIME type of `data` according to the WHATWG sniffing rules.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    let trimmed = skip_whitespace(data);
    if HTML_TAGS.iter().any(|tag| matches_html_tag(trimmed, tag)) {
        return "text/html; charset=utf-8";
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if let Some((_, mime)) = PREFIX_SIGNATURES
        .iter()
        .find(|(signature, _)| data.starts_with(signature))
    {
        return *mime;
    }
    if data.len() >= 12 {
        if let Some((_, _, mime)) = CONTAINER_SIGNATURES
            .iter()
            .find(|(container, form, _)| &data[..4] == *container && &data[8..12] == *form)
        {
            return *mime;
        }
    }
    if is_mp4(data) {
        return "video/mp4";
    }

    if data.iter().any(|&b| is_binary_byte(b)) {
        MIME_OCTET_STREAM
    } else {
        MIME_TEXT_PLAIN
    }
}

/// True if `data` begins with an OpenPGP encrypted session key packet
/// (public key or symmetric), in old or new packet format.
fn is_binary_openpgp(data: &[u8]) -> bool {
    let Some(&first) = data.first() else {
        return false;
    };
    if first & 0x80 == 0 {
        return false;
    }
    let (tag, header_len) = if first & 0x40 == 0 {
        let length_bytes = match first & 0x03 {
            0 => 1,
            1 => 2,
            2 => 4,
            _ => return false,
        };
        ((first >> 2) & 0x0F, 1 + length_bytes)
    } else {
        let Some(&length_octet) = data.get(1) else {
            return false;
        };
        let length_bytes = match length_octet {
            0..=191 => 1,
            192..=223 => 2,
            255 => 5,
            _ => return false,
        };
        (first & 0x3F, 1 + length_bytes)
    };
    let Some(&version) = data.get(header_len) else {
        return false;
    };
    match tag {
        1 => matches!(version, 3 | 6),
        3 => matches!(version, 4..=6),
        _ => false,
    }
}

pub fn is_openpgp_data(data: &[u8]) -> bool {
    skip_whitespace(data).starts_with(PGP_ARMOR_HEADER) || is_binary_openpgp(data)
}

/// MIME type as reported for files: the sniffed type with the empty and OpenPGP cases
/// reclassified.
pub fn sniff_mime_type(data: &[u8]) -> String {
    if data.is_empty() {
        return MIME_EMPTY.to_string();
    }
    if is_openpgp_data(data) {
        return MIME_PGP_ENCRYPTED.to_string();
    }
    detect_content_type(data).to_string()
}
