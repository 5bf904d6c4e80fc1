//! Object key extraction from `ListObjectsV2` XML and image filtering.
//!
//! [`ObjectKeys`] streams over the listing with a `quick_xml` reader and
//! yields the text of every `<Key>` element as it is reached, so callers can
//! stop early without parsing the rest of the document.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::ListingError;

/// File extensions treated as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 7] = [
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".avif", ".svg",
];

/// Lazy iterator over the object keys of a `ListObjectsV2` response.
///
/// Yields `Err` once and then stops if the document is malformed.
///
/// # Examples
///
/// ```
/// use bucketview_listing::keys::ObjectKeys;
///
/// let xml = "<ListBucketResult><Contents><Key>a.jpg</Key></Contents></ListBucketResult>";
/// let keys: Vec<String> = ObjectKeys::new(xml).collect::<Result<_, _>>().unwrap();
/// assert_eq!(keys, ["a.jpg"]);
/// ```
#[derive(Debug)]
pub struct ObjectKeys<'a> {
    reader: Reader<&'a [u8]>,
    done: bool,
}

impl<'a> ObjectKeys<'a> {
    /// Start iterating over the keys in `xml`.
    #[must_use]
    pub fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
            done: false,
        }
    }
}

impl Iterator for ObjectKeys<'_> {
    type Item = Result<String, ListingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"Key" => {
                    let key = read_text_content(&mut self.reader);
                    if key.is_err() {
                        self.done = true;
                    }
                    return Some(key);
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

/// Collect every object key in `xml`, in document order.
pub fn extract_keys(xml: &str) -> Result<Vec<String>, ListingError> {
    ObjectKeys::new(xml).collect()
}

/// Whether `key` names an image file, judged by its extension.
///
/// # Examples
///
/// ```
/// use bucketview_listing::keys::is_image_file;
///
/// assert!(is_image_file("holiday/beach.JPG"));
/// assert!(!is_image_file("notes.txt"));
/// ```
#[must_use]
pub fn is_image_file(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Read the text content of the current element and consume its end tag.
///
/// Entity and character references are resolved.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, ListingError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| ListingError::InvalidKey(err.to_string()))?;
                text.push_str(&decoded);
            }
            Event::CData(e) => {
                let raw = std::str::from_utf8(&e)
                    .map_err(|err| ListingError::InvalidKey(err.to_string()))?;
                text.push_str(raw);
            }
            Event::GeneralRef(e) => {
                let resolved = e
                    .resolve_char_ref()
                    .map_err(|err| ListingError::InvalidKey(err.to_string()))?;
                if let Some(ch) = resolved {
                    text.push(ch);
                } else {
                    let name = e
                        .decode()
                        .map_err(|err| ListingError::InvalidKey(err.to_string()))?;
                    let value = quick_xml::escape::resolve_predefined_entity(&name)
                        .ok_or_else(|| {
                            ListingError::InvalidKey(format!("unknown entity &{name};"))
                        })?;
                    text.push_str(value);
                }
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(ListingError::InvalidKey(
                    "unexpected EOF while reading key".to_owned(),
                ));
            }
            _ => {}
        }
    }
}
