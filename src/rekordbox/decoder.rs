use super::{CollectionTrack, PlaylistNode, Product, RekordboxDocument, Tempo};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

/// Playlist trees nested deeper than this are rejected.
pub const MAX_PLAYLIST_DEPTH: usize = 256;

const ROOT_ELEMENT: &[u8] = b"DJ_PLAYLISTS";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed document: {0}")]
    Malformed(String),
}

fn malformed<S: Into<String>>(reason: S) -> DecodeError {
    DecodeError::Malformed(reason.into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Collection,
    CollectionTrack,
    Playlists,
    Node,
    Ignored,
}

/// Parses an export document into its raw tree.
pub fn decode(bytes: &[u8]) -> Result<RekordboxDocument, DecodeError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut builder = DocumentBuilder::default();
    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            malformed(format!(
                "invalid XML at position {}: {}",
                reader.error_position(),
                e
            ))
        })?;
        match event {
            Event::Start(element) => {
                let scope = builder.open(&element)?;
                builder.scopes.push(scope);
            }
            Event::Empty(element) => {
                let scope = builder.open(&element)?;
                builder.close(scope)?;
            }
            Event::End(_) => {
                let scope = builder
                    .scopes
                    .pop()
                    .ok_or_else(|| malformed("unexpected closing tag"))?;
                builder.close(scope)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    builder.finish()
}

#[derive(Default)]
struct DocumentBuilder {
    document: Option<RekordboxDocument>,
    scopes: Vec<Scope>,
    current_track: Option<CollectionTrack>,
    open_nodes: Vec<PlaylistNode>,
}

impl DocumentBuilder {
    fn open(&mut self, element: &BytesStart) -> Result<Scope, DecodeError> {
        let parent = self.scopes.last().copied();
        let name = element.name();
        let scope = match (parent, name.as_ref()) {
            (None, ROOT_ELEMENT) => {
                if self.document.is_some() {
                    return Err(malformed("more than one root element"));
                }
                let mut document = RekordboxDocument::default();
                for_each_attribute(element, |key, value| {
                    if key == b"Version" {
                        document.version = value;
                    }
                })?;
                self.document = Some(document);
                Scope::Root
            }
            (None, other) => {
                return Err(malformed(format!(
                    "expected <DJ_PLAYLISTS> root element, found <{}>",
                    String::from_utf8_lossy(other)
                )))
            }
            (Some(Scope::Root), b"PRODUCT") => {
                let product = parse_product(element)?;
                if let Some(document) = self.document.as_mut() {
                    document.product = product;
                }
                Scope::Ignored
            }
            (Some(Scope::Root), b"COLLECTION") => Scope::Collection,
            (Some(Scope::Root), b"PLAYLISTS") => Scope::Playlists,
            (Some(Scope::Collection), b"TRACK") => {
                self.current_track = Some(parse_collection_track(element)?);
                Scope::CollectionTrack
            }
            (Some(Scope::CollectionTrack), b"TEMPO") => {
                let tempo = parse_tempo(element)?;
                if let Some(track) = self.current_track.as_mut() {
                    track.tempos.push(tempo);
                }
                Scope::Ignored
            }
            (Some(Scope::Playlists | Scope::Node), b"NODE") => {
                if self.open_nodes.len() >= MAX_PLAYLIST_DEPTH {
                    return Err(malformed(format!(
                        "playlist tree deeper than {} levels",
                        MAX_PLAYLIST_DEPTH
                    )));
                }
                self.open_nodes.push(parse_playlist_node(element)?);
                Scope::Node
            }
            (Some(Scope::Node), b"TRACK") => {
                let mut key = String::new();
                for_each_attribute(element, |attribute, value| {
                    if attribute == b"Key" {
                        key = value;
                    }
                })?;
                if let Some(node) = self.open_nodes.last_mut() {
                    node.track_keys.push(key);
                }
                Scope::Ignored
            }
            (_, other) => {
                debug!("Skipping element <{}>", String::from_utf8_lossy(other));
                Scope::Ignored
            }
        };
        Ok(scope)
    }

    fn close(&mut self, scope: Scope) -> Result<(), DecodeError> {
        match scope {
            Scope::CollectionTrack => {
                if let (Some(track), Some(document)) =
                    (self.current_track.take(), self.document.as_mut())
                {
                    document.tracks.push(track);
                }
            }
            Scope::Node => {
                let node = self
                    .open_nodes
                    .pop()
                    .ok_or_else(|| malformed("unbalanced playlist tree"))?;
                match self.open_nodes.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => {
                        if let Some(document) = self.document.as_mut() {
                            document.playlists.push(node);
                        }
                    }
                }
            }
            Scope::Root | Scope::Collection | Scope::Playlists | Scope::Ignored => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<RekordboxDocument, DecodeError> {
        if !self.scopes.is_empty() {
            return Err(malformed("unexpected end of document, unclosed elements"));
        }
        self.document
            .ok_or_else(|| malformed("missing <DJ_PLAYLISTS> root element"))
    }
}

fn for_each_attribute<F>(element: &BytesStart, mut f: F) -> Result<(), DecodeError>
where
    F: FnMut(&[u8], String),
{
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| malformed(format!("invalid attribute: {}", e)))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| malformed(format!("invalid attribute value: {}", e)))?;
        f(attribute.key.as_ref(), value.into_owned());
    }
    Ok(())
}

fn parse_product(element: &BytesStart) -> Result<Product, DecodeError> {
    let mut product = Product::default();
    for_each_attribute(element, |key, value| match key {
        b"Name" => product.name = value,
        b"Version" => product.version = value,
        b"Company" => product.company = value,
        _ => {}
    })?;
    Ok(product)
}

fn parse_collection_track(element: &BytesStart) -> Result<CollectionTrack, DecodeError> {
    let mut track = CollectionTrack::default();
    for_each_attribute(element, |key, value| match key {
        b"TrackID" => track.track_id = value,
        b"Name" => track.name = value,
        b"Artist" => track.artist = value,
        b"Composer" => track.composer = value,
        b"Album" => track.album = value,
        b"Grouping" => track.grouping = value,
        b"Genre" => track.genre = value,
        b"Kind" => track.kind = value,
        b"Size" => track.size = value,
        b"TotalTime" => track.total_time = value,
        b"DiscNumber" => track.disc_number = value,
        b"TrackNumber" => track.track_number = value,
        b"Year" => track.year = value,
        b"AverageBpm" => track.average_bpm = value,
        b"DateAdded" => track.date_added = value,
        b"BitRate" => track.bit_rate = value,
        b"SampleRate" => track.sample_rate = value,
        b"Comments" => track.comments = value,
        b"PlayCount" => track.play_count = value,
        b"Rating" => track.rating = value,
        b"Location" => track.location = value,
        b"Remixer" => track.remixer = value,
        b"Tonality" => track.tonality = value,
        b"Label" => track.label = value,
        b"Mix" => track.mix = value,
        _ => {}
    })?;
    Ok(track)
}

fn parse_tempo(element: &BytesStart) -> Result<Tempo, DecodeError> {
    let mut tempo = Tempo::default();
    for_each_attribute(element, |key, value| match key {
        b"Inizio" => tempo.inizio = value,
        b"Bpm" => tempo.bpm = value,
        b"Metro" => tempo.metro = value,
        b"Battito" => tempo.battito = value,
        _ => {}
    })?;
    Ok(tempo)
}

fn parse_playlist_node(element: &BytesStart) -> Result<PlaylistNode, DecodeError> {
    let mut node = PlaylistNode::default();
    for_each_attribute(element, |key, value| match key {
        b"Type" => node.node_type = value,
        b"Name" => node.name = value,
        b"Count" => node.count = value,
        b"KeyType" => node.key_type = value,
        b"Entries" => node.entries = value,
        _ => {}
    })?;
    Ok(node)
}
