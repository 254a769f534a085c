//! Persists a playlist/folder tree, parents strictly before children.

use super::ImportError;
use crate::library_store::{
    LibraryId, LibraryWriter, NewPlaylistNode, PlaylistNodeId, PlaylistNodeKind, TrackId,
};
use crate::rekordbox::{PlaylistNode, MAX_PLAYLIST_DEPTH};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaylistTreeStats {
    pub nodes: usize,
    pub track_links: usize,
    /// Links whose key matched no track of the document.
    pub unresolved_track_keys: usize,
}

struct PendingNode<'a> {
    node: &'a PlaylistNode,
    parent_id: PlaylistNodeId,
    position: usize,
    depth: usize,
}

/// Persists `root` and its subtree under `parent_id`, returning the id
/// assigned to `root`.
///
/// Nodes are created in document order (depth-first, pre-order). A child
/// only ever receives the id of the row just created for its parent.
pub fn materialize<W: LibraryWriter + ?Sized>(
    writer: &mut W,
    root: &PlaylistNode,
    library_id: LibraryId,
    parent_id: Option<PlaylistNodeId>,
    position: usize,
    known_tracks: &HashMap<&str, TrackId>,
    stats: &mut PlaylistTreeStats,
) -> Result<PlaylistNodeId, ImportError> {
    let root_id = persist_node(writer, root, library_id, parent_id, position, known_tracks, stats)?;

    let mut pending: Vec<PendingNode> = Vec::new();
    push_children(&mut pending, root, root_id, 2);
    while let Some(PendingNode {
        node,
        parent_id,
        position,
        depth,
    }) = pending.pop()
    {
        if depth > MAX_PLAYLIST_DEPTH {
            return Err(ImportError::TreeTooDeep {
                max: MAX_PLAYLIST_DEPTH,
            });
        }
        let node_id = persist_node(
            writer,
            node,
            library_id,
            Some(parent_id),
            position,
            known_tracks,
            stats,
        )?;
        push_children(&mut pending, node, node_id, depth + 1);
    }

    Ok(root_id)
}

// Reversed so that popping yields the children in document order.
fn push_children<'a>(
    pending: &mut Vec<PendingNode<'a>>,
    node: &'a PlaylistNode,
    node_id: PlaylistNodeId,
    depth: usize,
) {
    pending.extend(
        node.children
            .iter()
            .enumerate()
            .rev()
            .map(|(position, child)| PendingNode {
                node: child,
                parent_id: node_id,
                position,
                depth,
            }),
    );
}

fn persist_node<W: LibraryWriter + ?Sized>(
    writer: &mut W,
    node: &PlaylistNode,
    library_id: LibraryId,
    parent_id: Option<PlaylistNodeId>,
    position: usize,
    known_tracks: &HashMap<&str, TrackId>,
    stats: &mut PlaylistTreeStats,
) -> Result<PlaylistNodeId, ImportError> {
    let node_kind = PlaylistNodeKind::from_type_marker(&node.node_type);
    let node_id = writer.insert_playlist_node(&NewPlaylistNode {
        library_id,
        name: node.name.clone(),
        node_kind,
        parent_id,
        position: position as i64,
    })?;
    stats.nodes += 1;

    match node_kind {
        PlaylistNodeKind::Playlist => {
            for (link_position, key) in node.track_keys.iter().enumerate() {
                writer.insert_playlist_track(node_id, link_position, key)?;
                stats.track_links += 1;
                if !known_tracks.contains_key(key.as_str()) {
                    stats.unresolved_track_keys += 1;
                }
            }
        }
        PlaylistNodeKind::Folder if !node.track_keys.is_empty() => {
            debug!(
                "Ignoring {} track keys on folder {:?}",
                node.track_keys.len(),
                node.name
            );
        }
        PlaylistNodeKind::Folder => {}
    }

    Ok(node_id)
}
