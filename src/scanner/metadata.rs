use crate::error::Result;
use crate::permalink::Shortcode;
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use xz2::read::XzDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Xz,
    Gzip,
}

impl Compression {
    /// Detect a metadata file by name: `*.json.xz` or `*.json.gz`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".json.xz") {
            Some(Compression::Xz)
        } else if name.ends_with(".json.gz") {
            Some(Compression::Gzip)
        } else {
            None
        }
    }
}

/// The fields of a post's metadata document this toolkit reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMetadata {
    pub shortcode: Shortcode,
    pub comment_count: Option<u64>,
}

#[derive(Deserialize)]
struct Document {
    node: Node,
}

#[derive(Deserialize)]
struct Node {
    shortcode: Shortcode,
    #[serde(default)]
    edge_media_to_parent_comment: Option<CommentEdge>,
}

#[derive(Deserialize)]
struct CommentEdge {
    count: u64,
}

pub fn is_metadata_file(path: &Path) -> bool {
    Compression::from_path(path).is_some()
}

/// Decompress and parse one metadata file.
pub fn read_metadata(path: &Path) -> Result<PostMetadata> {
    let reader = BufReader::new(File::open(path)?);
    let decoder: Box<dyn Read> = match Compression::from_path(path) {
        Some(Compression::Gzip) => Box::new(GzDecoder::new(reader)),
        // Unknown names are treated as xz, the downloader's own format.
        _ => Box::new(XzDecoder::new(reader)),
    };
    let doc: Document = serde_json::from_reader(decoder)?;
    Ok(PostMetadata {
        shortcode: doc.node.shortcode,
        comment_count: doc.node.edge_media_to_parent_comment.map(|e| e.count),
    })
}
