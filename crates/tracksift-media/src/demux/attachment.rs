//! Attached file collection.

use bytes::Bytes;

/// A file attached to the container (fonts for ASS subtitles, cover art).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Default)]
struct PendingAttachment {
    name: Option<String>,
    mime_type: Option<String>,
    data: Option<Bytes>,
}

/// Pairs the `FileName` and `FileData` of each `AttachedFile`, whatever
/// order they arrive in.
#[derive(Debug, Default)]
pub struct AttachmentCollector {
    pending: Option<PendingAttachment>,
    completed: Vec<Attachment>,
}

impl AttachmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// An `AttachedFile` was opened.
    pub fn open(&mut self) {
        self.pending = Some(PendingAttachment::default());
    }

    pub fn set_name(&mut self, name: String) {
        if let Some(pending) = self.pending.as_mut() {
            pending.name = Some(name);
        }
    }

    pub fn set_mime_type(&mut self, mime_type: String) {
        if let Some(pending) = self.pending.as_mut() {
            pending.mime_type = Some(mime_type);
        }
    }

    pub fn set_data(&mut self, data: Bytes) {
        if let Some(pending) = self.pending.as_mut() {
            pending.data = Some(data);
        }
    }

    /// The `AttachedFile` was closed. Incomplete records are dropped.
    pub fn close(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match (pending.name, pending.data) {
            (Some(name), Some(data)) => {
                tracing::debug!("Collected attachment {} ({} bytes)", name, data.len());
                self.completed.push(Attachment {
                    name,
                    mime_type: pending.mime_type,
                    data,
                });
            }
            (name, _) => {
                tracing::warn!(
                    "Dropping incomplete attachment {:?}: name or data missing",
                    name
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    pub fn into_attachments(self) -> Vec<Attachment> {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_name_and_data_in_any_order() {
        let mut collector = AttachmentCollector::new();

        collector.open();
        collector.set_name("font.ttf".to_string());
        collector.set_data(Bytes::from_static(b"\x00\x01"));
        collector.close();

        collector.open();
        collector.set_data(Bytes::from_static(b"PNG"));
        collector.set_mime_type("image/png".to_string());
        collector.set_name("cover.png".to_string());
        collector.close();

        let attachments = collector.into_attachments();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].name, "font.ttf");
        assert_eq!(attachments[0].mime_type, None);
        assert_eq!(attachments[1].name, "cover.png");
        assert_eq!(attachments[1].mime_type.as_deref(), Some("image/png"));
        assert_eq!(attachments[1].data.as_ref(), b"PNG");
    }

    #[test]
    fn test_drops_incomplete_attachment() {
        let mut collector = AttachmentCollector::new();
        collector.open();
        collector.set_name("orphan.ttf".to_string());
        collector.close();
        assert!(collector.is_empty());
    }

    #[test]
    fn test_ignores_fields_outside_attached_file() {
        let mut collector = AttachmentCollector::new();
        collector.set_name("stray".to_string());
        collector.set_data(Bytes::from_static(b"x"));
        collector.close();
        assert_eq!(collector.len(), 0);
    }
}
