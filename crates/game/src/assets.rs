//! Background asset loading. Each request runs on its own thread and reports
//! back over a channel that the frame loop drains.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use procgen::TextureData;
use renderer::{GltfMesh, RenderError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
    #[error("{path:?}: mesh `{mesh}` has no {attribute}")]
    MissingAttribute {
        path: PathBuf,
        mesh: String,
        attribute: &'static str,
    },
    #[error("could not start loader thread: {0}")]
    Spawn(std::io::Error),
}

impl AssetError {
    fn decode(path: &Path, error: RenderError) -> Self {
        match error {
            RenderError::MissingAttribute { mesh, attribute } => AssetError::MissingAttribute {
                path: path.to_path_buf(),
                mesh,
                attribute,
            },
            source => AssetError::Decode {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    DetailNoise,
    FlowMap,
    Smoke,
    LeafOne,
    LeafTwo,
    Bark,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 6] = [
        TextureSlot::DetailNoise,
        TextureSlot::FlowMap,
        TextureSlot::Smoke,
        TextureSlot::LeafOne,
        TextureSlot::LeafTwo,
        TextureSlot::Bark,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSlot {
    Tree,
    Homespace,
    Islands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRequest {
    Texture(TextureSlot),
    Model(ModelSlot),
}

#[derive(Debug)]
pub enum AssetPayload {
    Texture(TextureData),
    Model(Vec<GltfMesh>),
}

#[derive(Debug)]
pub enum AssetEvent {
    Loaded {
        request: AssetRequest,
        payload: AssetPayload,
    },
    Failed {
        request: AssetRequest,
        error: AssetError,
    },
}

fn load(request: AssetRequest, path: &Path) -> Result<AssetPayload, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match request {
        AssetRequest::Texture(_) => renderer::decode_image(&bytes)
            .map(AssetPayload::Texture)
            .map_err(|e| AssetError::decode(path, e)),
        AssetRequest::Model(_) => renderer::load_gltf(&bytes)
            .map(AssetPayload::Model)
            .map_err(|e| AssetError::decode(path, e)),
    }
}

pub struct AssetLoader {
    sender: Sender<AssetEvent>,
    receiver: Receiver<AssetEvent>,
    in_flight: usize,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Start loading `path` in the background.
    pub fn request(&mut self, request: AssetRequest, path: PathBuf) {
        let sender = self.sender.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("asset-{:?}", request))
            .spawn(move || {
                let event = match load(request, &path) {
                    Ok(payload) => AssetEvent::Loaded { request, payload },
                    Err(error) => AssetEvent::Failed { request, error },
                };
                // The loader may be gone if the app shut down mid-load.
                let _ = sender.send(event);
            });
        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(e) => {
                let _ = self.sender.send(AssetEvent::Failed {
                    request,
                    error: AssetError::Spawn(e),
                });
                self.in_flight += 1;
            }
        }
    }

    /// Every event that has arrived since the last poll. Never blocks.
    pub fn poll(&mut self) -> Vec<AssetEvent> {
        let events: Vec<AssetEvent> = self.receiver.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(events.len());
        events
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    impl AssetLoader {
        /// Block until one event arrives or `timeout` elapses.
        fn wait(&mut self, timeout: Duration) -> Option<AssetEvent> {
            let event = self.receiver.recv_timeout(timeout).ok()?;
            self.in_flight = self.in_flight.saturating_sub(1);
            Some(event)
        }
    }

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cloudsea-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn missing_file_reports_io_failure() {
        let mut loader = AssetLoader::new();
        let request = AssetRequest::Texture(TextureSlot::Smoke);
        loader.request(request, PathBuf::from("/no/such/Smoke18.png"));
        assert_eq!(loader.in_flight(), 1);
        match loader.wait(WAIT) {
            Some(AssetEvent::Failed { request: r, error: AssetError::Io { .. } }) => assert_eq!(r, request),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn garbage_image_reports_decode_failure() {
        let path = temp_file("garbage.png", b"not an image");
        let mut loader = AssetLoader::new();
        loader.request(AssetRequest::Texture(TextureSlot::Bark), path);
        assert!(matches!(
            loader.wait(WAIT),
            Some(AssetEvent::Failed { error: AssetError::Decode { .. }, .. })
        ));
    }

    #[test]
    fn model_without_positions_reports_missing_attribute() {
        let gltf = r#"{
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "name": "rock", "mesh": 0 }],
            "meshes": [{ "primitives": [{ "attributes": {} }] }]
        }"#;
        let path = temp_file("empty.gltf", gltf.as_bytes());
        let mut loader = AssetLoader::new();
        loader.request(AssetRequest::Model(ModelSlot::Islands), path);
        match loader.wait(WAIT) {
            Some(AssetEvent::Failed { error, .. }) => {
                assert!(
                    matches!(error, AssetError::MissingAttribute { .. } | AssetError::Decode { .. }),
                    "{error}"
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn poll_is_non_blocking_when_idle() {
        let mut loader = AssetLoader::new();
        assert!(loader.poll().is_empty());
        assert_eq!(loader.in_flight(), 0);
    }
}
