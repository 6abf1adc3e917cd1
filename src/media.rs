//! Media viewer: local camera preview or an embedded remote stream.
//!
//! The camera and the embed share one surface, so starting either one
//! tears the other down. Capture itself sits behind [`CameraDevice`].

use serde::Serialize;

use crate::text::escape_attr;

pub const CAMERA_RUNNING_HINT: &str = "Camera running";
pub const CAMERA_DENIED_HINT: &str = "Unable to access camera";
pub const CAMERA_OFF_HINT: &str = "Camera is off";
pub const EMBED_HINT: &str = "Embedded stream";
pub const REJECTED_URL_HINT: &str = "Stream URL not allowed";

const EMBED_ALLOW: &str = "autoplay; encrypted-media; picture-in-picture";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera device error: {0}")]
    Device(String),

    #[error("Stream URL rejected: {0}")]
    RejectedUrl(String),
}

/// A running capture. Dropping it without `stop_tracks` leaves the device
/// busy on some platforms.
pub trait MediaStream: Send {
    fn stop_tracks(&mut self);
}

/// Source of video-only capture streams.
pub trait CameraDevice: Send + Sync {
    fn open_video(&self) -> Result<Box<dyn MediaStream>, MediaError>;
}

/// Which stream URLs may be embedded.
#[derive(Debug, Clone, Default)]
pub struct StreamPolicy {
    allowed_hosts: Vec<String>,
}

impl StreamPolicy {
    /// Any http(s) host.
    pub fn any_host() -> Self {
        Self::default()
    }

    pub fn with_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Parse and check `raw`. Only `http` and `https` pass, and the host must
    /// be listed when a host list is configured.
    pub fn check(&self, raw: &str) -> Result<reqwest::Url, MediaError> {
        let url = reqwest::Url::parse(raw.trim())
            .map_err(|e| MediaError::RejectedUrl(format!("{raw}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(MediaError::RejectedUrl(format!(
                "scheme {} is not allowed",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| MediaError::RejectedUrl(format!("{raw}: missing host")))?
            .to_ascii_lowercase();

        if !self.allowed_hosts.is_empty() && !self.allowed_hosts.contains(&host) {
            return Err(MediaError::RejectedUrl(format!("host {host} is not allowed")));
        }

        Ok(url)
    }
}

/// Inline frame descriptor for an embedded stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFrame {
    /// Attribute-escaped URL.
    pub src: String,
    pub allow: &'static str,
    pub allow_fullscreen: bool,
}

impl EmbedFrame {
    fn for_url(url: &reqwest::Url) -> Self {
        Self {
            src: escape_attr(url.as_str()),
            allow: EMBED_ALLOW,
            allow_fullscreen: true,
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            r#"<iframe src="{}" allow="{}"{}></iframe>"#,
            self.src,
            self.allow,
            if self.allow_fullscreen { " allowfullscreen" } else { "" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Surface {
    Empty,
    Camera,
    Embed(EmbedFrame),
}

pub struct MediaViewer {
    camera: Box<dyn CameraDevice>,
    policy: StreamPolicy,
    active: Option<Box<dyn MediaStream>>,
    surface: Surface,
    hint: &'static str,
}

impl MediaViewer {
    pub fn new(camera: Box<dyn CameraDevice>, policy: StreamPolicy) -> Self {
        Self {
            camera,
            policy,
            active: None,
            surface: Surface::Empty,
            hint: CAMERA_OFF_HINT,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn hint(&self) -> &'static str {
        self.hint
    }

    pub fn camera_running(&self) -> bool {
        self.active.is_some()
    }

    /// Open the camera and show it. Any embed is removed first; on failure
    /// the surface stays empty.
    pub fn start_camera(&mut self) -> Result<(), MediaError> {
        self.release_camera();
        self.surface = Surface::Empty;

        match self.camera.open_video() {
            Ok(stream) => {
                self.active = Some(stream);
                self.surface = Surface::Camera;
                self.hint = CAMERA_RUNNING_HINT;
                tracing::debug!("Camera started");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Camera unavailable");
                self.hint = CAMERA_DENIED_HINT;
                Err(e)
            }
        }
    }

    pub fn stop_camera(&mut self) {
        self.release_camera();
        if self.surface == Surface::Camera {
            self.surface = Surface::Empty;
        }
        self.hint = CAMERA_OFF_HINT;
    }

    /// Embed `url`. Blank input does nothing; a rejected URL leaves the
    /// viewer as it was apart from the hint.
    pub fn load_stream(&mut self, url: &str) -> Result<Option<&EmbedFrame>, MediaError> {
        if url.trim().is_empty() {
            return Ok(None);
        }

        let parsed = match self.policy.check(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stream URL rejected");
                self.hint = REJECTED_URL_HINT;
                return Err(e);
            }
        };

        self.release_camera();
        self.surface = Surface::Embed(EmbedFrame::for_url(&parsed));
        self.hint = EMBED_HINT;
        tracing::debug!(host = parsed.host_str().unwrap_or_default(), "Stream embedded");

        match &self.surface {
            Surface::Embed(frame) => Ok(Some(frame)),
            _ => Ok(None),
        }
    }

    fn release_camera(&mut self) {
        if let Some(mut stream) = self.active.take() {
            stream.stop_tracks();
        }
    }
}

impl Drop for MediaViewer {
    fn drop(&mut self) {
        self.release_camera();
    }
}
