//! Deferred texture loading.
//!
//! Image fetch and decode run on worker threads; everything that touches the
//! device happens in [`TextureLoader::pump`] on the rendering thread. A
//! pending load holds only a weak reference to its texture, so discarding
//! the texture before the image arrives turns the completion into a no-op.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Weak;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use image::DynamicImage;
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::context::GpuContext;
use crate::device::Device;
use crate::error::{GpuError, LoadError, Result};
use crate::texture::{LoadId, Texture, TextureParams, TextureRef};
use crate::types::TextureFormat;

/// Produces decoded images for texture paths. Called on worker threads.
pub trait ImageSource: Send + Sync + 'static {
    fn load(&self, path: &str) -> std::result::Result<DynamicImage, LoadError>;
}

/// Reads `http://` and `https://` paths over the network and everything
/// else from disk, relative to an optional root.
#[derive(Debug, Clone)]
pub struct FetchImageSource {
    http: Client,
    root: Option<PathBuf>,
}

impl FetchImageSource {
    pub fn new() -> std::result::Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;
        Ok(Self { http, root: None })
    }

    /// Resolves relative filesystem paths against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, LoadError> {
        debug!(url, "fetching image");
        let response = self
            .http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|source| LoadError::Http {
                url: url.to_string(),
                source,
            })?;
        let bytes = response.bytes().map_err(|source| LoadError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    fn read(&self, path: &str) -> std::result::Result<Vec<u8>, LoadError> {
        let full = match &self.root {
            Some(root) => root.join(path),
            None => Path::new(path).to_path_buf(),
        };
        std::fs::read(&full).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })
    }
}

impl ImageSource for FetchImageSource {
    fn load(&self, path: &str) -> std::result::Result<DynamicImage, LoadError> {
        let bytes = if path.starts_with("http://") || path.starts_with("https://") {
            self.fetch(path)?
        } else {
            self.read(path)?
        };
        image::load_from_memory(&bytes).map_err(|source| LoadError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Decoded(DynamicImage),
    Encoded(Vec<u8>),
}

/// Serves images registered up front. Encoded entries go through the same
/// decoder as [`FetchImageSource`].
#[derive(Debug, Clone, Default)]
pub struct MemoryImageSource {
    entries: HashMap<String, MemoryEntry>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: impl Into<String>, image: DynamicImage) -> Self {
        self.entries.insert(path.into(), MemoryEntry::Decoded(image));
        self
    }

    pub fn with_encoded(mut self, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.entries.insert(path.into(), MemoryEntry::Encoded(bytes));
        self
    }
}

impl ImageSource for MemoryImageSource {
    fn load(&self, path: &str) -> std::result::Result<DynamicImage, LoadError> {
        match self.entries.get(path) {
            Some(MemoryEntry::Decoded(image)) => Ok(image.clone()),
            Some(MemoryEntry::Encoded(bytes)) => {
                image::load_from_memory(bytes).map_err(|source| LoadError::Decode {
                    path: path.to_string(),
                    source,
                })
            }
            None => Err(LoadError::Missing {
                path: path.to_string(),
            }),
        }
    }
}

/// Outcome of one deferred load, as observed by [`TextureLoader::pump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Completed { path: String, width: u32, height: u32 },
    Failed { path: String, error: String },
    /// The texture was cancelled or discarded first; nothing was touched.
    Dropped { path: String },
}

impl LoadEvent {
    pub fn path(&self) -> &str {
        match self {
            LoadEvent::Completed { path, .. }
            | LoadEvent::Failed { path, .. }
            | LoadEvent::Dropped { path } => path,
        }
    }
}

struct Job {
    id: LoadId,
    path: String,
}

struct Finished {
    id: LoadId,
    path: String,
    result: std::result::Result<DynamicImage, LoadError>,
}

struct PendingLoad<D: Device> {
    texture: TextureRef<D>,
    path: String,
}

/// Starts deferred textures and finishes them on the rendering thread.
pub struct TextureLoader<D: Device> {
    jobs: Option<Sender<Job>>,
    results: Receiver<Finished>,
    workers: Vec<JoinHandle<()>>,
    pending: HashMap<LoadId, PendingLoad<D>>,
    next_id: LoadId,
}

impl<D: Device> TextureLoader<D> {
    /// Spawns `workers` decode threads (at least one) reading from `source`.
    pub fn new(source: Arc<dyn ImageSource>, workers: usize) -> std::io::Result<Self> {
        let (job_sender, job_receiver) = unbounded::<Job>();
        let (result_sender, result_receiver) = unbounded::<Finished>();

        let mut handles = Vec::with_capacity(workers.max(1));
        for index in 0..workers.max(1) {
            let jobs = job_receiver.clone();
            let results = result_sender.clone();
            let source = Arc::clone(&source);
            let handle = thread::Builder::new()
                .name(format!("glres-loader-{index}"))
                .spawn(move || {
                    for job in jobs.iter() {
                        let result = source.load(&job.path);
                        let finished = Finished {
                            id: job.id,
                            path: job.path,
                            result,
                        };
                        if results.send(finished).is_err() {
                            break;
                        }
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            jobs: Some(job_sender),
            results: result_receiver,
            workers: handles,
            pending: HashMap::new(),
            next_id: 0,
        })
    }

    /// Returns a pending texture and queues its image.
    ///
    /// The texture can be stored, bound and attached right away; it gets a
    /// device object during a later [`TextureLoader::pump`].
    pub fn load(
        &mut self,
        ctx: &mut GpuContext<D>,
        path: &str,
        params: TextureParams,
    ) -> Result<Texture<D>> {
        if path.trim().is_empty() {
            return Err(ctx.fail(GpuError::InvalidArguments(
                "deferred texture needs an image path".to_string(),
            )));
        }
        if params.format == TextureFormat::DepthComponent {
            return Err(ctx.fail(GpuError::InvalidArguments(format!(
                "depth texture cannot be loaded from image '{path}'"
            ))));
        }

        self.next_id += 1;
        let id = self.next_id;
        let job = Job {
            id,
            path: path.to_string(),
        };
        let queued = self
            .jobs
            .as_ref()
            .is_some_and(|jobs| jobs.send(job).is_ok());
        if !queued {
            return Err(ctx.fail(GpuError::ResourceInvalid(format!(
                "image loader is shut down; cannot load '{path}'"
            ))));
        }

        let texture = Texture::pending(params, path, id);
        self.pending.insert(
            id,
            PendingLoad {
                texture: texture.downgrade(),
                path: path.to_string(),
            },
        );
        debug!(path, id, "queued texture load");
        Ok(texture)
    }

    /// Stops waiting for `texture`'s image. Returns false if it had no load
    /// in flight on this loader.
    pub fn cancel(&mut self, texture: &Texture<D>) -> bool {
        let Some(id) = texture.load_id() else {
            return false;
        };
        // Ids are per loader; only the texture that queued the load owns it.
        let owned = self
            .pending
            .get(&id)
            .is_some_and(|pending| Weak::ptr_eq(&pending.texture, &texture.downgrade()));
        if !owned {
            return false;
        }
        self.pending.remove(&id);
        texture.cancel();
        debug!(id, "cancelled texture load");
        true
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Finishes every load whose image has arrived, without blocking.
    pub fn pump(&mut self, ctx: &mut GpuContext<D>) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(finished) => events.push(self.finish(ctx, finished)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    events.extend(self.abandon_pending(ctx));
                    break;
                }
            }
        }
        events
    }

    /// Pumps until nothing is pending or `timeout` elapses.
    pub fn pump_until_idle(&mut self, ctx: &mut GpuContext<D>, timeout: Duration) -> Vec<LoadEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.pump(ctx);
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.results.recv_timeout(remaining) {
                Ok(finished) => events.push(self.finish(ctx, finished)),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    events.extend(self.abandon_pending(ctx));
                    break;
                }
            }
        }
        if !self.pending.is_empty() {
            warn!(pending = self.pending.len(), "texture loads still pending after timeout");
        }
        events
    }

    /// Closes the job queue and waits for the workers to exit.
    pub fn shutdown(mut self) {
        self.jobs = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("texture loader worker panicked");
            }
        }
    }

    fn finish(&mut self, ctx: &mut GpuContext<D>, finished: Finished) -> LoadEvent {
        let Finished { id, path, result } = finished;
        let Some(pending) = self.pending.remove(&id) else {
            debug!(path = %path, "discarding image for cancelled load");
            return LoadEvent::Dropped { path };
        };
        let Some(cell) = pending.texture.upgrade() else {
            debug!(path = %path, "discarding image for dropped texture");
            return LoadEvent::Dropped { path };
        };
        let mut cell = cell.borrow_mut();
        if !cell.is_waiting_for(id) {
            return LoadEvent::Dropped { path };
        }

        match result {
            Ok(image) => match cell.complete(ctx, image) {
                Ok((width, height)) => {
                    debug!(path = %path, width, height, "deferred texture ready");
                    LoadEvent::Completed {
                        path,
                        width,
                        height,
                    }
                }
                Err(err) => LoadEvent::Failed {
                    path,
                    error: err.to_string(),
                },
            },
            Err(err) => {
                let error = err.to_string();
                warn!(path = %path, error = %error, "texture load failed");
                ctx.report_error(&error);
                cell.fail(error.clone());
                LoadEvent::Failed { path, error }
            }
        }
    }

    fn abandon_pending(&mut self, ctx: &mut GpuContext<D>) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        for (_, pending) in self.pending.drain() {
            let Some(cell) = pending.texture.upgrade() else {
                events.push(LoadEvent::Dropped { path: pending.path });
                continue;
            };
            let error = LoadError::Unavailable {
                path: pending.path.clone(),
            }
            .to_string();
            ctx.report_error(&error);
            cell.borrow_mut().fail(error.clone());
            events.push(LoadEvent::Failed {
                path: pending.path,
                error,
            });
        }
        events
    }
}

impl<D: Device> std::fmt::Debug for TextureLoader<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureLoader")
            .field("workers", &self.workers.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::diagnostics::MemoryDiagnostics;
    use crate::trace::TraceDevice;
    use crate::types::{MagFilter, MinFilter};

    const WAIT: Duration = Duration::from_secs(5);

    fn setup(source: MemoryImageSource) -> (GpuContext<TraceDevice>, TextureLoader<TraceDevice>, MemoryDiagnostics) {
        let diagnostics = MemoryDiagnostics::new();
        let ctx = GpuContext::with_diagnostics(TraceDevice::new(), Arc::new(diagnostics.clone()));
        let loader = TextureLoader::new(Arc::new(source), 1).unwrap();
        (ctx, loader, diagnostics)
    }

    fn gray(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([128])))
    }

    #[test]
    fn completes_on_pump() {
        let source = MemoryImageSource::new().with_image("a.png", gray(4, 2));
        let (mut ctx, mut loader, _) = setup(source);
        let texture = loader.load(&mut ctx, "a.png", TextureParams::default()).unwrap();
        assert!(texture.is_pending());
        assert!(texture.handle().is_none());

        let events = loader.pump_until_idle(&mut ctx, WAIT);
        assert_eq!(
            events,
            vec![LoadEvent::Completed {
                path: "a.png".to_string(),
                width: 4,
                height: 2
            }]
        );
        assert_eq!(texture.size(), Some((4, 2)));
        assert!(loader.is_idle());
        assert!(ctx.bindings().is_clear());
    }

    #[test]
    fn missing_image_fails_texture() {
        let (mut ctx, mut loader, diagnostics) = setup(MemoryImageSource::new());
        let texture = loader.load(&mut ctx, "nope.png", TextureParams::default()).unwrap();

        let events = loader.pump_until_idle(&mut ctx, WAIT);
        assert!(matches!(events.as_slice(), [LoadEvent::Failed { .. }]));
        assert!(matches!(texture.state(), crate::TextureState::Failed { .. }));
        assert_eq!(ctx.device().live_textures(), 0);
        assert_eq!(diagnostics.errors().len(), 1);
    }

    #[test]
    fn undecodable_bytes_fail() {
        let source = MemoryImageSource::new().with_encoded("bad.png", b"not an image".to_vec());
        let (mut ctx, mut loader, _) = setup(source);
        let _texture = loader.load(&mut ctx, "bad.png", TextureParams::default()).unwrap();
        let events = loader.pump_until_idle(&mut ctx, WAIT);
        match events.as_slice() {
            [LoadEvent::Failed { error, .. }] => assert!(error.contains("decode")),
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn cancelled_load_touches_nothing() {
        let source = MemoryImageSource::new().with_image("a.png", gray(2, 2));
        let (mut ctx, mut loader, diagnostics) = setup(source);
        let texture = loader.load(&mut ctx, "a.png", TextureParams::default()).unwrap();

        assert!(loader.cancel(&texture));
        assert!(!loader.cancel(&texture));
        assert_eq!(texture.state(), crate::TextureState::Cancelled);

        let deadline = Instant::now() + WAIT;
        let mut events = Vec::new();
        while events.is_empty() && Instant::now() < deadline {
            events = loader.pump(&mut ctx);
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(events, vec![LoadEvent::Dropped { path: "a.png".to_string() }]);
        assert!(ctx.device().commands().is_empty());
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn cancel_ignores_textures_from_other_loaders() {
        let source = MemoryImageSource::new().with_image("a.png", gray(2, 2));
        let (mut ctx, mut first, _) = setup(source.clone());
        let mut second = TextureLoader::new(Arc::new(source), 1).unwrap();
        let ours = first.load(&mut ctx, "a.png", TextureParams::default()).unwrap();
        let theirs = second.load(&mut ctx, "a.png", TextureParams::default()).unwrap();

        assert!(!first.cancel(&theirs));
        assert!(theirs.is_pending());
        assert_eq!(first.pending_count(), 1);

        first.pump_until_idle(&mut ctx, WAIT);
        second.pump_until_idle(&mut ctx, WAIT);
        assert_eq!(ours.size(), Some((2, 2)));
        assert_eq!(theirs.size(), Some((2, 2)));
    }

    struct PanickingSource;

    impl ImageSource for PanickingSource {
        fn load(&self, path: &str) -> std::result::Result<DynamicImage, LoadError> {
            panic!("decoder crashed on {path}");
        }
    }

    #[test]
    fn dead_workers_fail_pending_loads() {
        let diagnostics = MemoryDiagnostics::new();
        let mut ctx = GpuContext::with_diagnostics(TraceDevice::new(), Arc::new(diagnostics.clone()));
        let mut loader = TextureLoader::new(Arc::new(PanickingSource), 1).unwrap();
        let texture = loader.load(&mut ctx, "a.png", TextureParams::default()).unwrap();

        let events = loader.pump_until_idle(&mut ctx, WAIT);
        assert!(matches!(events.as_slice(), [LoadEvent::Failed { .. }]));
        match texture.state() {
            crate::TextureState::Failed { reason } => assert!(reason.contains("has shut down")),
            other => panic!("unexpected state {other:?}"),
        }
        assert!(loader.is_idle());
        assert_eq!(diagnostics.errors().len(), 1);
        assert_eq!(ctx.device().live_textures(), 0);

        let err = loader.load(&mut ctx, "b.png", TextureParams::default()).unwrap_err();
        assert!(matches!(err, GpuError::ResourceInvalid(_)));
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn depth_format_rejected_up_front() {
        let (mut ctx, mut loader, _) = setup(MemoryImageSource::new());
        let params = TextureParams::new(TextureFormat::DepthComponent, MagFilter::Linear, MinFilter::Linear);
        let err = loader.load(&mut ctx, "depth.png", params).unwrap_err();
        assert!(matches!(err, GpuError::InvalidArguments(_)));
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn shutdown_joins_workers() {
        let (_, loader, _) = setup(MemoryImageSource::new());
        loader.shutdown();
    }
}
