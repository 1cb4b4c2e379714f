// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Asynchronous image loading for tokens and background images.
//!
//! The [`ImageCache`] lives on the input thread. Requests go out through an
//! [`ImageLoader`]; results come back as [`ImageLoaded`] messages on an
//! `mpsc` channel and are applied by [`ImageCache::poll`]. A result for a key
//! that was released, or re-requested since, is stale and dropped.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use battlemap_canvas::Bitmap;
use hashbrown::HashMap;

/// Names an image: a file name, asset id or URL, as the host chooses.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey(String);

impl ImageKey {
    /// Wraps a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an image could not be produced.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// The source has nothing under this key.
    #[error("image `{0}` not found")]
    NotFound(ImageKey),
    /// The data exists but could not be turned into pixels.
    #[error("image `{key}` could not be decoded: {reason}")]
    Decode {
        /// The image.
        key: ImageKey,
        /// Decoder message.
        reason: String,
    },
}

/// Produces pixels for a key. Implemented by the host (file system, asset
/// bundle, network...).
pub trait ImageSource {
    /// Loads and decodes one image. May block.
    fn load(&self, key: &ImageKey) -> Result<Bitmap, ImageError>;
}

impl<F> ImageSource for F
where
    F: Fn(&ImageKey) -> Result<Bitmap, ImageError>,
{
    fn load(&self, key: &ImageKey) -> Result<Bitmap, ImageError> {
        self(key)
    }
}

/// A finished load, delivered on the completion channel.
#[derive(Debug)]
pub struct ImageLoaded {
    /// The image that was requested.
    pub key: ImageKey,
    /// Identifies the request; stale if it no longer matches the cache.
    pub request: u64,
    /// The pixels, or why there are none.
    pub result: Result<Arc<Bitmap>, ImageError>,
}

/// Starts loads and reports them on `reply`.
pub trait ImageLoader {
    /// Begins loading `key`. The result must eventually be sent on `reply`
    /// tagged with `request`, unless the loader shuts down first.
    fn request(&mut self, key: ImageKey, request: u64, reply: &Sender<ImageLoaded>);
}

/// Loads synchronously inside [`ImageLoader::request`]. The result is still
/// delivered through the channel, so it only shows up on the next poll.
#[derive(Debug)]
pub struct ImmediateImageLoader<S> {
    source: S,
}

impl<S: ImageSource> ImmediateImageLoader<S> {
    /// Wraps a source.
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: ImageSource> ImageLoader for ImmediateImageLoader<S> {
    fn request(&mut self, key: ImageKey, request: u64, reply: &Sender<ImageLoaded>) {
        let result = self.source.load(&key).map(Arc::new);
        // The cache owns the receiver; if it is gone nobody wants the result.
        let _ = reply.send(ImageLoaded {
            key,
            request,
            result,
        });
    }
}

enum WorkerMessage {
    Load {
        key: ImageKey,
        request: u64,
        reply: Sender<ImageLoaded>,
    },
    Shutdown,
}

/// Loads on a dedicated worker thread, one image at a time.
///
/// Dropping the loader stops the worker after its current image; requests
/// still queued are dropped unloaded.
pub struct ThreadImageLoader {
    requests: Sender<WorkerMessage>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for ThreadImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadImageLoader")
            .field("running", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

impl ThreadImageLoader {
    /// Spawns the worker thread.
    pub fn spawn<S>(source: S) -> std::io::Result<Self>
    where
        S: ImageSource + Send + 'static,
    {
        let (requests, inbox) = mpsc::channel::<WorkerMessage>();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name("battlemap-images".into())
            .spawn(move || {
                log::debug!("image worker started");
                Self::run(&source, &inbox, &worker_stop);
                log::debug!("image worker exiting");
            })?;
        Ok(Self {
            requests,
            stop,
            worker: Some(worker),
        })
    }

    fn run<S: ImageSource>(source: &S, inbox: &Receiver<WorkerMessage>, stop: &AtomicBool) {
        while let Ok(WorkerMessage::Load {
            key,
            request,
            reply,
        }) = inbox.recv()
        {
            if stop.load(Ordering::Acquire) {
                log::debug!("skipping queued loads on shutdown");
                break;
            }
            let result = source.load(&key).map(Arc::new);
            if let Err(err) = &result {
                log::debug!("loading {key} failed: {err}");
            }
            if reply
                .send(ImageLoaded {
                    key,
                    request,
                    result,
                })
                .is_err()
            {
                break;
            }
        }
    }
}

impl ImageLoader for ThreadImageLoader {
    fn request(&mut self, key: ImageKey, request: u64, reply: &Sender<ImageLoaded>) {
        let message = WorkerMessage::Load {
            key,
            request,
            reply: reply.clone(),
        };
        if self.requests.send(message).is_err() {
            log::error!("image worker is gone; request {request} dropped");
        }
    }
}

impl Drop for ThreadImageLoader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Wakes a worker blocked on an empty queue.
        let _ = self.requests.send(WorkerMessage::Shutdown);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::warn!("image worker panicked");
        }
    }
}

#[derive(Debug)]
enum Entry {
    Pending { request: u64 },
    Ready(Arc<Bitmap>),
    Failed(ImageError),
}

/// Images currently needed by a map, keyed by [`ImageKey`].
///
/// [`ImageCache::require_image`] is idempotent, so the compositor can call
/// it for every missing image on every frame.
pub struct ImageCache {
    entries: HashMap<ImageKey, Entry>,
    loader: Box<dyn ImageLoader>,
    reply: Sender<ImageLoaded>,
    completions: Receiver<ImageLoaded>,
    next_request: u64,
}

impl fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCache")
            .field("entries", &self.entries)
            .field("next_request", &self.next_request)
            .finish_non_exhaustive()
    }
}

fn no_images(key: &ImageKey) -> Result<Bitmap, ImageError> {
    Err(ImageError::NotFound(key.clone()))
}

/// A cache whose every load fails with [`ImageError::NotFound`].
impl Default for ImageCache {
    fn default() -> Self {
        Self::new(ImmediateImageLoader::new(no_images))
    }
}

impl ImageCache {
    /// Creates an empty cache loading through `loader`.
    pub fn new(loader: impl ImageLoader + 'static) -> Self {
        let (reply, completions) = mpsc::channel();
        Self {
            entries: HashMap::new(),
            loader: Box::new(loader),
            reply,
            completions,
            next_request: 0,
        }
    }

    /// Makes sure `key` is loaded or loading.
    ///
    /// Returns `true` if this call started a new load.
    pub fn require_image(&mut self, key: &ImageKey) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        let request = self.next_request;
        self.next_request += 1;
        self.entries.insert(key.clone(), Entry::Pending { request });
        log::debug!("requesting image {key} ({request})");
        self.loader.request(key.clone(), request, &self.reply);
        true
    }

    /// Forgets `key`. A load still in flight becomes stale.
    pub fn release(&mut self, key: &ImageKey) {
        self.entries.remove(key);
    }

    /// Forgets every image for which `in_use` returns `false` and returns
    /// how many went.
    pub fn release_unused(&mut self, mut in_use: impl FnMut(&ImageKey) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| in_use(key));
        let released = before - self.entries.len();
        if released > 0 {
            log::debug!("released {released} unused image(s)");
        }
        released
    }

    /// The pixels for `key`, once loaded.
    #[must_use]
    pub fn get(&self, key: &ImageKey) -> Option<&Arc<Bitmap>> {
        match self.entries.get(key) {
            Some(Entry::Ready(bitmap)) => Some(bitmap),
            _ => None,
        }
    }

    /// Returns `true` while a load for `key` is outstanding.
    #[must_use]
    pub fn is_pending(&self, key: &ImageKey) -> bool {
        matches!(self.entries.get(key), Some(Entry::Pending { .. }))
    }

    /// Why `key` failed to load, if it did.
    #[must_use]
    pub fn error(&self, key: &ImageKey) -> Option<&ImageError> {
        match self.entries.get(key) {
            Some(Entry::Failed(err)) => Some(err),
            _ => None,
        }
    }

    /// Applies every completion that has arrived and returns the keys that
    /// became available. Never blocks.
    pub fn poll(&mut self) -> Vec<ImageKey> {
        let mut ready = Vec::new();
        // The cache holds a sender itself, so the channel never disconnects.
        while let Ok(loaded) = self.completions.try_recv() {
            let current = matches!(
                self.entries.get(&loaded.key),
                Some(Entry::Pending { request }) if *request == loaded.request
            );
            if !current {
                log::warn!(
                    "discarding stale image {} (request {})",
                    loaded.key,
                    loaded.request
                );
                continue;
            }
            match loaded.result {
                Ok(bitmap) => {
                    self.entries.insert(loaded.key.clone(), Entry::Ready(bitmap));
                    ready.push(loaded.key);
                }
                Err(err) => {
                    log::warn!("{err}");
                    self.entries.insert(loaded.key, Entry::Failed(err));
                }
            }
        }
        ready
    }
}
