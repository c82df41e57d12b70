//! A GStreamer window that renders the active stream and owns its
//! full-screen state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use gst::prelude::*;
use gstreamer as gst;
use rawcam_common::error::{RawcamError, RawcamResult};
use rawcam_platform_core::{DisplayEvent, FullscreenOptions};
use tokio::sync::broadcast;

use crate::backend::EventSender;
use crate::display::{DisplaySink, FullscreenHost};
use crate::pipeline::{preview_launch, GstPipeline};
use crate::stream::MediaStream;

/// State shared between the window and its full-screen host.
struct Shared {
    events: EventSender,
    pipeline: Mutex<Option<gst::Pipeline>>,
    fullscreen: AtomicBool,
    /// The sink's `fullscreen` property was set by us.
    borderless: AtomicBool,
}

impl Shared {
    fn with_window<T>(&self, f: impl FnOnce(&gst::Pipeline) -> RawcamResult<T>) -> RawcamResult<T> {
        let guard = self
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let pipeline = guard
            .as_ref()
            .ok_or_else(|| RawcamError::fullscreen("no preview window is open"))?;
        f(pipeline)
    }

    fn set_fullscreen(&self, fullscreen: bool) -> RawcamResult<()> {
        self.with_window(|pipeline| {
            let sink = find_fullscreen_element(pipeline).ok_or_else(|| {
                RawcamError::fullscreen("the video sink does not support full-screen")
            })?;
            sink.set_property("fullscreen", fullscreen);
            tracing::debug!(element = %sink.name(), fullscreen, "Video sink full-screen toggled");
            Ok(())
        })
    }

    /// Nothing is on screen any more, full-screen or not.
    fn window_closed(&self) {
        self.fullscreen.store(false, Ordering::SeqCst);
        let _ = self
            .events
            .send(DisplayEvent::FullscreenChanged { fullscreen: false });
    }
}

/// [`DisplaySink`] that opens a window reading the stream's inter channels.
pub struct PreviewWindow {
    shared: Arc<Shared>,
    window: Option<GstPipeline>,
    bound_stream: Option<String>,
}

impl PreviewWindow {
    pub fn new(events: EventSender) -> Self {
        Self {
            shared: Arc::new(Shared {
                events,
                pipeline: Mutex::new(None),
                fullscreen: AtomicBool::new(false),
                borderless: AtomicBool::new(false),
            }),
            window: None,
            bound_stream: None,
        }
    }

    /// The full-screen host for this window.
    pub fn host(&self) -> PreviewHost {
        PreviewHost {
            shared: self.shared.clone(),
        }
    }
}

impl DisplaySink for PreviewWindow {
    fn attach(&mut self, stream: &MediaStream) -> RawcamResult<()> {
        self.detach();

        let stream_id = stream.id().to_string();
        let mut window = GstPipeline::from_launch("preview", &preview_launch(&stream_id))?;

        let shared = self.shared.clone();
        let mounted = stream_id.clone();
        let mut announced = false;
        window.watch_bus(move |msg| match msg.view() {
            gst::MessageView::StateChanged(change) => {
                let from_pipeline = msg
                    .src()
                    .is_some_and(|src| src.downcast_ref::<gst::Pipeline>().is_some());
                if from_pipeline && change.current() == gst::State::Playing && !announced {
                    announced = true;
                    tracing::debug!(stream = %mounted, "Preview window playing");
                    let _ = shared.events.send(DisplayEvent::SinkMounted {
                        stream_id: mounted.clone(),
                    });
                }
            }
            gst::MessageView::Error(err) => {
                tracing::info!(error = %err.error(), "Preview window closed");
                shared.window_closed();
            }
            gst::MessageView::Eos(_) => shared.window_closed(),
            _ => {}
        })?;
        window.play()?;

        *self
            .shared
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(window.pipeline().clone());
        self.window = Some(window);
        self.bound_stream = Some(stream_id);
        Ok(())
    }

    fn detach(&mut self) {
        self.shared
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.shared.fullscreen.store(false, Ordering::SeqCst);
        self.shared.borderless.store(false, Ordering::SeqCst);
        if let Some(mut window) = self.window.take() {
            if let Err(e) = window.stop() {
                tracing::warn!(error = %e, "Preview window did not close cleanly");
            }
        }
        if let Some(stream) = self.bound_stream.take() {
            tracing::debug!(stream = %stream, "Preview window detached");
        }
    }

    fn is_bound(&self) -> bool {
        self.bound_stream.is_some()
    }
}

/// [`FullscreenHost`] backed by the preview window's video sink.
#[derive(Clone)]
pub struct PreviewHost {
    shared: Arc<Shared>,
}

#[async_trait::async_trait]
impl FullscreenHost for PreviewHost {
    async fn request_fullscreen(&self, options: FullscreenOptions) -> RawcamResult<()> {
        if options.hide_navigation {
            self.shared.set_fullscreen(true)?;
        } else {
            // Decorated window; the session is still coupled to it.
            self.shared.with_window(|_| Ok(()))?;
            tracing::debug!("Keeping window decorations");
        }
        self.shared
            .borderless
            .store(options.hide_navigation, Ordering::SeqCst);
        self.shared.fullscreen.store(true, Ordering::SeqCst);
        let _ = self
            .shared
            .events
            .send(DisplayEvent::FullscreenChanged { fullscreen: true });
        Ok(())
    }

    async fn exit_fullscreen(&self) -> RawcamResult<()> {
        if !self.shared.fullscreen.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let result = if self.shared.borderless.swap(false, Ordering::SeqCst) {
            self.shared.set_fullscreen(false)
        } else {
            Ok(())
        };
        // The window left full-screen either way from the session's view.
        let _ = self
            .shared
            .events
            .send(DisplayEvent::FullscreenChanged { fullscreen: false });
        result
    }

    fn is_fullscreen(&self) -> bool {
        self.shared.fullscreen.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.shared.events.subscribe()
    }
}

/// First element in `bin` (searched recursively) exposing a `fullscreen`
/// property.
fn find_fullscreen_element(bin: &gst::Pipeline) -> Option<gst::Element> {
    let mut iter = bin.iterate_recurse();
    loop {
        match iter.next() {
            Ok(Some(element)) => {
                if element.find_property("fullscreen").is_some() {
                    return Some(element);
                }
            }
            Ok(None) => return None,
            Err(gst::IteratorError::Resync) => iter.resync(),
            Err(gst::IteratorError::Error) => return None,
        }
    }
}
