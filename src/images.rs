//! Image cache for map backgrounds and gadget icons.
//!
//! Images load asynchronously. The renderer never waits: it looks up each URL
//! in an [`ImageCache`] and draws a fallback while the entry is pending or
//! failed. Every resolution bumps the cache generation, which the host uses
//! to schedule a redraw. Failures are terminal; a URL is requested at most
//! once.

#[cfg(test)]
#[path = "images_test.rs"]
mod images_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{Event, HtmlImageElement};

/// A decoded raster with known pixel dimensions.
pub trait RasterImage {
    /// Natural `(width, height)` in pixels.
    fn dimensions(&self) -> (f64, f64);
}

impl RasterImage for HtmlImageElement {
    fn dimensions(&self) -> (f64, f64) {
        (f64::from(self.natural_width()), f64::from(self.natural_height()))
    }
}

/// Load state of one URL.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageState<I> {
    Pending,
    Ready(I),
    Failed,
}

#[derive(Debug)]
pub struct ImageCache<I> {
    entries: HashMap<String, ImageState<I>>,
    generation: u64,
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        Self { entries: HashMap::new(), generation: 0 }
    }
}

impl<I> ImageCache<I> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` as pending if it has never been requested. Returns `true`
    /// when the caller must start a load.
    pub fn request(&mut self, url: &str) -> bool {
        if self.entries.contains_key(url) {
            return false;
        }
        self.entries.insert(url.to_owned(), ImageState::Pending);
        true
    }

    /// Record the outcome of a load.
    pub fn resolve(&mut self, url: &str, outcome: Result<I, String>) {
        let state = match outcome {
            Ok(image) => ImageState::Ready(image),
            Err(reason) => {
                tracing::warn!(url, reason = %reason, "image failed to load");
                ImageState::Failed
            }
        };
        self.entries.insert(url.to_owned(), state);
        self.generation += 1;
    }

    #[must_use]
    pub fn state(&self, url: &str) -> Option<&ImageState<I>> {
        self.entries.get(url)
    }

    /// The decoded image, once ready.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&I> {
        match self.entries.get(url) {
            Some(ImageState::Ready(image)) => Some(image),
            _ => None,
        }
    }

    /// Incremented on every resolution.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type SharedImageCache = Rc<RefCell<ImageCache<HtmlImageElement>>>;

/// Starts browser image loads that resolve into a shared cache.
pub struct ImageLoader {
    cache: SharedImageCache,
    on_resolved: Rc<dyn Fn()>,
}

impl ImageLoader {
    /// `on_resolved` runs after every load or failure, typically to schedule
    /// a redraw.
    pub fn new(cache: SharedImageCache, on_resolved: impl Fn() + 'static) -> Self {
        Self { cache, on_resolved: Rc::new(on_resolved) }
    }

    #[must_use]
    pub fn cache(&self) -> &SharedImageCache {
        &self.cache
    }

    /// Start loading `url` unless it was requested before.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the image element cannot be created.
    pub fn load(&self, url: &str) -> Result<(), JsValue> {
        if !self.cache.borrow_mut().request(url) {
            return Ok(());
        }
        let image = HtmlImageElement::new()?;

        {
            let cache = Rc::clone(&self.cache);
            let on_resolved = Rc::clone(&self.on_resolved);
            let loaded = image.clone();
            let url = url.to_owned();
            let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
                cache.borrow_mut().resolve(&url, Ok(loaded.clone()));
                on_resolved();
            });
            image.set_onload(Some(onload.as_ref().unchecked_ref()));
            onload.forget();
        }

        {
            let cache = Rc::clone(&self.cache);
            let on_resolved = Rc::clone(&self.on_resolved);
            let url = url.to_owned();
            let onerror = Closure::<dyn FnMut(Event)>::new(move |_| {
                cache.borrow_mut().resolve(&url, Err("load or decode error".to_owned()));
                on_resolved();
            });
            image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            onerror.forget();
        }

        image.set_src(url);
        Ok(())
    }
}
